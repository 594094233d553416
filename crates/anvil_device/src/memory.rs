//! CPU-side backing stores and mapped views of them.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use anvil_core::{AnvilError, MapMode, Result};
use parking_lot::{Mutex, MutexGuard};

/// Bytes of one resource's top subresource.
pub type BackingStore = Arc<Mutex<Vec<u8>>>;

pub(crate) fn new_store(bytes: Vec<u8>) -> BackingStore {
    Arc::new(Mutex::new(bytes))
}

/// CPU access to a mapped resource.
///
/// Holding a [`MappedData`] guard locks the backing store; drop it before
/// issuing further commands that touch the same resource.
#[derive(Debug, Clone)]
pub struct MappedSubresource {
    store: BackingStore,
    row_pitch: usize,
    depth_pitch: usize,
    mode: MapMode,
}

impl MappedSubresource {
    pub(crate) fn new(store: BackingStore, row_pitch: usize, depth_pitch: usize, mode: MapMode) -> Self {
        Self {
            store,
            row_pitch,
            depth_pitch,
            mode,
        }
    }

    #[inline]
    #[must_use]
    pub fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    #[inline]
    #[must_use]
    pub fn depth_pitch(&self) -> usize {
        self.depth_pitch
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> MapMode {
        self.mode
    }

    /// Locks the mapped bytes.
    #[must_use]
    pub fn data(&self) -> MappedData<'_> {
        MappedData(self.store.lock())
    }

    /// Copies `bytes` into the mapping at `offset`.
    pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        let mut data = self.store.lock();
        let size = data.len();
        let range = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= size)
            .map(|end| offset..end)
            .ok_or(AnvilError::UpdateOutOfBounds {
                offset,
                len: bytes.len(),
                size,
            })?;
        data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Copies the whole mapping out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.store.lock().clone()
    }

    pub(crate) fn store(&self) -> &BackingStore {
        &self.store
    }
}

pub struct MappedData<'a>(MutexGuard<'a, Vec<u8>>);

impl Deref for MappedData<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for MappedData<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}
