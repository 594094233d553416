//! Instance identity carried by every device object.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anvil_core::{AnvilError, Result};
use anvil_device::NativeDevice;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an [`Instance`](crate::Instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Identity for hashing handles.
pub(crate) fn next_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

/// The instance an object was created by, plus the device that backs it.
///
/// Objects keep the device alive; an instance outliving its objects is not
/// required.
#[derive(Clone)]
pub(crate) struct DeviceRef {
    pub instance: InstanceId,
    pub device: Arc<NativeDevice>,
}

impl DeviceRef {
    /// Fails with [`AnvilError::CrossInstance`] unless `other` comes from the same instance.
    pub fn check_same(&self, other: &DeviceRef, call: &'static str) -> Result<()> {
        if self.instance == other.instance {
            Ok(())
        } else {
            Err(AnvilError::CrossInstance(call))
        }
    }
}

impl std::fmt::Debug for DeviceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DeviceRef").field(&self.instance).finish()
    }
}
