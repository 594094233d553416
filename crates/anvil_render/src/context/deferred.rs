//! Deferred recording and command-list replay.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use anvil_core::{AnvilError, Result};
use anvil_device::{CommandListKey, ContextKind};
use parking_lot::Mutex;

use super::{Context, Retained};
use crate::instance::InstanceShared;
use crate::owner::DeviceRef;

/// A context that records instead of executing.
///
/// Derefs to [`Context`], so every binding and draw call is available.
/// Deferred contexts may be recorded on separate threads, one thread each.
pub struct DeferredContext {
    context: Context,
}

impl DeferredContext {
    pub(crate) fn create(shared: Arc<InstanceShared>) -> Result<Self> {
        let key = shared.owner.device.create_deferred_context()?;
        Ok(Self {
            context: Context {
                shared,
                key,
                kind: ContextKind::Deferred,
                recording: Mutex::default(),
            },
        })
    }

    /// Seals everything recorded so far. With `clear_state` this context
    /// starts the next list from default state.
    ///
    /// The list holds every resource, state and shader it records until it
    /// is executed or dropped, so callers may release their own handles
    /// right after binding.
    pub fn finish_command_list(&self, clear_state: bool) -> Result<CommandList> {
        let mut recording = self.context.recording.lock();
        let key = self.context.device().finish_command_list(self.context.key, clear_state)?;
        Ok(CommandList {
            owner: self.context.shared.owner.clone(),
            key,
            retained: std::mem::take(&mut recording.retained),
        })
    }
}

impl Deref for DeferredContext {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.context
    }
}

impl Drop for DeferredContext {
    fn drop(&mut self) {
        self.context.device().release_context(self.context.key);
        // The device dropped this context's pending maps with it.
        let mapped = std::mem::take(&mut self.context.recording.get_mut().mapped);
        for resource in mapped {
            resource.write().mapped = false;
            log::debug!("Deferred context dropped with {:?} #{} mapped", resource.kind(), resource.id());
        }
    }
}

impl fmt::Debug for DeferredContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeferredContext").field(&self.context).finish()
    }
}

/// A sealed recording, consumed by one
/// [`Context::execute_deferred_commands`] call.
pub struct CommandList {
    owner: DeviceRef,
    key: CommandListKey,
    retained: Vec<Retained>,
}

impl Drop for CommandList {
    fn drop(&mut self) {
        // no-op once executed
        self.owner.device.release_command_list(self.key);
    }
}

impl fmt::Debug for CommandList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandList")
            .field("instance", &self.owner.instance)
            .field("key", &self.key)
            .field("retained", &self.retained.len())
            .finish()
    }
}

impl Context {
    /// Replays `list` on the immediate context. With `clear_state` the
    /// pipeline state is reset afterwards; otherwise it keeps whatever the
    /// list left bound.
    pub fn execute_deferred_commands(&self, list: CommandList, clear_state: bool) -> Result<()> {
        if !self.is_immediate() {
            return Err(AnvilError::ContextRole("deferred commands execute on the immediate context"));
        }
        self.check_owner(&list.owner, "execute_deferred_commands")?;
        self.device().execute_command_list(self.key, list.key, clear_state)
    }
}
