//! Contexts
//!
//! A [`Context`] turns handle-level calls into native commands: it resolves
//! default slots and stages, checks slot ranges and instance ownership, and
//! fans stage masks out into one command per stage.
//!
//! The immediate context belongs to the [`Instance`](crate::Instance) and
//! executes as it goes. A [`DeferredContext`] records into a
//! [`CommandList`] that the immediate context replays later.
//!
//! Every range check happens before anything reaches the device, so a call
//! that fails leaves the bound state untouched.

mod binding;
mod deferred;
mod draw;
mod output;
mod update;

use std::fmt;
use std::sync::Arc;

use anvil_core::{AnvilError, Result, ShaderStage, ShaderStages};
use anvil_device::{Command, ContextKey, ContextKind, NativeDevice, PipelineState};
use parking_lot::Mutex;

use crate::instance::InstanceShared;
use crate::owner::{DeviceRef, InstanceId};
use crate::resource::Resource;
use crate::shader::Shader;
use crate::state::{BlendState, DepthStencilState, SamplerState};

pub use deferred::{CommandList, DeferredContext};

pub struct Context {
    shared: Arc<InstanceShared>,
    key: ContextKey,
    kind: ContextKind,
    recording: Mutex<Recording>,
}

/// A handle referenced by recorded commands.
#[allow(dead_code, reason = "held only to be dropped")]
enum Retained {
    Resource(Resource),
    Shader(Shader),
    Sampler(SamplerState),
    Blend(BlendState),
    DepthStencil(DepthStencilState),
}

macro_rules! retained_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<&$ty> for Retained {
                fn from(handle: &$ty) -> Self {
                    Self::$variant(handle.clone())
                }
            }
        )*
    };
}

retained_from! {
    Resource => Resource,
    Shader => Shader,
    Sampler => SamplerState,
    Blend => BlendState,
    DepthStencil => DepthStencilState,
}

/// What a deferred context holds on behalf of the list it is recording.
///
/// `retained` moves into the [`CommandList`] when the list is sealed, so
/// every object the list names outlives its replay. `mapped` tracks maps
/// still outstanding on this context.
#[derive(Default)]
struct Recording {
    retained: Vec<Retained>,
    mapped: Vec<Resource>,
}

impl Context {
    pub(crate) fn immediate(shared: Arc<InstanceShared>) -> Self {
        let key = shared.owner.device.immediate_context();
        Self {
            shared,
            key,
            kind: ContextKind::Immediate,
            recording: Mutex::default(),
        }
    }

    pub(crate) fn key(&self) -> ContextKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.kind == ContextKind::Immediate
    }

    /// The instance this context records for.
    #[inline]
    #[must_use]
    pub fn instance(&self) -> InstanceId {
        self.shared.owner.instance
    }

    /// Snapshot of the bound state.
    pub fn pipeline_state(&self) -> Result<PipelineState> {
        self.device().pipeline_state(self.key)
    }

    #[inline]
    fn device(&self) -> &NativeDevice {
        &self.shared.owner.device
    }

    #[inline]
    fn submit(&self, command: Command) -> Result<()> {
        self.device().submit(self.key, command)
    }

    fn check_owner(&self, other: &DeviceRef, call: &'static str) -> Result<()> {
        self.shared.owner.check_same(other, call)
    }

    /// Keeps `handle` alive until the list being recorded is released.
    /// Immediate commands have already executed, so nothing is held.
    fn retain<'a, T>(&self, handle: &'a T)
    where
        Retained: From<&'a T>,
    {
        if !self.is_immediate() {
            self.recording.lock().retained.push(Retained::from(handle));
        }
    }

    /// Submits one command per stage in `stages`.
    fn for_stages(&self, stages: ShaderStages, mut command: impl FnMut(ShaderStage) -> Command) -> Result<()> {
        stages.stages().try_for_each(|stage| self.submit(command(stage)))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("instance", &self.instance())
            .field("kind", &self.kind)
            .field("key", &self.key)
            .finish()
    }
}

fn check_range(table: &'static str, start: u32, count: usize, max: u32) -> Result<()> {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    if start.checked_add(count).is_none_or(|end| end > max) {
        return Err(AnvilError::SlotOverflow { table, start, count, max });
    }
    Ok(())
}

/// Slot and stage mask for a single-resource bind.
///
/// A present resource falls back to its own defaults; a null bind has
/// nothing to fall back to and must name both.
fn resolve_target(
    resource: Option<&Resource>,
    slot: Option<u32>,
    stages: Option<ShaderStages>,
    call: &'static str,
) -> Result<(u32, ShaderStages)> {
    let (slot, stages) = match resource {
        Some(resource) => (
            slot.unwrap_or_else(|| resource.default_slot()),
            stages.unwrap_or_else(|| resource.default_stages()),
        ),
        None => match (slot, stages) {
            (Some(slot), Some(stages)) => (slot, stages),
            _ => return Err(AnvilError::AmbiguousBind(call)),
        },
    };
    if stages.is_empty() {
        return Err(AnvilError::AmbiguousBind(call));
    }
    Ok((slot, stages))
}
