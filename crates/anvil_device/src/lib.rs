//! Anvil Device
//!
//! The explicit, stateful graphics device underneath the Anvil facade.
//!
//! # Overview
//!
//! - [`NativeDevice`]: object arenas, contexts, command submission
//! - [`Command`] / [`PipelineState`]: what contexts record and track
//! - [`MappedSubresource`]: CPU access to mapped backing stores
//! - [`ShaderCompiler`]: the seam between shader source and bytecode
//! - [`enumerate_adapters`]: physical adapter descriptors
//!
//! Nothing here is reference counted: every create call hands back a
//! generation-checked key, and the owner releases it explicitly.

pub mod adapter;
pub mod command;
pub mod compiler;
pub mod desc;
pub mod device;
pub mod keys;
pub mod memory;
pub mod pipeline;
pub mod texel;

mod objects;

pub use adapter::{AdapterInfo, enumerate_adapters};
pub use command::{ClearFlags, Command, Slots, VertexStream};
pub use compiler::{CompileOutput, ReferenceCompiler, ShaderCompiler};
pub use desc::{
    BindFlags, BufferDesc, InputClassification, InputElementDesc, ResourceDesc, ResourceMisc, StateDesc,
    TextureDesc, TextureDimension, ViewDesc, ViewKind,
};
pub use device::{ContextKind, DeviceConfig, DeviceStats, NativeDevice};
pub use keys::{CommandListKey, ContextKey, LayoutKey, ResourceKey, ShaderKey, StateKey, SwapChainKey, ViewKey};
pub use memory::{BackingStore, MappedData, MappedSubresource};
pub use pipeline::{IndexBinding, PipelineState, StageBindings};
