//! Anvil Core
//!
//! Foundational vocabulary shared by the device and the facade crates:
//!
//! - [`errors`]: the [`AnvilError`] taxonomy and [`Result`] alias
//! - [`format`]: `(kind, channels)` descriptors and concrete pixel formats
//! - [`usage`]: usage policy and the CPU access it implies
//! - [`stage`]: shader stages and stage masks
//! - [`state`]: pipeline-state descriptors and presets
//! - [`limits`]: fixed slot counts
//! - [`color`]: BGRA8 colour

pub mod color;
pub mod errors;
pub mod format;
pub mod limits;
pub mod stage;
pub mod state;
pub mod usage;

pub use color::Color8;
pub use errors::{AnvilError, Result};
pub use format::{Format, FormatKind, PixelFormat, TexelLayout};
pub use stage::{ShaderStage, ShaderStages};
pub use state::{
    AddressMode, BlendFactor, BlendOp, BlendStateDesc, ComparisonFunc, CullMode, DepthState,
    DepthStencilDesc, DepthWriteMask, FillMode, Filter, PrimitiveTopology, RasterizerDesc,
    RenderTargetBlendDesc, SamplerDesc, StencilFaceDesc, StencilOp, Viewport,
};
pub use usage::{CpuAccess, MapMode, Usage};
