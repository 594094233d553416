//! Anvil
//!
//! A reference-counted resource and command-binding facade over an explicit
//! graphics device.
//!
//! - [`anvil_core`]: formats, usage policy, stages, state descriptors, errors
//! - [`anvil_device`]: the explicit device with key-addressed objects
//! - [`anvil_render`]: shared handles, contexts, windows and surfaces
//!
//! ```rust,ignore
//! use anvil::{Instance, InstanceSettings, Usage, WindowParams};
//!
//! let instance = Instance::new(InstanceSettings {
//!     window: WindowParams::headless(640, 480),
//!     ..Default::default()
//! })?;
//! let vertices = instance.create_vertex_buffer_from(&[[0.0f32; 3]; 3], Usage::Static)?;
//! let ctx = instance.immediate_context();
//! ctx.bind_vertex_buffer(Some(&vertices), None)?;
//! ctx.draw(3, 0)?;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub use anvil_core;
pub use anvil_device;
pub use anvil_render;

pub use anvil_core::{
    AddressMode, AnvilError, BlendFactor, BlendOp, BlendStateDesc, Color8, ComparisonFunc, CullMode, DepthState,
    DepthStencilDesc, FillMode, Filter, Format, FormatKind, MapMode, PixelFormat, PrimitiveTopology, RasterizerDesc,
    RenderTargetBlendDesc, Result, SamplerDesc, ShaderStage, ShaderStages, Usage, Viewport,
};
pub use anvil_device::{AdapterInfo, DeviceStats, MappedSubresource, PipelineState, ReferenceCompiler, ShaderCompiler};
pub use anvil_render::{
    CommandList, ComputeShader, ConstantBuffer, Context, DeferredContext, DepthBuffer, DomainShader, GeometryShader,
    HullShader, IndexBuffer, InputLayoutDesc, Instance, InstanceBuffer, InstanceSettings, PadMode, PixelShader,
    RawBuffer, RenderTarget, Resource, ResourceKind, Shader, ShaderProgram, ShaderProgramDesc, ShaderSource,
    StructuredBuffer, Surface2D, Texture1D, Texture2D, Texture3D, TextureParams1D, TextureParams2D, TextureParams3D,
    VertexBuffer, VertexShader, Window, WindowParams,
};

pub use glam::{Mat4, Vec4};

/// Initialises `env_logger` from `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; later calls do nothing.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
