//! Anvil Render
//!
//! The reference-counted facade over [`anvil_device::NativeDevice`].
//!
//! # Overview
//!
//! - [`Instance`]: owns the device, the default window, the shader compiler
//!   and the precomputed state presets; every factory lives here
//! - [`Resource`] and its typed handles ([`VertexBuffer`], [`Texture2D`],
//!   [`RenderTarget`], ...): shared ownership of native buffers and textures
//! - State objects ([`SamplerState`], [`RasterizerState`], [`BlendState`],
//!   [`DepthStencilState`]): immutable, compared by identity
//! - [`Shader`], [`ShaderProgram`], [`InputLayoutDesc`]
//! - [`Context`] / [`DeferredContext`]: slot-table binding, draws, updates,
//!   map/unmap, command-list capture and replay
//! - [`Window`] and [`Surface2D`]: presentation and CPU-side pixel storage
//!
//! Every handle is a cheap clone of an `Arc`. The last clone to drop releases
//! the native objects it owns.

pub mod context;
pub mod input_layout;
pub mod instance;
pub mod resource;
pub mod shader;
pub mod state;
pub mod surface;
pub mod window;

pub(crate) mod owner;

pub use context::{CommandList, Context, DeferredContext};
pub use input_layout::{InputLayout, InputLayoutDesc, InputLayoutElement};
pub use instance::{Instance, InstanceSettings};
pub use owner::InstanceId;
pub use resource::texture::{TextureParams1D, TextureParams2D, TextureParams3D};
pub use resource::{
    ConstantBuffer, DepthBuffer, IndexBuffer, InstanceBuffer, RawBuffer, RenderTarget, Resource, ResourceKind,
    StructuredBuffer, Texture1D, Texture2D, Texture3D, TextureLayout, VertexBuffer,
};
pub use shader::{
    ComputeShader, DomainShader, GeometryShader, HullShader, PixelShader, Shader, ShaderProgram, ShaderProgramDesc,
    ShaderSource, VertexShader,
};
pub use state::{BlendState, DepthStencilState, RasterizerState, SamplerState};
pub use surface::{PadMode, Surface2D};
pub use window::{MouseButton, Window, WindowClassRegistry, WindowEvent, WindowParams, WindowState};
