//! Commands accepted by a device context.

use anvil_core::{PixelFormat, PrimitiveTopology, ShaderStage, Viewport};
use bitflags::bitflags;
use smallvec::SmallVec;

use crate::keys::{LayoutKey, ResourceKey, ShaderKey, StateKey, ViewKey};

/// Slot list for a single binding call.
pub type Slots<T> = SmallVec<[Option<T>; 8]>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const DEPTH   = 1 << 0;
        const STENCIL = 1 << 1;
    }
}

/// One input-assembler vertex stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexStream {
    pub buffer: Option<ResourceKey>,
    pub stride: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // state
    SetShaderResources { stage: ShaderStage, start: u32, views: Slots<ViewKey> },
    SetSamplers { stage: ShaderStage, start: u32, samplers: Slots<StateKey> },
    SetConstantBuffers { stage: ShaderStage, start: u32, buffers: Slots<ResourceKey> },
    SetComputeUavs { start: u32, views: Slots<ViewKey> },
    SetVertexBuffers { start: u32, streams: SmallVec<[VertexStream; 2]> },
    SetIndexBuffer { buffer: Option<ResourceKey>, format: PixelFormat, offset: u32 },
    SetInputLayout(Option<LayoutKey>),
    SetShader { stage: ShaderStage, shader: Option<ShaderKey> },
    SetPrimitiveTopology(PrimitiveTopology),
    SetViewport(Viewport),
    SetRasterizerState(Option<StateKey>),
    SetBlendState { state: Option<StateKey>, factor: [f32; 4], sample_mask: u32 },
    SetDepthStencilState { state: Option<StateKey>, stencil_ref: u32 },
    SetRenderTargets { targets: Slots<ViewKey>, depth: Option<ViewKey> },
    SetRenderTargetsAndUavs {
        targets: Slots<ViewKey>,
        depth: Option<ViewKey>,
        uav_start: u32,
        uavs: Slots<ViewKey>,
    },
    ClearState,

    // memory
    ClearRenderTargetView { view: ViewKey, color: [f32; 4] },
    ClearDepthStencilView { view: ViewKey, flags: ClearFlags, depth: f32, stencil: u8 },
    CopyResource { dst: ResourceKey, src: ResourceKey },
    UpdateSubresource { dst: ResourceKey, offset: usize, data: Vec<u8> },

    // work
    Draw { vertex_count: u32, start_vertex: u32 },
    DrawIndexed { index_count: u32, start_index: u32, base_vertex: i32 },
    DrawInstanced {
        vertex_count_per_instance: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    },
    DrawIndexedInstanced {
        index_count_per_instance: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    },
    Dispatch { x: u32, y: u32, z: u32 },
}

impl Command {
    /// Draws and dispatches.
    #[must_use]
    pub fn is_work(&self) -> bool {
        matches!(
            self,
            Self::Draw { .. }
                | Self::DrawIndexed { .. }
                | Self::DrawInstanced { .. }
                | Self::DrawIndexedInstanced { .. }
                | Self::Dispatch { .. }
        )
    }
}
