//! Per-context pipeline state.
//!
//! Every context tracks the full set of bindings the commands it has seen
//! would leave on the hardware. Immediate contexts update it as commands are
//! applied; deferred contexts update their own copy while recording, and the
//! immediate context picks the changes up again when the list is replayed.

use anvil_core::limits::{
    CONSTANT_BUFFER_SLOTS, RENDER_TARGET_SLOTS, SAMPLER_SLOTS, SHADER_RESOURCE_SLOTS, UAV_SLOTS,
    VERTEX_BUFFER_SLOTS,
};
use anvil_core::{PixelFormat, PrimitiveTopology, ShaderStage, Viewport};

use crate::command::{Command, VertexStream};
use crate::keys::{LayoutKey, ResourceKey, ShaderKey, StateKey, ViewKey};

/// Slot tables of one shader stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageBindings {
    pub shader: Option<ShaderKey>,
    pub shader_resources: Vec<Option<ViewKey>>,
    pub samplers: Vec<Option<StateKey>>,
    pub constant_buffers: Vec<Option<ResourceKey>>,
}

impl Default for StageBindings {
    fn default() -> Self {
        Self {
            shader: None,
            shader_resources: vec![None; SHADER_RESOURCE_SLOTS as usize],
            samplers: vec![None; SAMPLER_SLOTS as usize],
            constant_buffers: vec![None; CONSTANT_BUFFER_SLOTS as usize],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBinding {
    pub buffer: ResourceKey,
    pub format: PixelFormat,
    pub offset: u32,
}

/// Snapshot of everything bound on a context.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub stages: [StageBindings; ShaderStage::COUNT],
    pub compute_uavs: [Option<ViewKey>; UAV_SLOTS as usize],
    pub output_uavs: [Option<ViewKey>; UAV_SLOTS as usize],
    pub vertex_streams: Vec<VertexStream>,
    pub index_buffer: Option<IndexBinding>,
    pub input_layout: Option<LayoutKey>,
    pub topology: PrimitiveTopology,
    pub viewport: Option<Viewport>,
    pub rasterizer: Option<StateKey>,
    pub blend: Option<StateKey>,
    pub blend_factor: [f32; 4],
    pub sample_mask: u32,
    pub depth_stencil: Option<StateKey>,
    pub stencil_ref: u32,
    pub render_targets: [Option<ViewKey>; RENDER_TARGET_SLOTS as usize],
    pub depth_target: Option<ViewKey>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            stages: Default::default(),
            compute_uavs: [None; UAV_SLOTS as usize],
            output_uavs: [None; UAV_SLOTS as usize],
            vertex_streams: vec![VertexStream::default(); VERTEX_BUFFER_SLOTS as usize],
            index_buffer: None,
            input_layout: None,
            topology: PrimitiveTopology::Undefined,
            viewport: None,
            rasterizer: None,
            blend: None,
            blend_factor: [1.0; 4],
            sample_mask: u32::MAX,
            depth_stencil: None,
            stencil_ref: 0,
            render_targets: [None; RENDER_TARGET_SLOTS as usize],
            depth_target: None,
        }
    }
}

fn write_slots<T: Copy>(table: &mut [Option<T>], start: u32, values: &[Option<T>]) {
    let start = start as usize;
    table[start..start + values.len()].copy_from_slice(values);
}

impl PipelineState {
    #[inline]
    #[must_use]
    pub fn stage(&self, stage: ShaderStage) -> &StageBindings {
        &self.stages[stage.index()]
    }

    #[must_use]
    pub fn shader_resource(&self, stage: ShaderStage, slot: u32) -> Option<ViewKey> {
        self.stage(stage).shader_resources.get(slot as usize).copied().flatten()
    }

    #[must_use]
    pub fn sampler(&self, stage: ShaderStage, slot: u32) -> Option<StateKey> {
        self.stage(stage).samplers.get(slot as usize).copied().flatten()
    }

    #[must_use]
    pub fn constant_buffer(&self, stage: ShaderStage, slot: u32) -> Option<ResourceKey> {
        self.stage(stage).constant_buffers.get(slot as usize).copied().flatten()
    }

    #[must_use]
    pub fn vertex_stream(&self, slot: u32) -> VertexStream {
        self.vertex_streams.get(slot as usize).copied().unwrap_or_default()
    }

    /// Applies the state half of a command. Slot ranges must already be validated.
    pub(crate) fn apply(&mut self, command: &Command) {
        match command {
            Command::SetShaderResources { stage, start, views } => {
                write_slots(&mut self.stages[stage.index()].shader_resources, *start, views);
            }
            Command::SetSamplers { stage, start, samplers } => {
                write_slots(&mut self.stages[stage.index()].samplers, *start, samplers);
            }
            Command::SetConstantBuffers { stage, start, buffers } => {
                write_slots(&mut self.stages[stage.index()].constant_buffers, *start, buffers);
            }
            Command::SetComputeUavs { start, views } => {
                write_slots(&mut self.compute_uavs, *start, views);
            }
            Command::SetVertexBuffers { start, streams } => {
                let start = *start as usize;
                self.vertex_streams[start..start + streams.len()].copy_from_slice(streams);
            }
            Command::SetIndexBuffer { buffer, format, offset } => {
                self.index_buffer = buffer.map(|buffer| IndexBinding {
                    buffer,
                    format: *format,
                    offset: *offset,
                });
            }
            Command::SetInputLayout(layout) => self.input_layout = *layout,
            Command::SetShader { stage, shader } => self.stages[stage.index()].shader = *shader,
            Command::SetPrimitiveTopology(topology) => self.topology = *topology,
            Command::SetViewport(viewport) => self.viewport = Some(*viewport),
            Command::SetRasterizerState(state) => self.rasterizer = *state,
            Command::SetBlendState { state, factor, sample_mask } => {
                self.blend = *state;
                self.blend_factor = *factor;
                self.sample_mask = *sample_mask;
            }
            Command::SetDepthStencilState { state, stencil_ref } => {
                self.depth_stencil = *state;
                self.stencil_ref = *stencil_ref;
            }
            Command::SetRenderTargets { targets, depth } => {
                self.set_render_targets(targets, *depth);
            }
            Command::SetRenderTargetsAndUavs { targets, depth, uav_start, uavs } => {
                self.set_render_targets(targets, *depth);
                self.output_uavs = [None; UAV_SLOTS as usize];
                write_slots(&mut self.output_uavs, *uav_start, uavs);
            }
            Command::ClearState => *self = Self::default(),
            _ => {}
        }
    }

    // Targets past the supplied count are unbound.
    fn set_render_targets(&mut self, targets: &[Option<ViewKey>], depth: Option<ViewKey>) {
        self.render_targets = [None; RENDER_TARGET_SLOTS as usize];
        write_slots(&mut self.render_targets, 0, targets);
        self.depth_target = depth;
    }
}
