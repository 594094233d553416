//! Object records and the command validation / execution rules.

use anvil_core::limits::{
    CONSTANT_BUFFER_SLOTS, RENDER_TARGET_SLOTS, SAMPLER_SLOTS, SHADER_RESOURCE_SLOTS, UAV_SLOTS,
    VERTEX_BUFFER_SLOTS,
};
use anvil_core::{AnvilError, PixelFormat, PrimitiveTopology, Result, ShaderStage, Usage};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::command::{ClearFlags, Command};
use crate::desc::{BindFlags, InputElementDesc, ResourceDesc, StateDesc, ViewDesc, ViewKind};
use crate::device::{ContextKind, DeviceStats};
use crate::keys::{
    CommandListKey, ContextKey, LayoutKey, ResourceKey, ShaderKey, StateKey, SwapChainKey, ViewKey,
};
use crate::memory::{BackingStore, MappedSubresource};
use crate::pipeline::PipelineState;
use crate::texel;

pub(crate) struct ResourceRecord {
    pub desc: ResourceDesc,
    pub store: BackingStore,
    pub mapped: bool,
}

pub(crate) struct ViewRecord {
    pub resource: ResourceKey,
    pub desc: ViewDesc,
}

pub(crate) struct ContextRecord {
    pub kind: ContextKind,
    pub state: PipelineState,
    pub recorded: Vec<Command>,
    pub pending_maps: FxHashMap<ResourceKey, MappedSubresource>,
}

impl ContextRecord {
    pub fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            state: PipelineState::default(),
            recorded: Vec::new(),
            pending_maps: FxHashMap::default(),
        }
    }
}

pub(crate) struct SwapChainRecord {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub back_buffer: ResourceKey,
    pub presents: u64,
}

#[derive(Default)]
pub(crate) struct DeviceObjects {
    pub resources: SlotMap<ResourceKey, ResourceRecord>,
    pub views: SlotMap<ViewKey, ViewRecord>,
    pub states: SlotMap<StateKey, StateDesc>,
    pub shaders: SlotMap<ShaderKey, ShaderStage>,
    pub layouts: SlotMap<LayoutKey, Vec<InputElementDesc>>,
    pub contexts: SlotMap<ContextKey, ContextRecord>,
    pub command_lists: SlotMap<CommandListKey, Vec<Command>>,
    pub swap_chains: SlotMap<SwapChainKey, SwapChainRecord>,
    pub allocated: u64,
    pub stats: DeviceStats,
}

fn released(what: &str) -> AnvilError {
    AnvilError::InvalidUsage(format!("{what} has been released"))
}

fn check_range(table: &'static str, start: u32, count: usize, max: u32) -> Result<()> {
    let count = count as u32;
    if start.saturating_add(count) > max {
        return Err(AnvilError::SlotOverflow { table, start, count, max });
    }
    Ok(())
}

impl DeviceObjects {
    pub fn resource(&self, key: ResourceKey) -> Result<&ResourceRecord> {
        self.resources.get(key).ok_or_else(|| released("resource"))
    }

    pub fn context(&self, key: ContextKey) -> Result<&ContextRecord> {
        self.contexts.get(key).ok_or_else(|| released("context"))
    }

    pub fn context_mut(&mut self, key: ContextKey) -> Result<&mut ContextRecord> {
        self.contexts.get_mut(key).ok_or_else(|| released("context"))
    }

    fn view(&self, key: ViewKey, kind: ViewKind) -> Result<&ViewRecord> {
        let view = self.views.get(key).ok_or_else(|| released("view"))?;
        if view.desc.kind != kind {
            return Err(AnvilError::InvalidUsage(format!(
                "expected a {kind:?} view, got a {:?} view",
                view.desc.kind
            )));
        }
        self.resource(view.resource)?;
        Ok(view)
    }

    fn bound_buffer(&self, key: ResourceKey, bind: BindFlags) -> Result<()> {
        match self.resource(key)?.desc {
            ResourceDesc::Buffer(desc) if desc.bind.contains(bind) => Ok(()),
            _ => Err(AnvilError::InvalidUsage(format!("resource is not a buffer created with {bind:?}"))),
        }
    }

    fn state(&self, key: StateKey, matches: fn(&StateDesc) -> bool, what: &str) -> Result<()> {
        let state = self.states.get(key).ok_or_else(|| released(what))?;
        if !matches(state) {
            return Err(AnvilError::InvalidUsage(format!("state object is not a {what}")));
        }
        Ok(())
    }

    fn views_of(&self, views: &[Option<ViewKey>], kind: ViewKind) -> Result<()> {
        views.iter().flatten().try_for_each(|view| self.view(*view, kind).map(|_| ()))
    }

    /// Checks a command against the objects it references.
    pub fn validate(&self, command: &Command) -> Result<()> {
        match command {
            Command::SetShaderResources { start, views, .. } => {
                check_range("shader resource", *start, views.len(), SHADER_RESOURCE_SLOTS)?;
                self.views_of(views, ViewKind::ShaderResource)
            }
            Command::SetSamplers { start, samplers, .. } => {
                check_range("sampler", *start, samplers.len(), SAMPLER_SLOTS)?;
                samplers
                    .iter()
                    .flatten()
                    .try_for_each(|s| self.state(*s, |r| matches!(r, StateDesc::Sampler(_)), "sampler"))
            }
            Command::SetConstantBuffers { start, buffers, .. } => {
                check_range("constant buffer", *start, buffers.len(), CONSTANT_BUFFER_SLOTS)?;
                buffers
                    .iter()
                    .flatten()
                    .try_for_each(|b| self.bound_buffer(*b, BindFlags::CONSTANT_BUFFER))
            }
            Command::SetComputeUavs { start, views } => {
                check_range("unordered access", *start, views.len(), UAV_SLOTS)?;
                self.views_of(views, ViewKind::UnorderedAccess)
            }
            Command::SetVertexBuffers { start, streams } => {
                check_range("vertex buffer", *start, streams.len(), VERTEX_BUFFER_SLOTS)?;
                streams
                    .iter()
                    .filter_map(|s| s.buffer)
                    .try_for_each(|b| self.bound_buffer(b, BindFlags::VERTEX_BUFFER))
            }
            Command::SetIndexBuffer { buffer, format, .. } => {
                let Some(buffer) = buffer else { return Ok(()) };
                if !matches!(format, PixelFormat::R8Uint | PixelFormat::R16Uint | PixelFormat::R32Uint) {
                    return Err(AnvilError::InvalidUsage(format!("{format:?} is not an index format")));
                }
                self.bound_buffer(*buffer, BindFlags::INDEX_BUFFER)
            }
            Command::SetInputLayout(Some(layout)) => {
                self.layouts.get(*layout).map(|_| ()).ok_or_else(|| released("input layout"))
            }
            Command::SetShader { stage, shader: Some(shader) } => {
                let compiled_for = *self.shaders.get(*shader).ok_or_else(|| released("shader"))?;
                if compiled_for != *stage {
                    return Err(AnvilError::InvalidUsage(format!(
                        "{compiled_for:?} shader bound to the {stage:?} stage"
                    )));
                }
                Ok(())
            }
            Command::SetPrimitiveTopology(PrimitiveTopology::PatchList(points)) if !(1..=32).contains(points) => Err(
                AnvilError::InvalidUsage(format!("patch lists take 1 to 32 control points, got {points}")),
            ),
            Command::SetRasterizerState(Some(state)) => {
                self.state(*state, |r| matches!(r, StateDesc::Rasterizer(_)), "rasterizer state")
            }
            Command::SetBlendState { state: Some(state), .. } => {
                self.state(*state, |r| matches!(r, StateDesc::Blend(_)), "blend state")
            }
            Command::SetDepthStencilState { state: Some(state), .. } => {
                self.state(*state, |r| matches!(r, StateDesc::DepthStencil(_)), "depth-stencil state")
            }
            Command::SetRenderTargets { targets, depth } => self.validate_targets(targets, *depth),
            Command::SetRenderTargetsAndUavs { targets, depth, uav_start, uavs } => {
                self.validate_targets(targets, *depth)?;
                check_range("unordered access", *uav_start, uavs.len(), UAV_SLOTS)?;
                self.views_of(uavs, ViewKind::UnorderedAccess)
            }
            Command::ClearRenderTargetView { view, .. } => self.view(*view, ViewKind::RenderTarget).map(|_| ()),
            Command::ClearDepthStencilView { view, .. } => self.view(*view, ViewKind::DepthStencil).map(|_| ()),
            Command::CopyResource { dst, src } => self.validate_copy(*dst, *src),
            Command::UpdateSubresource { dst, offset, data } => {
                let record = self.resource(*dst)?;
                if record.desc.usage() == Usage::Immutable {
                    return Err(AnvilError::ImmutableWrite);
                }
                let size = record.desc.byte_size();
                if offset.checked_add(data.len()).is_none_or(|end| end > size) {
                    return Err(AnvilError::UpdateOutOfBounds {
                        offset: *offset,
                        len: data.len(),
                        size,
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn validate_targets(&self, targets: &[Option<ViewKey>], depth: Option<ViewKey>) -> Result<()> {
        check_range("render target", 0, targets.len(), RENDER_TARGET_SLOTS)?;
        self.views_of(targets, ViewKind::RenderTarget)?;
        if let Some(depth) = depth {
            self.view(depth, ViewKind::DepthStencil)?;
        }
        Ok(())
    }

    fn validate_copy(&self, dst: ResourceKey, src: ResourceKey) -> Result<()> {
        if dst == src {
            return Err(AnvilError::InvalidUsage(
                "copy source and destination are the same resource".into(),
            ));
        }
        let (to, from) = (self.resource(dst)?, self.resource(src)?);
        if to.desc.usage() == Usage::Immutable {
            return Err(AnvilError::ImmutableWrite);
        }
        let compatible = match (to.desc, from.desc) {
            (ResourceDesc::Buffer(a), ResourceDesc::Buffer(b)) => a.byte_width == b.byte_width,
            (ResourceDesc::Texture(a), ResourceDesc::Texture(b)) => {
                a.dimension == b.dimension
                    && (a.width, a.height, a.depth) == (b.width, b.height, b.depth)
                    && a.format.layout() == b.format.layout()
                    && a.sample_count == b.sample_count
            }
            _ => false,
        };
        if !compatible {
            return Err(AnvilError::InvalidUsage(
                "copy requires resources of identical size and layout".into(),
            ));
        }
        Ok(())
    }

    /// Performs the memory and work half of an already validated command.
    pub fn execute(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::ClearRenderTargetView { view, color } => {
                let view = self.view(*view, ViewKind::RenderTarget)?;
                let texel = texel::encode_color(view.desc.format, *color).ok_or_else(|| {
                    AnvilError::InvalidUsage(format!("cannot clear a {:?} view", view.desc.format))
                })?;
                let store = &self.resource(view.resource)?.store;
                for chunk in store.lock().chunks_exact_mut(texel.len()) {
                    chunk.copy_from_slice(&texel);
                }
            }
            Command::ClearDepthStencilView { view, flags, depth, stencil } => {
                let view = self.view(*view, ViewKind::DepthStencil)?;
                let format = view.desc.format;
                let depth = flags.contains(ClearFlags::DEPTH).then_some(*depth);
                let stencil = flags.contains(ClearFlags::STENCIL).then_some(*stencil);
                let store = &self.resource(view.resource)?.store;
                for chunk in store.lock().chunks_exact_mut(4) {
                    let previous = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    if let Some(texel) = texel::encode_depth_stencil(format, previous, depth, stencil) {
                        chunk.copy_from_slice(&texel.to_le_bytes());
                    }
                }
            }
            Command::CopyResource { dst, src } => {
                let bytes = self.resource(*src)?.store.lock().clone();
                self.resource(*dst)?.store.lock().copy_from_slice(&bytes);
            }
            Command::UpdateSubresource { dst, offset, data } => {
                let store = &self.resource(*dst)?.store;
                store.lock()[*offset..*offset + data.len()].copy_from_slice(data);
            }
            Command::Draw { .. }
            | Command::DrawIndexed { .. }
            | Command::DrawInstanced { .. }
            | Command::DrawIndexedInstanced { .. } => self.stats.draw_calls += 1,
            Command::Dispatch { .. } => self.stats.dispatches += 1,
            _ => {}
        }
        Ok(())
    }
}
