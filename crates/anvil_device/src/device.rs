//! Native Device
//!
//! [`NativeDevice`] is the explicit, stateful device the facade wraps. It
//! owns every native object in generation-checked arenas and exposes the
//! classic create / release / submit surface:
//!
//! - Objects are created from descriptors and validated with the device's
//!   creation rules. Rejections surface as [`AnvilError::AllocationFailure`].
//! - Commands are submitted to a context. The immediate context applies
//!   them at once; deferred contexts record them for a later
//!   [`NativeDevice::execute_command_list`].
//! - Releasing a key is idempotent. Commands referencing a released object
//!   fail with [`AnvilError::InvalidUsage`].
//!
//! Backing stores live in CPU memory, tightly packed, top mip only.

use anvil_core::limits::{
    MAX_CONSTANT_BUFFER_BYTES, MAX_TEXTURE_DIMENSION_2D, MAX_TEXTURE_DIMENSION_3D, VERTEX_BUFFER_SLOTS,
};
use anvil_core::{
    AnvilError, BlendStateDesc, CpuAccess, DepthStencilDesc, MapMode, PixelFormat, RasterizerDesc, Result,
    SamplerDesc, ShaderStage, TexelLayout, Usage,
};
use parking_lot::Mutex;

use crate::adapter::AdapterInfo;
use crate::command::Command;
use crate::compiler::blob_stage;
use crate::desc::{
    BindFlags, BufferDesc, InputElementDesc, ResourceDesc, ResourceMisc, StateDesc, TextureDesc, TextureDimension,
    ViewDesc, ViewKind,
};
use crate::keys::{
    CommandListKey, ContextKey, LayoutKey, ResourceKey, ShaderKey, StateKey, SwapChainKey, ViewKey,
};
use crate::memory::{MappedSubresource, new_store};
use crate::objects::{ContextRecord, DeviceObjects, ResourceRecord, SwapChainRecord, ViewRecord};
use crate::pipeline::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Immediate,
    Deferred,
}

/// Device creation options.
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Allocation budget in bytes. Defaults to the adapter's dedicated video memory.
    pub memory_budget: Option<u64>,
    /// Log every submitted command at trace level.
    pub trace_commands: bool,
}

/// Work counters, accumulated over the device's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub draw_calls: u64,
    pub dispatches: u64,
    pub command_lists_executed: u64,
    pub presents: u64,
}

fn rejected(message: impl Into<String>) -> AnvilError {
    let message = message.into();
    log::error!("Device rejected create call: {message}");
    AnvilError::AllocationFailure(message)
}

fn validate_usage(usage: Usage, bind: BindFlags, cpu_access: CpuAccess, has_data: bool) -> Result<()> {
    if usage == Usage::Immutable && !has_data {
        return Err(rejected("immutable resources require initial data"));
    }
    if usage == Usage::Staging && !bind.is_empty() {
        return Err(rejected("staging resources cannot be bound to the pipeline"));
    }
    if usage == Usage::Dynamic && bind.contains(BindFlags::UNORDERED_ACCESS) {
        return Err(rejected("dynamic resources cannot be bound for unordered access"));
    }
    if !usage.cpu_access().contains(cpu_access) {
        return Err(rejected(format!("{usage:?} usage does not allow CPU access {cpu_access:?}")));
    }
    if usage == Usage::Dynamic && cpu_access.is_empty() {
        return Err(rejected("dynamic resources require CPU write access"));
    }
    Ok(())
}

fn validate_buffer(desc: &BufferDesc, has_data: bool) -> Result<()> {
    validate_usage(desc.usage, desc.bind, desc.cpu_access, has_data)?;
    if desc.bind.contains(BindFlags::CONSTANT_BUFFER) {
        if desc.bind != BindFlags::CONSTANT_BUFFER {
            return Err(rejected("constant buffers cannot be combined with other bind flags"));
        }
        if desc.byte_width == 0 || desc.byte_width % 16 != 0 || desc.byte_width > MAX_CONSTANT_BUFFER_BYTES {
            return Err(rejected(format!(
                "constant buffer size {} must be a non-zero multiple of 16 no larger than {MAX_CONSTANT_BUFFER_BYTES}",
                desc.byte_width
            )));
        }
    }
    if desc.misc.contains(ResourceMisc::BUFFER_STRUCTURED) {
        if desc.structure_stride == 0 || desc.byte_width % desc.structure_stride != 0 {
            return Err(rejected(format!(
                "structured buffer of {} bytes has invalid stride {}",
                desc.byte_width, desc.structure_stride
            )));
        }
        if desc.bind.intersects(BindFlags::VERTEX_BUFFER | BindFlags::INDEX_BUFFER) {
            return Err(rejected("structured buffers cannot be vertex or index buffers"));
        }
    }
    Ok(())
}

fn validate_texture(desc: &TextureDesc, has_data: bool) -> Result<()> {
    validate_usage(desc.usage, desc.bind, desc.cpu_access, has_data)?;
    let (max_extent, flat_height, flat_depth) = match desc.dimension {
        TextureDimension::D1 => (MAX_TEXTURE_DIMENSION_2D, true, true),
        TextureDimension::D2 => (MAX_TEXTURE_DIMENSION_2D, false, true),
        TextureDimension::D3 => (MAX_TEXTURE_DIMENSION_3D, false, false),
    };
    let extents = [desc.width, desc.height, desc.depth];
    if extents.iter().any(|e| *e == 0 || *e > max_extent)
        || (flat_height && desc.height != 1)
        || (flat_depth && desc.depth != 1)
    {
        return Err(rejected(format!(
            "invalid {:?} texture extent {}x{}x{}",
            desc.dimension, desc.width, desc.height, desc.depth
        )));
    }
    let largest = extents.into_iter().max().unwrap_or(1);
    let max_mips = u32::BITS - largest.leading_zeros();
    if desc.mip_levels == 0 || desc.mip_levels > max_mips {
        return Err(rejected(format!("{} mip levels requested, at most {max_mips}", desc.mip_levels)));
    }
    if desc.format == PixelFormat::Unknown {
        return Err(rejected("textures need a known format"));
    }
    if !matches!(desc.sample_count, 1 | 2 | 4 | 8) || desc.sample_quality >= desc.sample_count {
        return Err(rejected(format!(
            "unsupported multisample mode {}x (quality {})",
            desc.sample_count, desc.sample_quality
        )));
    }
    if desc.sample_count > 1
        && (desc.dimension != TextureDimension::D2
            || desc.mip_levels != 1
            || desc.usage == Usage::Staging
            || desc.bind.contains(BindFlags::UNORDERED_ACCESS))
    {
        return Err(rejected("multisampled textures must be single-mip, bindable 2D textures without UAV"));
    }
    if desc.bind.contains(BindFlags::RENDER_TARGET | BindFlags::DEPTH_STENCIL) {
        return Err(rejected("a texture cannot be both a render target and a depth-stencil target"));
    }
    if desc.bind.contains(BindFlags::DEPTH_STENCIL)
        && !matches!(desc.format.layout(), TexelLayout::R32 | TexelLayout::R24G8)
    {
        return Err(rejected(format!("{:?} cannot back a depth-stencil target", desc.format)));
    }
    if desc.format.is_depth() && desc.bind.intersects(BindFlags::SHADER_RESOURCE | BindFlags::UNORDERED_ACCESS) {
        return Err(rejected("typed depth formats cannot be read by shaders; use a typeless format"));
    }
    Ok(())
}

fn validate_view(desc: &ResourceDesc, view: &ViewDesc) -> Result<()> {
    let required = view.kind.required_bind();
    if !desc.bind().contains(required) {
        return Err(rejected(format!("{:?} view requires the resource to be bound as {required:?}", view.kind)));
    }
    match desc {
        ResourceDesc::Buffer(buffer) => {
            let structured = buffer.misc.contains(ResourceMisc::BUFFER_STRUCTURED);
            if structured != (view.format == PixelFormat::Unknown) {
                return Err(rejected("structured buffer views are untyped; other buffer views need a format"));
            }
        }
        ResourceDesc::Texture(texture) => {
            let depth_view = view.kind == ViewKind::DepthStencil;
            if view.format.is_typeless()
                || depth_view != view.format.is_depth()
                || !texture.format.accepts_view(view.format)
            {
                return Err(rejected(format!(
                    "{:?} view of format {:?} is incompatible with {:?}",
                    view.kind, view.format, texture.format
                )));
            }
        }
    }
    Ok(())
}

fn check_initial_data(data: Option<&[u8]>, size: usize) -> Result<()> {
    match data {
        Some(bytes) if bytes.len() < size => Err(rejected(format!(
            "initial data holds {} bytes, resource needs {size}",
            bytes.len()
        ))),
        _ => Ok(()),
    }
}

/// The explicit graphics device.
pub struct NativeDevice {
    adapter: AdapterInfo,
    config: DeviceConfig,
    immediate: ContextKey,
    objects: Mutex<DeviceObjects>,
}

impl std::fmt::Debug for NativeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeDevice")
            .field("adapter", &self.adapter.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NativeDevice {
    #[must_use]
    pub fn new(adapter: AdapterInfo, config: DeviceConfig) -> Self {
        let mut objects = DeviceObjects::default();
        let immediate = objects.contexts.insert(ContextRecord::new(ContextKind::Immediate));
        log::debug!("Created device on adapter '{}'", adapter.name);
        Self {
            adapter,
            config,
            immediate,
            objects: Mutex::new(objects),
        }
    }

    #[inline]
    #[must_use]
    pub fn adapter(&self) -> &AdapterInfo {
        &self.adapter
    }

    #[inline]
    #[must_use]
    pub fn immediate_context(&self) -> ContextKey {
        self.immediate
    }

    #[must_use]
    pub fn memory_budget(&self) -> u64 {
        self.config.memory_budget.unwrap_or(self.adapter.dedicated_video_memory)
    }

    // ========================================================================
    // Resources & Views
    // ========================================================================

    fn allocate(&self, objects: &mut DeviceObjects, desc: ResourceDesc, data: Option<&[u8]>) -> Result<ResourceKey> {
        let size = desc.byte_size();
        check_initial_data(data, size)?;
        let budget = self.memory_budget();
        if objects.allocated + size as u64 > budget {
            return Err(rejected(format!(
                "out of video memory: {size} bytes requested, {} of {budget} in use",
                objects.allocated
            )));
        }
        let bytes = data.map_or_else(|| vec![0; size], |d| d[..size].to_vec());
        objects.allocated += size as u64;
        Ok(objects.resources.insert(ResourceRecord {
            desc,
            store: new_store(bytes),
            mapped: false,
        }))
    }

    pub fn create_buffer(&self, desc: &BufferDesc, data: Option<&[u8]>) -> Result<ResourceKey> {
        validate_buffer(desc, data.is_some())?;
        let key = self.allocate(&mut self.objects.lock(), ResourceDesc::Buffer(*desc), data)?;
        log::debug!("Created {}-byte buffer {key:?} ({:?})", desc.byte_width, desc.usage);
        Ok(key)
    }

    pub fn create_texture(&self, desc: &TextureDesc, data: Option<&[u8]>) -> Result<ResourceKey> {
        validate_texture(desc, data.is_some())?;
        let key = self.allocate(&mut self.objects.lock(), ResourceDesc::Texture(*desc), data)?;
        log::debug!(
            "Created {:?} texture {key:?} {}x{}x{} {:?}",
            desc.dimension,
            desc.width,
            desc.height,
            desc.depth,
            desc.format
        );
        Ok(key)
    }

    pub fn create_view(&self, resource: ResourceKey, desc: &ViewDesc) -> Result<ViewKey> {
        let mut objects = self.objects.lock();
        let record = objects.resource(resource)?;
        validate_view(&record.desc, desc)?;
        Ok(objects.views.insert(ViewRecord { resource, desc: *desc }))
    }

    #[must_use]
    pub fn resource_desc(&self, resource: ResourceKey) -> Option<ResourceDesc> {
        self.objects.lock().resources.get(resource).map(|r| r.desc)
    }

    /// Copies a resource's bytes out regardless of its CPU access.
    pub fn read_back(&self, resource: ResourceKey) -> Result<Vec<u8>> {
        Ok(self.objects.lock().resource(resource)?.store.lock().clone())
    }

    pub fn release_resource(&self, resource: ResourceKey) {
        let mut objects = self.objects.lock();
        if let Some(record) = objects.resources.remove(resource) {
            objects.allocated -= record.desc.byte_size() as u64;
            log::debug!("Released resource {resource:?}");
        }
    }

    pub fn release_view(&self, view: ViewKey) {
        self.objects.lock().views.remove(view);
    }

    // ========================================================================
    // State Objects
    // ========================================================================

    fn insert_state(&self, desc: StateDesc) -> StateKey {
        self.objects.lock().states.insert(desc)
    }

    pub fn create_sampler_state(&self, desc: &SamplerDesc) -> Result<StateKey> {
        if !(1..=16).contains(&desc.max_anisotropy) {
            return Err(rejected(format!("max anisotropy {} outside 1..=16", desc.max_anisotropy)));
        }
        if desc.min_lod > desc.max_lod {
            return Err(rejected("sampler min LOD exceeds max LOD"));
        }
        Ok(self.insert_state(StateDesc::Sampler(*desc)))
    }

    pub fn create_rasterizer_state(&self, desc: &RasterizerDesc) -> Result<StateKey> {
        Ok(self.insert_state(StateDesc::Rasterizer(*desc)))
    }

    pub fn create_blend_state(&self, desc: &BlendStateDesc) -> Result<StateKey> {
        Ok(self.insert_state(StateDesc::Blend(*desc)))
    }

    pub fn create_depth_stencil_state(&self, desc: &DepthStencilDesc) -> Result<StateKey> {
        Ok(self.insert_state(StateDesc::DepthStencil(*desc)))
    }

    #[must_use]
    pub fn state_desc(&self, state: StateKey) -> Option<StateDesc> {
        self.objects.lock().states.get(state).copied()
    }

    pub fn release_state(&self, state: StateKey) {
        self.objects.lock().states.remove(state);
    }

    // ========================================================================
    // Shaders & Input Layouts
    // ========================================================================

    pub fn create_shader(&self, stage: ShaderStage, bytecode: &[u8]) -> Result<ShaderKey> {
        match blob_stage(bytecode) {
            Some(compiled_for) if compiled_for == stage => Ok(self.objects.lock().shaders.insert(stage)),
            Some(compiled_for) => Err(rejected(format!(
                "bytecode compiled for the {compiled_for:?} stage cannot create a {stage:?} shader"
            ))),
            None => Err(rejected("invalid shader bytecode")),
        }
    }

    pub fn release_shader(&self, shader: ShaderKey) {
        self.objects.lock().shaders.remove(shader);
    }

    pub fn create_input_layout(&self, elements: &[InputElementDesc], vertex_bytecode: &[u8]) -> Result<LayoutKey> {
        if blob_stage(vertex_bytecode) != Some(ShaderStage::Vertex) {
            return Err(rejected("input layouts must be validated against vertex shader bytecode"));
        }
        for element in elements {
            if element.semantic_name.is_empty() {
                return Err(rejected("input element without a semantic name"));
            }
            if element.format == PixelFormat::Unknown || element.format.is_typeless() || element.format.is_depth() {
                return Err(rejected(format!(
                    "{:?} is not a vertex format ({}{})",
                    element.format, element.semantic_name, element.semantic_index
                )));
            }
            if element.input_slot >= VERTEX_BUFFER_SLOTS {
                return Err(rejected(format!("input slot {} out of range", element.input_slot)));
            }
        }
        Ok(self.objects.lock().layouts.insert(elements.to_vec()))
    }

    pub fn release_input_layout(&self, layout: LayoutKey) {
        self.objects.lock().layouts.remove(layout);
    }

    // ========================================================================
    // Contexts & Command Lists
    // ========================================================================

    pub fn create_deferred_context(&self) -> Result<ContextKey> {
        let key = self.objects.lock().contexts.insert(ContextRecord::new(ContextKind::Deferred));
        log::debug!("Created deferred context {key:?}");
        Ok(key)
    }

    pub fn context_kind(&self, context: ContextKey) -> Result<ContextKind> {
        Ok(self.objects.lock().context(context)?.kind)
    }

    /// Releases a deferred context. The immediate context lives as long as the device.
    pub fn release_context(&self, context: ContextKey) {
        if context != self.immediate {
            self.objects.lock().contexts.remove(context);
        }
    }

    /// Validates `command`, applies its state change to the context and
    /// either executes it (immediate) or records it (deferred).
    pub fn submit(&self, context: ContextKey, command: Command) -> Result<()> {
        let mut objects = self.objects.lock();
        objects.validate(&command)?;
        if self.config.trace_commands {
            log::trace!("{context:?} <- {command:?}");
        }
        let record = objects.context_mut(context)?;
        record.state.apply(&command);
        if record.kind == ContextKind::Deferred {
            record.recorded.push(command);
            return Ok(());
        }
        objects.execute(&command)
    }

    /// Copy of the state currently tracked for `context`.
    pub fn pipeline_state(&self, context: ContextKey) -> Result<PipelineState> {
        Ok(self.objects.lock().context(context)?.state.clone())
    }

    /// Seals everything recorded on a deferred context into a command list.
    /// With `clear_state` the deferred context starts over from default state.
    pub fn finish_command_list(&self, context: ContextKey, clear_state: bool) -> Result<CommandListKey> {
        let mut objects = self.objects.lock();
        let record = objects.context_mut(context)?;
        if record.kind != ContextKind::Deferred {
            return Err(AnvilError::ContextRole("only deferred contexts record command lists"));
        }
        if !record.pending_maps.is_empty() {
            return Err(AnvilError::InvalidUsage(
                "resources are still mapped on the deferred context".into(),
            ));
        }
        let commands = std::mem::take(&mut record.recorded);
        if clear_state {
            record.state = PipelineState::default();
        }
        let count = commands.len();
        let list = objects.command_lists.insert(commands);
        log::debug!("Finished command list {list:?} with {count} commands");
        Ok(list)
    }

    /// Replays and consumes a command list on the immediate context. With
    /// `clear_state` the immediate context is reset to defaults afterwards,
    /// otherwise it keeps whatever state the list left behind.
    pub fn execute_command_list(&self, context: ContextKey, list: CommandListKey, clear_state: bool) -> Result<()> {
        let mut objects = self.objects.lock();
        if objects.context(context)?.kind != ContextKind::Immediate {
            return Err(AnvilError::ContextRole("command lists execute on the immediate context"));
        }
        let commands = objects
            .command_lists
            .remove(list)
            .ok_or_else(|| AnvilError::InvalidUsage("command list was already executed or released".into()))?;
        commands.iter().try_for_each(|command| objects.validate(command))?;

        for command in &commands {
            objects.context_mut(context)?.state.apply(command);
            objects.execute(command)?;
        }
        if clear_state {
            objects.context_mut(context)?.state = PipelineState::default();
        }
        objects.stats.command_lists_executed += 1;
        log::debug!("Executed command list {list:?} ({} commands)", commands.len());
        Ok(())
    }

    pub fn release_command_list(&self, list: CommandListKey) {
        self.objects.lock().command_lists.remove(list);
    }

    // ========================================================================
    // Map / Unmap
    // ========================================================================

    /// Maps the top subresource.
    ///
    /// On the immediate context the mapping aliases the backing store. On a
    /// deferred context only write-discard maps are allowed; they write into
    /// a fresh region that [`NativeDevice::unmap`] records as an update.
    pub fn map(&self, context: ContextKey, resource: ResourceKey, mode: MapMode) -> Result<MappedSubresource> {
        let mut objects = self.objects.lock();
        let kind = objects.context(context)?.kind;
        let record = objects.resource(resource)?;
        let required = mode.required_access();
        if !record.desc.cpu_access().contains(required) {
            return Err(AnvilError::InvalidUsage(format!(
                "{mode:?} map needs CPU access {required:?}, resource has {:?}",
                record.desc.cpu_access()
            )));
        }
        let (row_pitch, depth_pitch) = record.desc.pitches();
        let size = record.desc.byte_size();

        match kind {
            ContextKind::Immediate => {
                let record = objects
                    .resources
                    .get_mut(resource)
                    .ok_or_else(|| AnvilError::InvalidUsage("resource has been released".into()))?;
                if record.mapped {
                    return Err(AnvilError::DoubleMap);
                }
                record.mapped = true;
                Ok(MappedSubresource::new(record.store.clone(), row_pitch, depth_pitch, mode))
            }
            ContextKind::Deferred => {
                if mode != MapMode::WriteDiscard {
                    return Err(AnvilError::InvalidUsage(
                        "deferred contexts only support write-discard maps".into(),
                    ));
                }
                let region = new_store(vec![0; size]);
                let pending = &mut objects.context_mut(context)?.pending_maps;
                if pending.contains_key(&resource) {
                    return Err(AnvilError::DoubleMap);
                }
                let mapped = MappedSubresource::new(region, row_pitch, depth_pitch, mode);
                pending.insert(resource, mapped.clone());
                Ok(mapped)
            }
        }
    }

    pub fn unmap(&self, context: ContextKey, resource: ResourceKey) -> Result<()> {
        let mut objects = self.objects.lock();
        match objects.context(context)?.kind {
            ContextKind::Immediate => {
                let record = objects
                    .resources
                    .get_mut(resource)
                    .filter(|r| r.mapped)
                    .ok_or(AnvilError::UnmapWithoutMap)?;
                record.mapped = false;
                Ok(())
            }
            ContextKind::Deferred => {
                let record = objects.context_mut(context)?;
                let mapped = record.pending_maps.remove(&resource).ok_or(AnvilError::UnmapWithoutMap)?;
                let data = mapped.store().lock().clone();
                record.recorded.push(Command::UpdateSubresource {
                    dst: resource,
                    offset: 0,
                    data,
                });
                Ok(())
            }
        }
    }

    // ========================================================================
    // Swap Chains
    // ========================================================================

    fn back_buffer_desc(width: u32, height: u32, format: PixelFormat) -> TextureDesc {
        TextureDesc {
            dimension: TextureDimension::D2,
            width,
            height,
            depth: 1,
            mip_levels: 1,
            format,
            sample_count: 1,
            sample_quality: 0,
            usage: Usage::Static,
            bind: BindFlags::RENDER_TARGET,
            cpu_access: CpuAccess::empty(),
        }
    }

    /// Creates a presentation surface; returns it with its back-buffer texture.
    pub fn create_swap_chain(&self, width: u32, height: u32, format: PixelFormat) -> Result<(SwapChainKey, ResourceKey)> {
        let desc = Self::back_buffer_desc(width, height, format);
        validate_texture(&desc, false)?;
        let mut objects = self.objects.lock();
        let back_buffer = self.allocate(&mut objects, ResourceDesc::Texture(desc), None)?;
        let chain = objects.swap_chains.insert(SwapChainRecord {
            width,
            height,
            format,
            back_buffer,
            presents: 0,
        });
        log::debug!("Created swap chain {chain:?} {width}x{height}");
        Ok((chain, back_buffer))
    }

    /// Creates a new back buffer of the given size. The previous back-buffer
    /// texture stays alive until its owner releases it.
    pub fn resize_swap_chain(&self, chain: SwapChainKey, width: u32, height: u32) -> Result<ResourceKey> {
        let mut objects = self.objects.lock();
        let format = objects
            .swap_chains
            .get(chain)
            .map(|c| c.format)
            .ok_or_else(|| AnvilError::InvalidUsage("swap chain has been released".into()))?;
        let desc = Self::back_buffer_desc(width, height, format);
        validate_texture(&desc, false)?;
        let back_buffer = self.allocate(&mut objects, ResourceDesc::Texture(desc), None)?;
        if let Some(record) = objects.swap_chains.get_mut(chain) {
            record.width = width;
            record.height = height;
            record.back_buffer = back_buffer;
        }
        log::debug!("Resized swap chain {chain:?} to {width}x{height}");
        Ok(back_buffer)
    }

    /// Presents the back buffer; returns the number of frames presented so far.
    pub fn present(&self, chain: SwapChainKey, sync_interval: u32) -> Result<u64> {
        if sync_interval > 4 {
            return Err(AnvilError::InvalidUsage(format!("sync interval {sync_interval} exceeds 4")));
        }
        let mut objects = self.objects.lock();
        let record = objects
            .swap_chains
            .get_mut(chain)
            .ok_or_else(|| AnvilError::InvalidUsage("swap chain has been released".into()))?;
        record.presents += 1;
        let presents = record.presents;
        objects.stats.presents += 1;
        Ok(presents)
    }

    #[must_use]
    pub fn swap_chain_size(&self, chain: SwapChainKey) -> Option<(u32, u32)> {
        self.objects.lock().swap_chains.get(chain).map(|c| (c.width, c.height))
    }

    #[must_use]
    pub fn swap_chain_back_buffer(&self, chain: SwapChainKey) -> Option<ResourceKey> {
        self.objects.lock().swap_chains.get(chain).map(|c| c.back_buffer)
    }

    pub fn release_swap_chain(&self, chain: SwapChainKey) {
        self.objects.lock().swap_chains.remove(chain);
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    #[must_use]
    pub fn stats(&self) -> DeviceStats {
        self.objects.lock().stats
    }

    /// Bytes currently allocated for backing stores.
    #[must_use]
    pub fn allocated_bytes(&self) -> u64 {
        self.objects.lock().allocated
    }

    /// Objects currently alive, excluding the immediate context.
    #[must_use]
    pub fn live_object_count(&self) -> usize {
        let objects = self.objects.lock();
        objects.resources.len()
            + objects.views.len()
            + objects.states.len()
            + objects.shaders.len()
            + objects.layouts.len()
            + objects.contexts.len().saturating_sub(1)
            + objects.command_lists.len()
            + objects.swap_chains.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{ReferenceCompiler, ShaderCompiler};
    use smallvec::smallvec;

    fn device() -> NativeDevice {
        let _ = env_logger::builder().is_test(true).try_init();
        NativeDevice::new(AdapterInfo::reference(), DeviceConfig::default())
    }

    fn buffer(usage: Usage, bind: BindFlags, bytes: u32) -> BufferDesc {
        BufferDesc {
            byte_width: bytes,
            usage,
            bind,
            cpu_access: usage.cpu_access(),
            ..Default::default()
        }
    }

    fn texture(usage: Usage, bind: BindFlags, format: PixelFormat) -> TextureDesc {
        TextureDesc {
            dimension: TextureDimension::D2,
            width: 4,
            height: 4,
            depth: 1,
            mip_levels: 1,
            format,
            sample_count: 1,
            sample_quality: 0,
            usage,
            bind,
            cpu_access: usage.cpu_access(),
        }
    }

    // ========================================================================
    // Creation rules
    // ========================================================================

    #[test]
    fn immutable_requires_data() {
        let device = device();
        let desc = buffer(Usage::Immutable, BindFlags::VERTEX_BUFFER, 16);
        assert!(matches!(device.create_buffer(&desc, None), Err(AnvilError::AllocationFailure(_))));
        assert!(device.create_buffer(&desc, Some(&[0; 16])).is_ok());
    }

    #[test]
    fn staging_cannot_be_bound() {
        let device = device();
        let desc = buffer(Usage::Staging, BindFlags::VERTEX_BUFFER, 16);
        assert!(device.create_buffer(&desc, None).is_err());
    }

    #[test]
    fn constant_buffer_size_rules() {
        let device = device();
        assert!(device.create_buffer(&buffer(Usage::Dynamic, BindFlags::CONSTANT_BUFFER, 12), None).is_err());
        assert!(device.create_buffer(&buffer(Usage::Dynamic, BindFlags::CONSTANT_BUFFER, 16), None).is_ok());
        assert!(
            device
                .create_buffer(&buffer(Usage::Static, BindFlags::CONSTANT_BUFFER, 65536 + 16), None)
                .is_err()
        );
    }

    #[test]
    fn memory_budget_is_enforced() {
        let device = NativeDevice::new(
            AdapterInfo::reference(),
            DeviceConfig {
                memory_budget: Some(64),
                ..Default::default()
            },
        );
        let desc = buffer(Usage::Static, BindFlags::VERTEX_BUFFER, 48);
        let first = device.create_buffer(&desc, None).unwrap();
        assert!(matches!(device.create_buffer(&desc, None), Err(AnvilError::AllocationFailure(_))));
        device.release_resource(first);
        assert_eq!(device.allocated_bytes(), 0);
        assert!(device.create_buffer(&desc, None).is_ok());
    }

    #[test]
    fn views_need_matching_bind_flags() {
        let device = device();
        let tex = device
            .create_texture(&texture(Usage::Static, BindFlags::SHADER_RESOURCE, PixelFormat::Rgba8Unorm), None)
            .unwrap();
        let rtv = ViewDesc {
            kind: ViewKind::RenderTarget,
            format: PixelFormat::Rgba8Unorm,
        };
        assert!(device.create_view(tex, &rtv).is_err());
        let srv = ViewDesc {
            kind: ViewKind::ShaderResource,
            format: PixelFormat::Rgba8Unorm,
        };
        assert!(device.create_view(tex, &srv).is_ok());
    }

    #[test]
    fn shader_stage_must_match_bytecode() {
        let device = device();
        let out = ReferenceCompiler.compile("void main() {}", "inline", "main", "vs_5_0");
        let bytecode = out.bytecode.unwrap();
        assert!(device.create_shader(ShaderStage::Pixel, &bytecode).is_err());
        assert!(device.create_shader(ShaderStage::Vertex, &bytecode).is_ok());
    }

    // ========================================================================
    // Contexts
    // ========================================================================

    #[test]
    fn deferred_commands_run_on_execute() {
        let device = device();
        let desc = texture(Usage::Static, BindFlags::RENDER_TARGET, PixelFormat::Rgba8Unorm);
        let target = device.create_texture(&desc, None).unwrap();
        let rtv = device
            .create_view(
                target,
                &ViewDesc {
                    kind: ViewKind::RenderTarget,
                    format: PixelFormat::Rgba8Unorm,
                },
            )
            .unwrap();

        let deferred = device.create_deferred_context().unwrap();
        device
            .submit(deferred, Command::SetRenderTargets { targets: smallvec![Some(rtv)], depth: None })
            .unwrap();
        device
            .submit(deferred, Command::ClearRenderTargetView { view: rtv, color: [0.0, 1.0, 0.0, 1.0] })
            .unwrap();
        device
            .submit(deferred, Command::Draw { vertex_count: 3, start_vertex: 0 })
            .unwrap();

        // Nothing has happened on the device yet.
        assert!(device.read_back(target).unwrap().iter().all(|b| *b == 0));
        assert_eq!(device.stats().draw_calls, 0);

        let list = device.finish_command_list(deferred, true).unwrap();
        assert_eq!(device.pipeline_state(deferred).unwrap(), PipelineState::default());

        let immediate = device.immediate_context();
        device.execute_command_list(immediate, list, false).unwrap();
        assert_eq!(&device.read_back(target).unwrap()[..4], &[0, 255, 0, 255]);
        assert_eq!(device.stats().draw_calls, 1);
        assert_eq!(device.pipeline_state(immediate).unwrap().render_targets[0], Some(rtv));

        // Consumed.
        assert!(device.execute_command_list(immediate, list, false).is_err());
    }

    #[test]
    fn command_lists_only_execute_on_the_immediate_context() {
        let device = device();
        let deferred = device.create_deferred_context().unwrap();
        let list = device.finish_command_list(deferred, true).unwrap();
        assert!(matches!(
            device.execute_command_list(deferred, list, true),
            Err(AnvilError::ContextRole(_))
        ));
        assert!(matches!(
            device.finish_command_list(device.immediate_context(), true),
            Err(AnvilError::ContextRole(_))
        ));
    }

    #[test]
    fn deferred_map_records_an_update() {
        let device = device();
        let key = device
            .create_buffer(&buffer(Usage::Dynamic, BindFlags::VERTEX_BUFFER, 8), None)
            .unwrap();
        let deferred = device.create_deferred_context().unwrap();

        assert!(device.map(deferred, key, MapMode::ReadWrite).is_err());
        let mapped = device.map(deferred, key, MapMode::WriteDiscard).unwrap();
        mapped.write(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert!(matches!(device.map(deferred, key, MapMode::WriteDiscard), Err(AnvilError::DoubleMap)));
        device.unmap(deferred, key).unwrap();
        assert!(device.read_back(key).unwrap().iter().all(|b| *b == 0));

        let list = device.finish_command_list(deferred, true).unwrap();
        device.execute_command_list(device.immediate_context(), list, true).unwrap();
        assert_eq!(device.read_back(key).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn immediate_map_pairs() {
        let device = device();
        let key = device.create_buffer(&buffer(Usage::Staging, BindFlags::empty(), 4), None).unwrap();
        let ctx = device.immediate_context();
        assert!(matches!(device.unmap(ctx, key), Err(AnvilError::UnmapWithoutMap)));
        let mapped = device.map(ctx, key, MapMode::ReadWrite).unwrap();
        assert_eq!(mapped.row_pitch(), 4);
        assert!(matches!(device.map(ctx, key, MapMode::ReadWrite), Err(AnvilError::DoubleMap)));
        device.unmap(ctx, key).unwrap();
    }

    #[test]
    fn slot_ranges_are_checked() {
        let device = device();
        let ctx = device.immediate_context();
        let err = device
            .submit(
                ctx,
                Command::SetSamplers {
                    stage: ShaderStage::Pixel,
                    start: 16,
                    samplers: smallvec![None],
                },
            )
            .unwrap_err();
        assert!(matches!(err, AnvilError::SlotOverflow { max: 16, .. }));
    }

    #[test]
    fn swap_chain_resize_and_present() {
        let device = device();
        let (chain, first) = device.create_swap_chain(64, 32, PixelFormat::Bgra8Unorm).unwrap();
        let second = device.resize_swap_chain(chain, 128, 64).unwrap();
        assert_ne!(first, second);
        assert_eq!(device.swap_chain_size(chain), Some((128, 64)));
        assert_eq!(device.swap_chain_back_buffer(chain), Some(second));
        assert_eq!(device.present(chain, 1).unwrap(), 1);
        assert_eq!(device.present(chain, 0).unwrap(), 2);
        assert_eq!(device.stats().presents, 2);
    }
}
