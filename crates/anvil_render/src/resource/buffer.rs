//! Buffers
//!
//! Every buffer kind is the same native buffer with a different bind/misc
//! flag combination:
//!
//! | Kind       | Bind flags                    | Views        |
//! |------------|-------------------------------|--------------|
//! | Vertex     | vertex buffer                 | none         |
//! | Index      | index buffer                  | none         |
//! | Constant   | constant buffer (16-aligned)  | none         |
//! | Structured | shader resource (+ UAV)       | untyped SRV  |
//! | Raw        | shader resource (+ UAV)       | typed SRV    |
//! | Instance   | vertex buffer                 | none         |
//!
//! Staging buffers carry no bind flags and no views; they exist for CPU
//! readback and upload only.

use anvil_core::{AnvilError, Format, PixelFormat, Result, ShaderStages, Usage};
use anvil_device::{BindFlags, BufferDesc, NativeDevice, ResourceKey, ResourceMisc, ViewDesc, ViewKind};
use bytemuck::Pod;

use super::{
    BufferLayout, ConstantBuffer, IndexBuffer, InstanceBuffer, RawBuffer, Resource, ResourceKind, ResourceLayout,
    ResourceState, ResourceViews, StructuredBuffer, VertexBuffer,
};
use crate::instance::Instance;
use crate::owner::DeviceRef;

/// Everything needed to create one buffer.
pub(crate) struct BufferSpec<'a> {
    pub kind: ResourceKind,
    pub type_size: u32,
    pub num_elements: u32,
    pub usage: Usage,
    pub format: Option<Format>,
    pub unordered_access: bool,
    pub default_slot: u32,
    pub default_stages: ShaderStages,
    pub data: Option<&'a [u8]>,
}

impl BufferSpec<'_> {
    fn new(kind: ResourceKind, type_size: u32, num_elements: u32, usage: Usage) -> Self {
        Self {
            kind,
            type_size,
            num_elements,
            usage,
            format: None,
            unordered_access: false,
            default_slot: 0,
            default_stages: ShaderStages::empty(),
            data: None,
        }
    }
}

fn index_format_for(kind: ResourceKind, type_size: u32) -> PixelFormat {
    if kind == ResourceKind::IndexBuffer {
        PixelFormat::index_for_width(type_size)
    } else {
        PixelFormat::Unknown
    }
}

pub(crate) fn buffer_desc(
    kind: ResourceKind,
    type_size: u32,
    num_elements: u32,
    usage: Usage,
    unordered_access: bool,
) -> Result<BufferDesc> {
    let byte_width = type_size.checked_mul(num_elements).ok_or_else(|| {
        AnvilError::AllocationFailure(format!("buffer of {num_elements} x {type_size} bytes overflows"))
    })?;
    let (mut bind, misc, stride, byte_width) = match kind {
        ResourceKind::VertexBuffer | ResourceKind::InstanceBuffer => {
            (BindFlags::VERTEX_BUFFER, ResourceMisc::empty(), 0, byte_width)
        }
        ResourceKind::IndexBuffer => (BindFlags::INDEX_BUFFER, ResourceMisc::empty(), 0, byte_width),
        ResourceKind::ConstantBuffer => (
            BindFlags::CONSTANT_BUFFER,
            ResourceMisc::empty(),
            0,
            byte_width.next_multiple_of(16),
        ),
        ResourceKind::StructuredBuffer => (
            BindFlags::SHADER_RESOURCE,
            ResourceMisc::BUFFER_STRUCTURED,
            type_size,
            byte_width,
        ),
        ResourceKind::RawBuffer => (
            BindFlags::SHADER_RESOURCE,
            ResourceMisc::BUFFER_ALLOW_RAW_VIEWS,
            0,
            byte_width,
        ),
        _ => return Err(AnvilError::InvalidUsage(format!("{kind:?} is not a buffer kind"))),
    };
    if unordered_access && bind.contains(BindFlags::SHADER_RESOURCE) {
        bind |= BindFlags::UNORDERED_ACCESS;
    }
    if usage == Usage::Staging {
        bind = BindFlags::empty();
    }
    Ok(BufferDesc {
        byte_width,
        usage,
        bind,
        cpu_access: usage.cpu_access(),
        misc,
        structure_stride: stride,
    })
}

pub(crate) fn release_backing(device: &NativeDevice, backing: ResourceKey, views: ResourceViews) {
    for view in views.keys() {
        device.release_view(view);
    }
    device.release_resource(backing);
}

/// Creates the requested views. On failure the backing store is released too.
pub(crate) fn create_views(
    device: &NativeDevice,
    backing: ResourceKey,
    requests: &[(ViewKind, PixelFormat)],
) -> Result<ResourceViews> {
    let mut views = ResourceViews::default();
    for (kind, format) in requests {
        let view = match device.create_view(backing, &ViewDesc { kind: *kind, format: *format }) {
            Ok(view) => view,
            Err(err) => {
                release_backing(device, backing, views);
                return Err(err);
            }
        };
        let slot = match kind {
            ViewKind::ShaderResource => &mut views.srv,
            ViewKind::UnorderedAccess => &mut views.uav,
            ViewKind::RenderTarget => &mut views.rtv,
            ViewKind::DepthStencil => &mut views.dsv,
        };
        *slot = Some(view);
    }
    Ok(views)
}

fn build_backing(
    owner: &DeviceRef,
    kind: ResourceKind,
    layout: &BufferLayout,
    usage: Usage,
    data: Option<&[u8]>,
) -> Result<(ResourceKey, ResourceViews)> {
    let desc = buffer_desc(kind, layout.type_size, layout.num_elements, usage, layout.unordered_access)?;
    let view_format = layout.format.map(Format::pixel_format).transpose()?.unwrap_or_default();

    // Constant buffer sizes are rounded up; short initial data is zero-padded.
    let padded;
    let data = match data {
        Some(bytes) if kind == ResourceKind::ConstantBuffer && bytes.len() < desc.byte_width as usize => {
            padded = pad_to(bytes, desc.byte_width as usize);
            Some(padded.as_slice())
        }
        other => other,
    };

    let device = &owner.device;
    let backing = device.create_buffer(&desc, data)?;
    let mut requests = Vec::with_capacity(2);
    if desc.bind.contains(BindFlags::SHADER_RESOURCE) {
        requests.push((ViewKind::ShaderResource, view_format));
    }
    if desc.bind.contains(BindFlags::UNORDERED_ACCESS) {
        requests.push((ViewKind::UnorderedAccess, view_format));
    }
    let views = create_views(device, backing, &requests)?;
    Ok((backing, views))
}

fn pad_to(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut padded = bytes.to_vec();
    padded.resize(len, 0);
    padded
}

pub(crate) fn create_buffer(owner: &DeviceRef, spec: BufferSpec<'_>) -> Result<Resource> {
    let layout = BufferLayout {
        type_size: spec.type_size,
        num_elements: spec.num_elements,
        format: spec.format,
        index_format: index_format_for(spec.kind, spec.type_size),
        unordered_access: spec.unordered_access,
        linked_index: None,
    };
    let (backing, views) = build_backing(owner, spec.kind, &layout, spec.usage, spec.data)?;
    Ok(Resource::new(
        owner.clone(),
        spec.kind,
        ResourceState {
            backing,
            views,
            usage: spec.usage,
            default_slot: spec.default_slot,
            default_stages: spec.default_stages,
            mapped: false,
            layout: ResourceLayout::Buffer(layout),
        },
    ))
}

impl Resource {
    /// Replaces the backing store and views of a buffer, keeping its identity.
    ///
    /// The new usage replaces the old one. Bindings made before the call
    /// still reference the old backing store until rebound. Constant buffers
    /// must keep exactly one element; mapped buffers cannot be reallocated.
    pub fn reallocate(&self, type_size: u32, num_elements: u32, usage: Usage, data: Option<&[u8]>) -> Result<()> {
        let kind = self.kind();
        if !kind.is_buffer() {
            return Err(AnvilError::InvalidUsage(format!("{kind:?} cannot be reallocated")));
        }
        if kind == ResourceKind::ConstantBuffer && num_elements != 1 {
            return Err(AnvilError::InvalidUsage(format!(
                "constant buffers hold exactly one element, got {num_elements}"
            )));
        }

        let mut state = self.write();
        if state.mapped {
            return Err(AnvilError::InvalidUsage("cannot reallocate a mapped buffer".into()));
        }
        let (format, unordered_access) = state
            .buffer()
            .map(|b| (b.format, b.unordered_access))
            .ok_or_else(|| AnvilError::InvalidUsage("buffer has no buffer layout".into()))?;
        let candidate = BufferLayout {
            type_size,
            num_elements,
            format,
            index_format: index_format_for(kind, type_size),
            unordered_access,
            linked_index: None,
        };
        let (backing, views) = build_backing(self.owner(), kind, &candidate, usage, data)?;

        release_backing(&self.owner().device, state.backing, state.views);
        state.backing = backing;
        state.views = views;
        state.usage = usage;
        if let Some(layout) = state.buffer_mut() {
            layout.type_size = type_size;
            layout.num_elements = num_elements;
            layout.index_format = candidate.index_format;
        }
        log::debug!("Reallocated {kind:?} #{} as {num_elements} x {type_size} bytes ({usage:?})", self.id());
        Ok(())
    }
}

impl VertexBuffer {
    /// Associates an index buffer that is bound whenever this buffer is.
    /// The link does not keep `index` alive.
    pub fn link_index_buffer(&self, index: &IndexBuffer) -> Result<()> {
        self.owner().check_same(index.owner(), "link_index_buffer")?;
        let weak = index.downgrade();
        if let Some(layout) = self.write().buffer_mut() {
            layout.linked_index = Some(weak);
        }
        Ok(())
    }

    pub fn clear_index_buffer(&self) {
        if let Some(layout) = self.write().buffer_mut() {
            layout.linked_index = None;
        }
    }

    /// The linked index buffer, or `None` once it has been dropped.
    #[must_use]
    pub fn linked_index_buffer(&self) -> Option<IndexBuffer> {
        let state = self.read();
        let inner = state.buffer()?.linked_index.as_ref()?.upgrade()?;
        Some(IndexBuffer::wrap(Resource(inner)))
    }
}

impl IndexBuffer {
    /// `R8Uint`, `R16Uint` or `R32Uint`, selected from the element size.
    #[must_use]
    pub fn index_format(&self) -> PixelFormat {
        self.read().buffer().map_or(PixelFormat::Unknown, |b| b.index_format)
    }
}

// ============================================================================
// Factories
// ============================================================================

fn elements<T>(items: &[T]) -> Result<(u32, u32)> {
    let count = u32::try_from(items.len())
        .map_err(|_| AnvilError::AllocationFailure(format!("{} elements exceed a buffer", items.len())))?;
    Ok((size_of::<T>() as u32, count))
}

impl Instance {
    pub fn create_vertex_buffer(
        &self,
        type_size: u32,
        num_elements: u32,
        usage: Usage,
        data: Option<&[u8]>,
    ) -> Result<VertexBuffer> {
        let spec = BufferSpec {
            data,
            ..BufferSpec::new(ResourceKind::VertexBuffer, type_size, num_elements, usage)
        };
        create_buffer(self.owner(), spec).map(VertexBuffer::wrap)
    }

    pub fn create_vertex_buffer_from<T: Pod>(&self, vertices: &[T], usage: Usage) -> Result<VertexBuffer> {
        let (type_size, count) = elements(vertices)?;
        self.create_vertex_buffer(type_size, count, usage, Some(bytemuck::cast_slice(vertices)))
    }

    /// Element sizes of 1 and 2 bytes select 8- and 16-bit indices; anything
    /// else selects 32-bit indices.
    pub fn create_index_buffer(
        &self,
        type_size: u32,
        num_elements: u32,
        usage: Usage,
        data: Option<&[u8]>,
    ) -> Result<IndexBuffer> {
        let spec = BufferSpec {
            data,
            ..BufferSpec::new(ResourceKind::IndexBuffer, type_size, num_elements, usage)
        };
        create_buffer(self.owner(), spec).map(IndexBuffer::wrap)
    }

    pub fn create_index_buffer_from<T: Pod>(&self, indices: &[T], usage: Usage) -> Result<IndexBuffer> {
        let (type_size, count) = elements(indices)?;
        self.create_index_buffer(type_size, count, usage, Some(bytemuck::cast_slice(indices)))
    }

    /// A one-element constant buffer. The native size is rounded up to 16 bytes.
    pub fn create_constant_buffer(
        &self,
        type_size: u32,
        default_stages: ShaderStages,
        default_slot: u32,
        usage: Usage,
        data: Option<&[u8]>,
    ) -> Result<ConstantBuffer> {
        let spec = BufferSpec {
            default_slot,
            default_stages,
            data,
            ..BufferSpec::new(ResourceKind::ConstantBuffer, type_size, 1, usage)
        };
        create_buffer(self.owner(), spec).map(ConstantBuffer::wrap)
    }

    pub fn create_constant_buffer_from<T: Pod>(
        &self,
        value: &T,
        default_stages: ShaderStages,
        default_slot: u32,
        usage: Usage,
    ) -> Result<ConstantBuffer> {
        self.create_constant_buffer(
            size_of::<T>() as u32,
            default_stages,
            default_slot,
            usage,
            Some(bytemuck::bytes_of(value)),
        )
    }

    pub fn create_structured_buffer(
        &self,
        type_size: u32,
        num_elements: u32,
        default_stages: ShaderStages,
        default_slot: u32,
        usage: Usage,
        data: Option<&[u8]>,
        unordered_access: bool,
    ) -> Result<StructuredBuffer> {
        let spec = BufferSpec {
            unordered_access,
            default_slot,
            default_stages,
            data,
            ..BufferSpec::new(ResourceKind::StructuredBuffer, type_size, num_elements, usage)
        };
        create_buffer(self.owner(), spec).map(StructuredBuffer::wrap)
    }

    /// A buffer of `format` elements read through a view of that format.
    pub fn create_raw_buffer(
        &self,
        format: Format,
        num_elements: u32,
        default_stages: ShaderStages,
        default_slot: u32,
        usage: Usage,
        data: Option<&[u8]>,
        unordered_access: bool,
    ) -> Result<RawBuffer> {
        format.pixel_format()?;
        let spec = BufferSpec {
            format: Some(format),
            unordered_access,
            default_slot,
            default_stages,
            data,
            ..BufferSpec::new(ResourceKind::RawBuffer, format.element_size(), num_elements, usage)
        };
        create_buffer(self.owner(), spec).map(RawBuffer::wrap)
    }

    pub fn create_instance_buffer(
        &self,
        type_size: u32,
        num_elements: u32,
        usage: Usage,
        data: Option<&[u8]>,
    ) -> Result<InstanceBuffer> {
        let spec = BufferSpec {
            data,
            ..BufferSpec::new(ResourceKind::InstanceBuffer, type_size, num_elements, usage)
        };
        create_buffer(self.owner(), spec).map(InstanceBuffer::wrap)
    }

    pub fn create_instance_buffer_from<T: Pod>(&self, instances: &[T], usage: Usage) -> Result<InstanceBuffer> {
        let (type_size, count) = elements(instances)?;
        self.create_instance_buffer(type_size, count, usage, Some(bytemuck::cast_slice(instances)))
    }
}
