//! Textures
//!
//! 1D, 2D and 3D textures, render targets and depth buffers. Each is one
//! backing store plus the views its parameters ask for:
//!
//! - a shader-resource view when `allow_shader_resource` is set
//! - an unordered-access view when `allow_unordered_access` is set
//! - a render-target view for render targets
//! - a depth-stencil view plus a depth-only shader-resource view for depth buffers
//!
//! Staging textures get no views at all; they only serve CPU readback.

use std::path::Path;

use anvil_core::{AnvilError, Format, FormatKind, PixelFormat, Result, ShaderStages, Usage};
use anvil_device::{BindFlags, ResourceKey, TextureDesc, TextureDimension, ViewKind};

use super::buffer::{create_views, release_backing};
use super::{
    DepthBuffer, RenderTarget, Resource, ResourceKind, ResourceLayout, ResourceState, Texture1D, Texture2D,
    Texture3D, TextureLayout,
};
use crate::instance::Instance;
use crate::owner::DeviceRef;
use crate::surface::{PadMode, Surface2D};

/// Parameters of a 1D texture.
///
/// # Quick start
///
/// ```rust,ignore
/// let params = TextureParams1D {
///     width: 256,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams1D {
    pub width: u32,
    pub mip_levels: u32,
    pub format: Format,
    pub usage: Usage,
    pub allow_unordered_access: bool,
    pub allow_shader_resource: bool,
}

impl Default for TextureParams1D {
    fn default() -> Self {
        Self {
            width: 0,
            mip_levels: 1,
            format: Format::RGBA8_UNORM,
            usage: Usage::Static,
            allow_unordered_access: false,
            allow_shader_resource: true,
        }
    }
}

/// Parameters of a 2D texture, render target or depth buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams2D {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: Format,
    pub usage: Usage,
    pub allow_unordered_access: bool,
    pub allow_shader_resource: bool,
    pub sample_count: u32,
    pub sample_quality: u32,
}

impl Default for TextureParams2D {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            mip_levels: 1,
            format: Format::RGBA8_UNORM,
            usage: Usage::Static,
            allow_unordered_access: false,
            allow_shader_resource: true,
            sample_count: 1,
            sample_quality: 0,
        }
    }
}

impl TextureParams2D {
    /// Default parameters at the given size.
    #[must_use]
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

/// Parameters of a 3D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub format: Format,
    pub usage: Usage,
    pub allow_unordered_access: bool,
    pub allow_shader_resource: bool,
}

impl Default for TextureParams3D {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            depth: 0,
            mip_levels: 1,
            format: Format::RGBA8_UNORM,
            usage: Usage::Static,
            allow_unordered_access: false,
            allow_shader_resource: true,
        }
    }
}

struct TextureSpec {
    kind: ResourceKind,
    layout: TextureLayout,
    usage: Usage,
    shader_resource: bool,
    unordered_access: bool,
}

impl From<&TextureParams1D> for TextureLayout {
    fn from(p: &TextureParams1D) -> Self {
        Self {
            dimension: TextureDimension::D1,
            width: p.width,
            height: 1,
            depth: 1,
            mip_levels: p.mip_levels,
            format: p.format,
            pixel_format: PixelFormat::Unknown,
            sample_count: 1,
            sample_quality: 0,
        }
    }
}

impl From<&TextureParams2D> for TextureLayout {
    fn from(p: &TextureParams2D) -> Self {
        Self {
            dimension: TextureDimension::D2,
            width: p.width,
            height: p.height,
            depth: 1,
            mip_levels: p.mip_levels,
            format: p.format,
            pixel_format: PixelFormat::Unknown,
            sample_count: p.sample_count,
            sample_quality: p.sample_quality,
        }
    }
}

impl From<&TextureParams3D> for TextureLayout {
    fn from(p: &TextureParams3D) -> Self {
        Self {
            dimension: TextureDimension::D3,
            width: p.width,
            height: p.height,
            depth: p.depth,
            mip_levels: p.mip_levels,
            format: p.format,
            pixel_format: PixelFormat::Unknown,
            sample_count: 1,
            sample_quality: 0,
        }
    }
}

fn texture_desc(layout: &TextureLayout, usage: Usage, bind: BindFlags) -> TextureDesc {
    TextureDesc {
        dimension: layout.dimension,
        width: layout.width,
        height: layout.height,
        depth: layout.depth,
        mip_levels: layout.mip_levels,
        format: layout.pixel_format,
        sample_count: layout.sample_count,
        sample_quality: layout.sample_quality,
        usage,
        bind,
        cpu_access: usage.cpu_access(),
    }
}

fn into_resource(owner: &DeviceRef, kind: ResourceKind, state: ResourceState) -> Resource {
    Resource::new(owner.clone(), kind, state)
}

fn texture_state(backing: ResourceKey, views: super::ResourceViews, usage: Usage, layout: TextureLayout) -> ResourceState {
    ResourceState {
        backing,
        views,
        usage,
        default_slot: 0,
        default_stages: ShaderStages::PIXEL,
        mapped: false,
        layout: ResourceLayout::Texture(layout),
    }
}

fn create_texture(owner: &DeviceRef, spec: TextureSpec, data: Option<&[u8]>) -> Result<Resource> {
    let mut layout = spec.layout;
    layout.pixel_format = layout.format.pixel_format()?;
    let format = layout.pixel_format;

    let bindable = spec.usage != Usage::Staging;
    let mut requests = Vec::with_capacity(3);
    let mut bind = BindFlags::empty();
    if bindable && spec.shader_resource {
        bind |= BindFlags::SHADER_RESOURCE;
        requests.push((ViewKind::ShaderResource, format));
    }
    if bindable && spec.unordered_access {
        bind |= BindFlags::UNORDERED_ACCESS;
        requests.push((ViewKind::UnorderedAccess, format));
    }
    if bindable && spec.kind == ResourceKind::RenderTarget {
        bind |= BindFlags::RENDER_TARGET;
        requests.push((ViewKind::RenderTarget, format));
    }

    let device = &owner.device;
    let backing = device.create_texture(&texture_desc(&layout, spec.usage, bind), data)?;
    let views = create_views(device, backing, &requests)?;
    Ok(into_resource(owner, spec.kind, texture_state(backing, views, spec.usage, layout)))
}

/// `(backing, depth-stencil view, shader-resource view)` formats.
const fn depth_formats(enable_stencil: bool) -> (PixelFormat, PixelFormat, PixelFormat) {
    if enable_stencil {
        (PixelFormat::R24G8Typeless, PixelFormat::D24UnormS8Uint, PixelFormat::R24UnormX8Typeless)
    } else {
        (PixelFormat::R32Typeless, PixelFormat::D32Float, PixelFormat::R32Float)
    }
}

fn create_depth(owner: &DeviceRef, params: &TextureParams2D, enable_stencil: bool) -> Result<Resource> {
    let (backing_format, dsv_format, srv_format) = depth_formats(enable_stencil);
    let layout = TextureLayout {
        mip_levels: 1,
        format: Format::new(FormatKind::Typeless32, 1),
        pixel_format: backing_format,
        ..TextureLayout::from(params)
    };
    let bind = BindFlags::DEPTH_STENCIL | BindFlags::SHADER_RESOURCE;
    let device = &owner.device;
    let backing = device.create_texture(&texture_desc(&layout, Usage::Static, bind), None)?;
    let views = create_views(
        device,
        backing,
        &[(ViewKind::DepthStencil, dsv_format), (ViewKind::ShaderResource, srv_format)],
    )?;
    Ok(into_resource(
        owner,
        ResourceKind::DepthBuffer,
        texture_state(backing, views, Usage::Static, layout),
    ))
}

// ============================================================================
// Back Buffers
// ============================================================================

fn back_buffer_layout(width: u32, height: u32) -> TextureLayout {
    TextureLayout {
        dimension: TextureDimension::D2,
        width,
        height,
        depth: 1,
        mip_levels: 1,
        format: Format::BGRA8_UNORM,
        pixel_format: PixelFormat::Bgra8Unorm,
        sample_count: 1,
        sample_quality: 0,
    }
}

/// Wraps a swap chain's back-buffer texture as a render target.
pub(crate) fn wrap_back_buffer(owner: &DeviceRef, backing: ResourceKey, width: u32, height: u32) -> Result<RenderTarget> {
    let views = create_views(&owner.device, backing, &[(ViewKind::RenderTarget, PixelFormat::Bgra8Unorm)])?;
    let state = texture_state(backing, views, Usage::Static, back_buffer_layout(width, height));
    Ok(RenderTarget::wrap(into_resource(owner, ResourceKind::RenderTarget, state)))
}

/// Points an existing back-buffer handle at a new texture, releasing the old one.
pub(crate) fn replace_back_buffer(target: &RenderTarget, backing: ResourceKey, width: u32, height: u32) -> Result<()> {
    let device = &target.owner().device;
    let views = create_views(device, backing, &[(ViewKind::RenderTarget, PixelFormat::Bgra8Unorm)])?;
    let mut state = target.write();
    release_backing(device, state.backing, state.views);
    state.backing = backing;
    state.views = views;
    state.layout = ResourceLayout::Texture(back_buffer_layout(width, height));
    Ok(())
}

// ============================================================================
// Factories
// ============================================================================

impl Instance {
    pub fn create_texture_1d(&self, params: &TextureParams1D, data: Option<&[u8]>) -> Result<Texture1D> {
        let spec = TextureSpec {
            kind: ResourceKind::Texture1D,
            layout: params.into(),
            usage: params.usage,
            shader_resource: params.allow_shader_resource,
            unordered_access: params.allow_unordered_access,
        };
        create_texture(self.owner(), spec, data).map(Texture1D::wrap)
    }

    pub fn create_texture_2d(&self, params: &TextureParams2D, data: Option<&[u8]>) -> Result<Texture2D> {
        let spec = TextureSpec {
            kind: ResourceKind::Texture2D,
            layout: params.into(),
            usage: params.usage,
            shader_resource: params.allow_shader_resource,
            unordered_access: params.allow_unordered_access,
        };
        create_texture(self.owner(), spec, data).map(Texture2D::wrap)
    }

    pub fn create_texture_3d(&self, params: &TextureParams3D, data: Option<&[u8]>) -> Result<Texture3D> {
        let spec = TextureSpec {
            kind: ResourceKind::Texture3D,
            layout: params.into(),
            usage: params.usage,
            shader_resource: params.allow_shader_resource,
            unordered_access: params.allow_unordered_access,
        };
        create_texture(self.owner(), spec, data).map(Texture3D::wrap)
    }

    /// A 2D texture with a render-target view, unless `params.usage` is staging.
    pub fn create_render_target(&self, params: &TextureParams2D) -> Result<RenderTarget> {
        let spec = TextureSpec {
            kind: ResourceKind::RenderTarget,
            layout: params.into(),
            usage: params.usage,
            shader_resource: params.allow_shader_resource,
            unordered_access: params.allow_unordered_access,
        };
        create_texture(self.owner(), spec, None).map(RenderTarget::wrap)
    }

    /// A depth buffer of `params.width` x `params.height`. The format, usage
    /// and mip count in `params` are ignored; `enable_stencil` selects a
    /// 24-bit depth + 8-bit stencil layout over 32-bit float depth.
    pub fn create_depth_buffer(&self, params: &TextureParams2D, enable_stencil: bool) -> Result<DepthBuffer> {
        create_depth(self.owner(), params, enable_stencil).map(DepthBuffer::wrap)
    }

    /// Uploads a surface as a BGRA8 texture of the surface's padded size.
    /// Size and format in `params` are overridden.
    pub fn create_texture_2d_from_surface(&self, surface: &Surface2D, params: &TextureParams2D) -> Result<Texture2D> {
        let params = TextureParams2D {
            width: surface.padded_width(),
            height: surface.padded_height(),
            format: Format::BGRA8_UNORM,
            ..*params
        };
        if params.mip_levels != 1 {
            return Err(AnvilError::InvalidUsage(
                "surface uploads only fill the top mip level".into(),
            ));
        }
        self.create_texture_2d(&params, Some(surface.as_bytes()))
    }

    /// Decodes a PNG file into a surface and uploads it.
    pub fn load_texture_2d(&self, path: impl AsRef<Path>, padding: PadMode) -> Result<Texture2D> {
        let surface = Surface2D::load_png(path, padding)?;
        self.create_texture_2d_from_surface(&surface, &TextureParams2D::default())
    }
}
