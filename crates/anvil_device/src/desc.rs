//! Creation descriptors for native objects.

use anvil_core::{BlendStateDesc, CpuAccess, DepthStencilDesc, PixelFormat, RasterizerDesc, SamplerDesc, Usage};
use bitflags::bitflags;

bitflags! {
    /// Pipeline bind points a resource may be attached to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindFlags: u32 {
        const VERTEX_BUFFER    = 1 << 0;
        const INDEX_BUFFER     = 1 << 1;
        const CONSTANT_BUFFER  = 1 << 2;
        const SHADER_RESOURCE  = 1 << 3;
        const UNORDERED_ACCESS = 1 << 4;
        const RENDER_TARGET    = 1 << 5;
        const DEPTH_STENCIL    = 1 << 6;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceMisc: u32 {
        const BUFFER_STRUCTURED      = 1 << 0;
        const BUFFER_ALLOW_RAW_VIEWS = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferDesc {
    pub byte_width: u32,
    pub usage: Usage,
    pub bind: BindFlags,
    pub cpu_access: CpuAccess,
    pub misc: ResourceMisc,
    /// Element size of a structured buffer.
    pub structure_stride: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D1,
    D2,
    D3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub dimension: TextureDimension,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub format: PixelFormat,
    pub sample_count: u32,
    pub sample_quality: u32,
    pub usage: Usage,
    pub bind: BindFlags,
    pub cpu_access: CpuAccess,
}

impl TextureDesc {
    /// Bytes in one row of the top mip.
    #[inline]
    #[must_use]
    pub fn row_pitch(&self) -> usize {
        self.width as usize * self.format.bytes_per_texel() as usize
    }

    /// Bytes in one depth slice of the top mip.
    #[inline]
    #[must_use]
    pub fn depth_pitch(&self) -> usize {
        self.row_pitch() * self.height as usize
    }

    /// Size of the backing store (top mip, tightly packed).
    #[inline]
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.depth_pitch() * self.depth as usize
    }
}

/// Either kind of resource descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDesc {
    Buffer(BufferDesc),
    Texture(TextureDesc),
}

impl ResourceDesc {
    #[must_use]
    pub fn usage(&self) -> Usage {
        match self {
            Self::Buffer(desc) => desc.usage,
            Self::Texture(desc) => desc.usage,
        }
    }

    #[must_use]
    pub fn bind(&self) -> BindFlags {
        match self {
            Self::Buffer(desc) => desc.bind,
            Self::Texture(desc) => desc.bind,
        }
    }

    #[must_use]
    pub fn cpu_access(&self) -> CpuAccess {
        match self {
            Self::Buffer(desc) => desc.cpu_access,
            Self::Texture(desc) => desc.cpu_access,
        }
    }

    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Buffer(desc) => desc.byte_width as usize,
            Self::Texture(desc) => desc.byte_size(),
        }
    }

    /// `(row_pitch, depth_pitch)` of the mapped top subresource.
    #[must_use]
    pub fn pitches(&self) -> (usize, usize) {
        match self {
            Self::Buffer(desc) => (desc.byte_width as usize, desc.byte_width as usize),
            Self::Texture(desc) => (desc.row_pitch(), desc.depth_pitch()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    ShaderResource,
    UnorderedAccess,
    RenderTarget,
    DepthStencil,
}

impl ViewKind {
    /// Bind flag a resource needs before a view of this kind can be created.
    #[must_use]
    pub const fn required_bind(self) -> BindFlags {
        match self {
            Self::ShaderResource => BindFlags::SHADER_RESOURCE,
            Self::UnorderedAccess => BindFlags::UNORDERED_ACCESS,
            Self::RenderTarget => BindFlags::RENDER_TARGET,
            Self::DepthStencil => BindFlags::DEPTH_STENCIL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewDesc {
    pub kind: ViewKind,
    /// `Unknown` for structured buffer views.
    pub format: PixelFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputClassification {
    PerVertex,
    PerInstance,
}

/// One resolved input-assembler element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputElementDesc {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: PixelFormat,
    pub input_slot: u32,
    pub aligned_byte_offset: u32,
    pub classification: InputClassification,
    pub instance_step_rate: u32,
}

/// Descriptor of an immutable state object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateDesc {
    Sampler(SamplerDesc),
    Rasterizer(RasterizerDesc),
    Blend(BlendStateDesc),
    DepthStencil(DepthStencilDesc),
}
