//! Pipeline State Descriptors
//!
//! Plain-data descriptors for the immutable state objects (sampler,
//! rasterizer, blend, depth-stencil) plus the small value types set directly
//! on a context (topology, viewport).
//!
//! `Default` on every descriptor matches the device's documented defaults.
//! Named presets live next to the descriptor they build.

use crate::limits::RENDER_TARGET_SLOTS;

// ============================================================================
// Sampler
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    Point,
    #[default]
    Linear,
    Anisotropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    Wrap,
    Mirror,
    #[default]
    Clamp,
    Border,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComparisonFunc {
    #[default]
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub filter: Filter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub mip_lod_bias: f32,
    pub max_anisotropy: u32,
    pub comparison: ComparisonFunc,
    pub border_color: [f32; 4],
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter: Filter::Linear,
            address_u: AddressMode::Clamp,
            address_v: AddressMode::Clamp,
            address_w: AddressMode::Clamp,
            mip_lod_bias: 0.0,
            max_anisotropy: 1,
            comparison: ComparisonFunc::Never,
            border_color: [1.0; 4],
            min_lod: f32::MIN,
            max_lod: f32::MAX,
        }
    }
}

impl SamplerDesc {
    /// Same address mode on all three axes, unbounded mip range.
    #[must_use]
    pub fn preset(filter: Filter, address: AddressMode) -> Self {
        Self {
            filter,
            address_u: address,
            address_v: address,
            address_w: address,
            min_lod: 0.0,
            max_lod: f32::MAX,
            ..Default::default()
        }
    }
}

// ============================================================================
// Rasterizer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerDesc {
    pub fill: FillMode,
    pub cull: CullMode,
    pub front_counter_clockwise: bool,
    pub depth_bias: i32,
    pub depth_bias_clamp: f32,
    pub slope_scaled_depth_bias: f32,
    pub depth_clip: bool,
    pub scissor: bool,
    pub multisample: bool,
    pub antialiased_lines: bool,
}

impl Default for RasterizerDesc {
    fn default() -> Self {
        Self {
            fill: FillMode::Solid,
            cull: CullMode::Back,
            front_counter_clockwise: false,
            depth_bias: 0,
            depth_bias_clamp: 0.0,
            slope_scaled_depth_bias: 0.0,
            depth_clip: true,
            scissor: false,
            multisample: false,
            antialiased_lines: false,
        }
    }
}

impl RasterizerDesc {
    /// Descriptor behind the fixed cull/fill presets.
    #[must_use]
    pub fn preset(cull: CullMode, fill: FillMode) -> Self {
        Self {
            fill,
            cull,
            depth_bias_clamp: 0.0,
            slope_scaled_depth_bias: 1.0,
            ..Default::default()
        }
    }

    /// Index of a cull/fill pair among the six presets.
    #[must_use]
    pub const fn preset_index(cull: CullMode, fill: FillMode) -> usize {
        let fill_row = match fill {
            FillMode::Solid => 0,
            FillMode::Wireframe => 3,
        };
        let cull_col = match cull {
            CullMode::None => 0,
            CullMode::Front => 1,
            CullMode::Back => 2,
        };
        fill_row + cull_col
    }
}

// ============================================================================
// Blend
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
    SrcAlphaSat,
    BlendFactor,
    InvBlendFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

/// Blend description for one render-target slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetBlendDesc {
    pub enable: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub op_alpha: BlendOp,
    /// RGBA write mask, one bit per channel.
    pub write_mask: u8,
}

impl Default for RenderTargetBlendDesc {
    fn default() -> Self {
        Self {
            enable: false,
            src: BlendFactor::One,
            dst: BlendFactor::Zero,
            op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            op_alpha: BlendOp::Add,
            write_mask: 0xF,
        }
    }
}

impl RenderTargetBlendDesc {
    /// Classic `src * a + dst * (1 - a)` blending.
    #[must_use]
    pub fn alpha_blending() -> Self {
        Self {
            enable: true,
            src: BlendFactor::SrcAlpha,
            dst: BlendFactor::InvSrcAlpha,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::InvSrcAlpha,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn additive() -> Self {
        Self {
            enable: true,
            src: BlendFactor::One,
            dst: BlendFactor::One,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::One,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendStateDesc {
    pub alpha_to_coverage: bool,
    pub independent_blend: bool,
    pub targets: [RenderTargetBlendDesc; RENDER_TARGET_SLOTS as usize],
}

// ============================================================================
// Depth / Stencil
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthWriteMask {
    Zero,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrSat,
    DecrSat,
    Invert,
    Incr,
    Decr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceDesc {
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
    pub func: ComparisonFunc,
}

impl Default for StencilFaceDesc {
    fn default() -> Self {
        Self {
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
            func: ComparisonFunc::Always,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilDesc {
    pub depth_enable: bool,
    pub depth_write: DepthWriteMask,
    pub depth_func: ComparisonFunc,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front_face: StencilFaceDesc,
    pub back_face: StencilFaceDesc,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_enable: true,
            depth_write: DepthWriteMask::All,
            depth_func: ComparisonFunc::Less,
            stencil_enable: false,
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
            front_face: StencilFaceDesc::default(),
            back_face: StencilFaceDesc::default(),
        }
    }
}

/// Named depth-buffer behaviours backed by precomputed state objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthState {
    ReadWrite,
    ReadOnly,
    WriteOnly,
    Disabled,
}

impl DepthState {
    pub const ALL: [DepthState; 4] = [Self::ReadWrite, Self::ReadOnly, Self::WriteOnly, Self::Disabled];

    #[must_use]
    pub fn desc(self) -> DepthStencilDesc {
        let (depth_enable, depth_write, depth_func) = match self {
            Self::Disabled => (false, DepthWriteMask::Zero, ComparisonFunc::Never),
            Self::ReadOnly => (true, DepthWriteMask::Zero, ComparisonFunc::LessEqual),
            Self::ReadWrite => (true, DepthWriteMask::All, ComparisonFunc::LessEqual),
            Self::WriteOnly => (false, DepthWriteMask::All, ComparisonFunc::LessEqual),
        };
        DepthStencilDesc {
            depth_enable,
            depth_write,
            depth_func,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

// ============================================================================
// Input Assembler / Viewport
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    #[default]
    Undefined,
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    /// Patch list with 1 to 32 control points.
    PatchList(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-surface viewport over the standard depth range.
    #[must_use]
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_preset_indices_are_unique() {
        let mut seen = [false; 6];
        for fill in [FillMode::Solid, FillMode::Wireframe] {
            for cull in [CullMode::None, CullMode::Front, CullMode::Back] {
                let index = RasterizerDesc::preset_index(cull, fill);
                assert!(!seen[index]);
                seen[index] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn depth_presets() {
        let disabled = DepthState::Disabled.desc();
        assert!(!disabled.depth_enable);
        assert_eq!(disabled.depth_write, DepthWriteMask::Zero);
        assert_eq!(disabled.depth_func, ComparisonFunc::Never);

        let write_only = DepthState::WriteOnly.desc();
        assert!(!write_only.depth_enable);
        assert_eq!(write_only.depth_write, DepthWriteMask::All);

        let read_only = DepthState::ReadOnly.desc();
        assert!(read_only.depth_enable);
        assert_eq!(read_only.depth_write, DepthWriteMask::Zero);
        assert_eq!(read_only.depth_func, ComparisonFunc::LessEqual);
    }

    #[test]
    fn sampler_preset_uses_one_address_mode() {
        let desc = SamplerDesc::preset(Filter::Point, AddressMode::Mirror);
        assert_eq!(desc.address_u, AddressMode::Mirror);
        assert_eq!(desc.address_v, AddressMode::Mirror);
        assert_eq!(desc.address_w, AddressMode::Mirror);
        assert_eq!(desc.comparison, ComparisonFunc::Never);
        assert_eq!(desc.max_lod, f32::MAX);
    }
}
