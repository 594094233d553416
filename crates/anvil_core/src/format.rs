//! Format Descriptors
//!
//! Maps an abstract `(kind, channel count)` pair onto a concrete
//! [`PixelFormat`] and its byte layout.
//!
//! Most kinds accept one to four channels, but not every count has a
//! concrete layout: three-channel 8-bit and 16-bit formats do not exist, and
//! BGRA only exists with four channels. Packed kinds ([`FormatKind::Float11`])
//! ignore the channel count. [`FormatKind::Mat4x4`] has a size but no pixel
//! format; it is only meaningful inside an input layout, where it expands to
//! four `Float x4` rows.

use crate::errors::{AnvilError, Result};

/// Element kind of a format descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Float,
    HalfFloat,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    SNorm8,
    SNorm16,
    UNorm8,
    UNorm8Bgra,
    UNorm16,
    /// Packed (11, 11, 10) float. Ignores the channel count.
    Float11,
    Typeless8,
    Typeless16,
    Typeless32,
    /// Row-major 4x4 float matrix, input layouts only.
    Mat4x4,
}

impl FormatKind {
    /// Byte size of one channel, or of the whole element for packed kinds.
    #[must_use]
    pub const fn type_size(self) -> u32 {
        match self {
            Self::Int8 | Self::UInt8 | Self::SNorm8 | Self::UNorm8 | Self::Typeless8 => 1,
            Self::HalfFloat | Self::Int16 | Self::UInt16 | Self::SNorm16 | Self::UNorm16 | Self::Typeless16 => 2,
            Self::Float | Self::Int32 | Self::UInt32 | Self::UNorm8Bgra | Self::Float11 | Self::Typeless32 => 4,
            Self::Mat4x4 => std::mem::size_of::<glam::Mat4>() as u32,
        }
    }

    /// Packed kinds describe a whole element regardless of channel count.
    #[must_use]
    pub const fn is_packed(self) -> bool {
        matches!(self, Self::UNorm8Bgra | Self::Float11 | Self::Mat4x4)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float => "Float",
            Self::HalfFloat => "HalfFloat",
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::SNorm8 => "SNorm8",
            Self::SNorm16 => "SNorm16",
            Self::UNorm8 => "UNorm8",
            Self::UNorm8Bgra => "UNorm8Bgra",
            Self::UNorm16 => "UNorm16",
            Self::Float11 => "Float11",
            Self::Typeless8 => "Typeless8",
            Self::Typeless16 => "Typeless16",
            Self::Typeless32 => "Typeless32",
            Self::Mat4x4 => "Mat4x4",
        }
    }

    /// Concrete formats for 1, 2, 3 and 4 channels.
    const fn table(self) -> [Option<PixelFormat>; 4] {
        use PixelFormat as P;
        match self {
            Self::Float => [Some(P::R32Float), Some(P::Rg32Float), Some(P::Rgb32Float), Some(P::Rgba32Float)],
            Self::HalfFloat => [Some(P::R16Float), Some(P::Rg16Float), None, Some(P::Rgba16Float)],
            Self::Int8 => [Some(P::R8Sint), Some(P::Rg8Sint), None, Some(P::Rgba8Sint)],
            Self::UInt8 => [Some(P::R8Uint), Some(P::Rg8Uint), None, Some(P::Rgba8Uint)],
            Self::Int16 => [Some(P::R16Sint), Some(P::Rg16Sint), None, Some(P::Rgba16Sint)],
            Self::UInt16 => [Some(P::R16Uint), Some(P::Rg16Uint), None, Some(P::Rgba16Uint)],
            Self::Int32 => [Some(P::R32Sint), Some(P::Rg32Sint), Some(P::Rgb32Sint), Some(P::Rgba32Sint)],
            Self::UInt32 => [Some(P::R32Uint), Some(P::Rg32Uint), Some(P::Rgb32Uint), Some(P::Rgba32Uint)],
            Self::SNorm8 => [Some(P::R8Snorm), Some(P::Rg8Snorm), None, Some(P::Rgba8Snorm)],
            Self::SNorm16 => [Some(P::R16Snorm), Some(P::Rg16Snorm), None, Some(P::Rgba16Snorm)],
            Self::UNorm8 => [Some(P::R8Unorm), Some(P::Rg8Unorm), None, Some(P::Rgba8Unorm)],
            Self::UNorm8Bgra => [None, None, None, Some(P::Bgra8Unorm)],
            Self::UNorm16 => [Some(P::R16Unorm), Some(P::Rg16Unorm), None, Some(P::Rgba16Unorm)],
            Self::Typeless8 => [Some(P::R8Typeless), Some(P::Rg8Typeless), None, Some(P::Rgba8Typeless)],
            Self::Typeless16 => [Some(P::R16Typeless), Some(P::Rg16Typeless), None, Some(P::Rgba16Typeless)],
            Self::Typeless32 => [
                Some(P::R32Typeless),
                Some(P::Rg32Typeless),
                Some(P::Rgb32Typeless),
                Some(P::Rgba32Typeless),
            ],
            Self::Float11 | Self::Mat4x4 => [None; 4],
        }
    }
}

/// An abstract element format: a kind plus a channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Format {
    pub kind: FormatKind,
    pub channels: u32,
}

impl Format {
    pub const RGBA8_UNORM: Self = Self::new(FormatKind::UNorm8, 4);
    pub const BGRA8_UNORM: Self = Self::new(FormatKind::UNorm8Bgra, 4);
    pub const FLOAT: Self = Self::new(FormatKind::Float, 1);
    pub const FLOAT2: Self = Self::new(FormatKind::Float, 2);
    pub const FLOAT3: Self = Self::new(FormatKind::Float, 3);
    pub const FLOAT4: Self = Self::new(FormatKind::Float, 4);
    pub const MAT4: Self = Self::new(FormatKind::Mat4x4, 1);

    #[must_use]
    pub const fn new(kind: FormatKind, channels: u32) -> Self {
        Self { kind, channels }
    }

    /// Resolves the concrete pixel format.
    pub fn pixel_format(self) -> Result<PixelFormat> {
        if self.kind == FormatKind::Float11 {
            return Ok(PixelFormat::Rg11B10Float);
        }
        let unsupported = AnvilError::UnsupportedFormat {
            kind: self.kind.name(),
            channels: self.channels,
        };
        if !(1..=4).contains(&self.channels) {
            return Err(unsupported);
        }
        self.kind.table()[(self.channels - 1) as usize].ok_or(unsupported)
    }

    /// Per-channel byte size (whole element for packed kinds).
    #[inline]
    #[must_use]
    pub const fn type_size(self) -> u32 {
        self.kind.type_size()
    }

    /// Byte size of one element.
    #[must_use]
    pub const fn element_size(self) -> u32 {
        if self.kind.is_packed() {
            self.kind.type_size()
        } else {
            self.kind.type_size() * self.channels
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Self::RGBA8_UNORM
    }
}

/// Concrete texel / element layouts understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// Structured and untyped buffer views.
    #[default]
    Unknown,

    R32Float,
    Rg32Float,
    Rgb32Float,
    Rgba32Float,
    R16Float,
    Rg16Float,
    Rgba16Float,

    R8Sint,
    Rg8Sint,
    Rgba8Sint,
    R8Uint,
    Rg8Uint,
    Rgba8Uint,
    R16Sint,
    Rg16Sint,
    Rgba16Sint,
    R16Uint,
    Rg16Uint,
    Rgba16Uint,
    R32Sint,
    Rg32Sint,
    Rgb32Sint,
    Rgba32Sint,
    R32Uint,
    Rg32Uint,
    Rgb32Uint,
    Rgba32Uint,

    R8Snorm,
    Rg8Snorm,
    Rgba8Snorm,
    R16Snorm,
    Rg16Snorm,
    Rgba16Snorm,
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Bgra8Unorm,
    R16Unorm,
    Rg16Unorm,
    Rgba16Unorm,

    Rg11B10Float,

    R8Typeless,
    Rg8Typeless,
    Rgba8Typeless,
    R16Typeless,
    Rg16Typeless,
    Rgba16Typeless,
    R32Typeless,
    Rg32Typeless,
    Rgb32Typeless,
    Rgba32Typeless,

    // depth / stencil
    R24G8Typeless,
    D24UnormS8Uint,
    R24UnormX8Typeless,
    D32Float,
}

/// Bit layout shared by a typeless format and its typed views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexelLayout {
    Unknown,
    R8,
    Rg8,
    Rgba8,
    Bgra8,
    R16,
    Rg16,
    Rgba16,
    R32,
    Rg32,
    Rgb32,
    Rgba32,
    Rg11B10,
    R24G8,
}

impl PixelFormat {
    #[must_use]
    pub const fn layout(self) -> TexelLayout {
        use PixelFormat as P;
        match self {
            P::Unknown => TexelLayout::Unknown,
            P::R8Sint | P::R8Uint | P::R8Snorm | P::R8Unorm | P::R8Typeless => TexelLayout::R8,
            P::Rg8Sint | P::Rg8Uint | P::Rg8Snorm | P::Rg8Unorm | P::Rg8Typeless => TexelLayout::Rg8,
            P::Rgba8Sint | P::Rgba8Uint | P::Rgba8Snorm | P::Rgba8Unorm | P::Rgba8Typeless => TexelLayout::Rgba8,
            P::Bgra8Unorm => TexelLayout::Bgra8,
            P::R16Float | P::R16Sint | P::R16Uint | P::R16Snorm | P::R16Unorm | P::R16Typeless => TexelLayout::R16,
            P::Rg16Float | P::Rg16Sint | P::Rg16Uint | P::Rg16Snorm | P::Rg16Unorm | P::Rg16Typeless => {
                TexelLayout::Rg16
            }
            P::Rgba16Float
            | P::Rgba16Sint
            | P::Rgba16Uint
            | P::Rgba16Snorm
            | P::Rgba16Unorm
            | P::Rgba16Typeless => TexelLayout::Rgba16,
            P::R32Float | P::R32Sint | P::R32Uint | P::R32Typeless | P::D32Float => TexelLayout::R32,
            P::Rg32Float | P::Rg32Sint | P::Rg32Uint | P::Rg32Typeless => TexelLayout::Rg32,
            P::Rgb32Float | P::Rgb32Sint | P::Rgb32Uint | P::Rgb32Typeless => TexelLayout::Rgb32,
            P::Rgba32Float | P::Rgba32Sint | P::Rgba32Uint | P::Rgba32Typeless => TexelLayout::Rgba32,
            P::Rg11B10Float => TexelLayout::Rg11B10,
            P::R24G8Typeless | P::D24UnormS8Uint | P::R24UnormX8Typeless => TexelLayout::R24G8,
        }
    }

    /// Bytes per texel (0 for [`PixelFormat::Unknown`]).
    #[must_use]
    pub const fn bytes_per_texel(self) -> u32 {
        match self.layout() {
            TexelLayout::Unknown => 0,
            TexelLayout::R8 => 1,
            TexelLayout::Rg8 | TexelLayout::R16 => 2,
            TexelLayout::Rgba8
            | TexelLayout::Bgra8
            | TexelLayout::Rg16
            | TexelLayout::R32
            | TexelLayout::Rg11B10
            | TexelLayout::R24G8 => 4,
            TexelLayout::Rgba16 | TexelLayout::Rg32 => 8,
            TexelLayout::Rgb32 => 12,
            TexelLayout::Rgba32 => 16,
        }
    }

    #[must_use]
    pub const fn is_typeless(self) -> bool {
        matches!(
            self,
            Self::R8Typeless
                | Self::Rg8Typeless
                | Self::Rgba8Typeless
                | Self::R16Typeless
                | Self::Rg16Typeless
                | Self::Rgba16Typeless
                | Self::R32Typeless
                | Self::Rg32Typeless
                | Self::Rgb32Typeless
                | Self::Rgba32Typeless
                | Self::R24G8Typeless
        )
    }

    #[must_use]
    pub const fn is_depth(self) -> bool {
        matches!(self, Self::D32Float | Self::D24UnormS8Uint)
    }

    #[must_use]
    pub const fn has_stencil(self) -> bool {
        matches!(self, Self::D24UnormS8Uint)
    }

    /// Whether a view of format `view` may be created over a resource of this format.
    #[must_use]
    pub fn accepts_view(self, view: PixelFormat) -> bool {
        if self == view {
            return true;
        }
        self.is_typeless() && !view.is_typeless() && self.layout() == view.layout()
    }

    /// Index element format selected from an index byte width.
    #[must_use]
    pub const fn index_for_width(type_size: u32) -> Self {
        match type_size {
            1 => Self::R8Uint,
            2 => Self::R16Uint,
            _ => Self::R32Uint,
        }
    }
}
