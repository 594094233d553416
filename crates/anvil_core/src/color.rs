//! 8-bit colour in the byte order of `Bgra8Unorm` textures.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

/// One BGRA8 texel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Color8 {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl Color8 {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { b, g, r, a }
    }

    #[inline]
    #[must_use]
    pub fn is_opaque(self) -> bool {
        self.a == u8::MAX
    }

    /// Normalised `(r, g, b, a)`.
    #[must_use]
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(
            f32::from(self.r),
            f32::from(self.g),
            f32::from(self.b),
            f32::from(self.a),
        ) / 255.0
    }

    /// Quantises a normalised `(r, g, b, a)` colour, clamping to `[0, 1]`.
    #[must_use]
    pub fn from_vec4(color: Vec4) -> Self {
        let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
        Self::rgba(c.x as u8, c.y as u8, c.z as u8, c.w as u8)
    }
}

impl From<image::Rgba<u8>> for Color8 {
    fn from(px: image::Rgba<u8>) -> Self {
        let [r, g, b, a] = px.0;
        Self::rgba(r, g, b, a)
    }
}
