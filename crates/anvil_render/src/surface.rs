//! CPU-side 2D pixel storage.
//!
//! A [`Surface2D`] holds BGRA8 texels ready to upload as a texture. A padded
//! surface keeps a one-texel border on every side, and every write near an
//! edge also writes the border texels that mirror it:
//!
//! - [`PadMode::Repeat`]: the border holds the opposite edge, so bilinear
//!   sampling at the edge blends as if the image tiled
//! - [`PadMode::Clamp`]: the border repeats the nearest edge texel
//!
//! All accessors except [`Surface2D::padded_pixel`] use content coordinates.

use std::path::Path;

use anvil_core::{AnvilError, Color8, Result};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PadMode {
    #[default]
    None,
    Clamp,
    Repeat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface2D {
    pixels: Vec<Color8>,
    /// Padded extents.
    width: u32,
    height: u32,
    pad: PadMode,
    has_transparency: bool,
}

impl Surface2D {
    /// A transparent surface with `width` x `height` content texels.
    #[must_use]
    pub fn new(width: u32, height: u32, pad: PadMode) -> Self {
        let border = if pad == PadMode::None { 0 } else { 2 };
        let (width, height) = (width + border, height + border);
        Self {
            pixels: vec![Color8::TRANSPARENT; width as usize * height as usize],
            width,
            height,
            pad,
            has_transparency: false,
        }
    }

    /// Copies a decoded RGBA image.
    #[must_use]
    pub fn from_rgba8(image: &image::RgbaImage, pad: PadMode) -> Self {
        let mut surface = Self::new(image.width(), image.height(), pad);
        for (x, y, px) in image.enumerate_pixels() {
            surface.write(x, y, Color8::from(*px));
        }
        surface
    }

    /// Decodes a PNG file.
    pub fn load_png(path: impl AsRef<Path>, pad: PadMode) -> Result<Self> {
        let path = path.as_ref();
        let image = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?
            .to_rgba8();
        log::debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
        Ok(Self::from_rgba8(&image, pad))
    }

    #[inline]
    #[must_use]
    pub fn padded_width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn padded_height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn content_width(&self) -> u32 {
        self.width - self.border()
    }

    #[inline]
    #[must_use]
    pub fn content_height(&self) -> u32 {
        self.height - self.border()
    }

    #[inline]
    #[must_use]
    pub fn pad_mode(&self) -> PadMode {
        self.pad
    }

    #[inline]
    #[must_use]
    pub fn is_padded(&self) -> bool {
        self.pad != PadMode::None
    }

    /// Whether any written texel has alpha below 255.
    #[inline]
    #[must_use]
    pub fn has_transparency(&self) -> bool {
        self.has_transparency
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color8> {
        if x >= self.content_width() || y >= self.content_height() {
            return None;
        }
        let offset = self.border() / 2;
        self.padded_pixel(x + offset, y + offset)
    }

    /// Texel in padded coordinates, border included.
    #[must_use]
    pub fn padded_pixel(&self, x: u32, y: u32) -> Option<Color8> {
        (x < self.width && y < self.height).then(|| self.pixels[self.index(x, y)])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color8) -> Result<()> {
        if x >= self.content_width() || y >= self.content_height() {
            return Err(AnvilError::InvalidUsage(format!(
                "pixel ({x}, {y}) outside a {}x{} surface",
                self.content_width(),
                self.content_height()
            )));
        }
        self.write(x, y, color);
        Ok(())
    }

    /// Texels in row-major order, padded extents.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[Color8] {
        &self.pixels
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    fn border(&self) -> u32 {
        if self.is_padded() { 2 } else { 0 }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Border column/row mirroring padded coordinate `p` on an axis of `len`.
    fn mirrors(&self, p: u32, len: u32) -> SmallVec<[u32; 2]> {
        let mut out = SmallVec::new();
        let (near, far) = match self.pad {
            PadMode::None => return out,
            PadMode::Repeat => (len - 1, 0),
            PadMode::Clamp => (0, len - 1),
        };
        if p == 1 {
            out.push(near);
        }
        if p == len - 2 {
            out.push(far);
        }
        out
    }

    /// `(x, y)` must be inside the content area.
    fn write(&mut self, x: u32, y: u32, color: Color8) {
        if !color.is_opaque() {
            self.has_transparency = true;
        }
        let offset = self.border() / 2;
        let (px, py) = (x + offset, y + offset);
        let index = self.index(px, py);
        self.pixels[index] = color;

        let xs = self.mirrors(px, self.width);
        let ys = self.mirrors(py, self.height);
        for &bx in &xs {
            let index = self.index(bx, py);
            self.pixels[index] = color;
        }
        for &by in &ys {
            let index = self.index(px, by);
            self.pixels[index] = color;
            for &bx in &xs {
                let index = self.index(bx, by);
                self.pixels[index] = color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color8 = Color8::rgba(255, 0, 0, 255);

    #[test]
    fn unpadded_surface_has_content_size() {
        let surface = Surface2D::new(4, 3, PadMode::None);
        assert_eq!((surface.padded_width(), surface.padded_height()), (4, 3));
        assert_eq!(surface.as_bytes().len(), 4 * 3 * 4);
    }

    #[test]
    fn repeat_wraps_to_the_opposite_border() {
        let mut surface = Surface2D::new(4, 4, PadMode::Repeat);
        surface.set_pixel(0, 0, RED).unwrap();

        assert_eq!(surface.pixel(0, 0), Some(RED));
        assert_eq!(surface.padded_pixel(5, 1), Some(RED));
        assert_eq!(surface.padded_pixel(1, 5), Some(RED));
        assert_eq!(surface.padded_pixel(5, 5), Some(RED));
        assert_eq!(surface.padded_pixel(0, 1), Some(Color8::TRANSPARENT));
    }

    #[test]
    fn clamp_copies_to_the_adjacent_border() {
        let mut surface = Surface2D::new(4, 4, PadMode::Clamp);
        surface.set_pixel(3, 3, RED).unwrap();

        assert_eq!(surface.padded_pixel(5, 4), Some(RED));
        assert_eq!(surface.padded_pixel(4, 5), Some(RED));
        assert_eq!(surface.padded_pixel(5, 5), Some(RED));
        assert_eq!(surface.padded_pixel(0, 0), Some(Color8::TRANSPARENT));
    }

    #[test]
    fn interior_writes_leave_the_border_alone() {
        let mut surface = Surface2D::new(4, 4, PadMode::Repeat);
        surface.set_pixel(1, 1, RED).unwrap();
        let red = surface.pixels().iter().filter(|&&c| c == RED).count();
        assert_eq!(red, 1);
    }

    #[test]
    fn out_of_range_writes_fail() {
        let mut surface = Surface2D::new(2, 2, PadMode::Clamp);
        assert!(surface.set_pixel(2, 0, RED).is_err());
        assert_eq!(surface.pixel(2, 0), None);
    }

    #[test]
    fn translucent_pixels_are_tracked() {
        let mut surface = Surface2D::new(1, 1, PadMode::None);
        assert!(!surface.has_transparency());
        surface.set_pixel(0, 0, Color8::rgba(0, 0, 0, 128)).unwrap();
        assert!(surface.has_transparency());
    }
}
