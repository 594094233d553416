//! Encoding of clear values into texel bytes.

use anvil_core::PixelFormat;
use half::f16;

#[derive(Debug, Clone, Copy)]
enum Channel {
    Unorm8,
    Snorm8,
    Uint8,
    Sint8,
    Unorm16,
    Snorm16,
    Uint16,
    Sint16,
    Float16,
    Float32,
    Uint32,
    Sint32,
}

fn channels_of(format: PixelFormat) -> Option<(Channel, usize)> {
    use PixelFormat as P;
    let encoding = match format {
        P::R8Unorm => (Channel::Unorm8, 1),
        P::Rg8Unorm => (Channel::Unorm8, 2),
        P::Rgba8Unorm => (Channel::Unorm8, 4),
        P::R8Snorm => (Channel::Snorm8, 1),
        P::Rg8Snorm => (Channel::Snorm8, 2),
        P::Rgba8Snorm => (Channel::Snorm8, 4),
        P::R8Uint => (Channel::Uint8, 1),
        P::Rg8Uint => (Channel::Uint8, 2),
        P::Rgba8Uint => (Channel::Uint8, 4),
        P::R8Sint => (Channel::Sint8, 1),
        P::Rg8Sint => (Channel::Sint8, 2),
        P::Rgba8Sint => (Channel::Sint8, 4),
        P::R16Unorm => (Channel::Unorm16, 1),
        P::Rg16Unorm => (Channel::Unorm16, 2),
        P::Rgba16Unorm => (Channel::Unorm16, 4),
        P::R16Snorm => (Channel::Snorm16, 1),
        P::Rg16Snorm => (Channel::Snorm16, 2),
        P::Rgba16Snorm => (Channel::Snorm16, 4),
        P::R16Uint => (Channel::Uint16, 1),
        P::Rg16Uint => (Channel::Uint16, 2),
        P::Rgba16Uint => (Channel::Uint16, 4),
        P::R16Sint => (Channel::Sint16, 1),
        P::Rg16Sint => (Channel::Sint16, 2),
        P::Rgba16Sint => (Channel::Sint16, 4),
        P::R16Float => (Channel::Float16, 1),
        P::Rg16Float => (Channel::Float16, 2),
        P::Rgba16Float => (Channel::Float16, 4),
        P::R32Float => (Channel::Float32, 1),
        P::Rg32Float => (Channel::Float32, 2),
        P::Rgb32Float => (Channel::Float32, 3),
        P::Rgba32Float => (Channel::Float32, 4),
        P::R32Uint => (Channel::Uint32, 1),
        P::Rg32Uint => (Channel::Uint32, 2),
        P::Rgb32Uint => (Channel::Uint32, 3),
        P::Rgba32Uint => (Channel::Uint32, 4),
        P::R32Sint => (Channel::Sint32, 1),
        P::Rg32Sint => (Channel::Sint32, 2),
        P::Rgb32Sint => (Channel::Sint32, 3),
        P::Rgba32Sint => (Channel::Sint32, 4),
        _ => return None,
    };
    Some(encoding)
}

fn unorm(value: f32, max: f32) -> f32 {
    (value.clamp(0.0, 1.0) * max).round()
}

fn snorm(value: f32, max: f32) -> f32 {
    (value.clamp(-1.0, 1.0) * max).round()
}

fn push_channel(out: &mut Vec<u8>, channel: Channel, value: f32) {
    match channel {
        Channel::Unorm8 => out.push(unorm(value, 255.0) as u8),
        Channel::Snorm8 => out.push((snorm(value, 127.0) as i8).to_le_bytes()[0]),
        Channel::Uint8 => out.push(value as u8),
        Channel::Sint8 => out.push((value as i8).to_le_bytes()[0]),
        Channel::Unorm16 => out.extend_from_slice(&(unorm(value, 65535.0) as u16).to_le_bytes()),
        Channel::Snorm16 => out.extend_from_slice(&(snorm(value, 32767.0) as i16).to_le_bytes()),
        Channel::Uint16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
        Channel::Sint16 => out.extend_from_slice(&(value as i16).to_le_bytes()),
        Channel::Float16 => out.extend_from_slice(&f16::from_f32(value).to_le_bytes()),
        Channel::Float32 => out.extend_from_slice(&value.to_le_bytes()),
        Channel::Uint32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
        Channel::Sint32 => out.extend_from_slice(&(value as i32).to_le_bytes()),
    }
}

/// Truncates a half float to an unsigned float with `mantissa_bits` of mantissa.
/// Negative values clamp to zero.
fn small_float(value: f32, mantissa_bits: u32) -> u32 {
    let bits = f16::from_f32(value.max(0.0)).to_bits();
    u32::from(bits & 0x7FFF) >> (10 - mantissa_bits)
}

/// Encodes an RGBA clear colour as one texel of `format`.
///
/// Returns `None` for formats that cannot be cleared as colour
/// (typeless, depth, unknown).
#[must_use]
pub fn encode_color(format: PixelFormat, rgba: [f32; 4]) -> Option<Vec<u8>> {
    match format {
        PixelFormat::Bgra8Unorm => Some(
            [rgba[2], rgba[1], rgba[0], rgba[3]]
                .iter()
                .map(|c| unorm(*c, 255.0) as u8)
                .collect(),
        ),
        PixelFormat::Rg11B10Float => {
            let packed = small_float(rgba[0], 6) | (small_float(rgba[1], 6) << 11) | (small_float(rgba[2], 5) << 22);
            Some(packed.to_le_bytes().to_vec())
        }
        _ => {
            let (channel, count) = channels_of(format)?;
            let mut out = Vec::with_capacity(format.bytes_per_texel() as usize);
            for value in &rgba[..count] {
                push_channel(&mut out, channel, *value);
            }
            Some(out)
        }
    }
}

/// Depth/stencil texel after a clear, given the previous texel value.
#[must_use]
pub fn encode_depth_stencil(
    format: PixelFormat,
    previous: u32,
    depth: Option<f32>,
    stencil: Option<u8>,
) -> Option<u32> {
    match format {
        PixelFormat::D32Float => Some(depth.map_or(previous, f32::to_bits)),
        PixelFormat::D24UnormS8Uint => {
            let depth_bits = depth.map_or(previous & 0x00FF_FFFF, |d| unorm(d, 16_777_215.0) as u32);
            let stencil_bits = stencil.map_or(previous >> 24, u32::from);
            Some(depth_bits | (stencil_bits << 24))
        }
        _ => None,
    }
}
