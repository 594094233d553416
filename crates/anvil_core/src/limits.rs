//! Fixed hardware slot counts of the reference feature level.

/// Constant-buffer slots per stage.
pub const CONSTANT_BUFFER_SLOTS: u32 = 15;
/// Shader-resource slots per stage.
pub const SHADER_RESOURCE_SLOTS: u32 = 128;
/// Sampler slots per stage.
pub const SAMPLER_SLOTS: u32 = 16;
/// Simultaneous render targets.
pub const RENDER_TARGET_SLOTS: u32 = 8;
/// Unordered-access slots for the compute stage and the output merger.
pub const UAV_SLOTS: u32 = 8;
/// Input-assembler vertex buffer slots.
pub const VERTEX_BUFFER_SLOTS: u32 = 32;

/// Largest constant buffer in bytes.
pub const MAX_CONSTANT_BUFFER_BYTES: u32 = 65536;
/// Largest 1D/2D texture extent.
pub const MAX_TEXTURE_DIMENSION_2D: u32 = 16384;
/// Largest 3D texture extent.
pub const MAX_TEXTURE_DIMENSION_3D: u32 = 2048;
