//! Error Types
//!
//! This module defines the error type shared by every Anvil crate.
//!
//! # Overview
//!
//! [`AnvilError`] covers every contract violation the facade can detect:
//! - Native object creation rejected by the device
//! - Usage policy violations (immutable writes, offsets on static updates)
//! - Slot-table overflow and ambiguous bindings
//! - Objects crossing instance or context-role boundaries
//! - Map/unmap pairing violations
//! - Shader compilation diagnostics
//!
//! Under correct API usage none of these are ever produced. They are returned
//! as values instead of aborting the process so callers and tests can observe
//! the exact failure.
//!
//! # Usage
//!
//! ```rust,ignore
//! use anvil_core::errors::{AnvilError, Result};
//!
//! fn upload() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for Anvil.
#[derive(Error, Debug)]
pub enum AnvilError {
    // ========================================================================
    // Device Errors
    // ========================================================================
    /// The device rejected a create call (out of memory or an invalid flag combination).
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// A format descriptor has no concrete pixel format.
    #[error("Unsupported format: {kind} x{channels}")]
    UnsupportedFormat {
        /// Name of the element kind
        kind: &'static str,
        /// Requested channel count
        channels: u32,
    },

    // ========================================================================
    // Usage Policy Errors
    // ========================================================================
    /// A usage or capability combination violates a static rule.
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// A non-zero byte offset was requested for a static resource update.
    #[error("Static resources must be updated whole; got byte offset {offset}")]
    InvalidOffset {
        /// The rejected byte offset
        offset: usize,
    },

    /// An update was attempted on an immutable resource.
    #[error("Immutable resources cannot be written after creation")]
    ImmutableWrite,

    /// A null resource was passed where a resource is required.
    #[error("Null resource passed to {0}")]
    NullResource(&'static str),

    /// The update range falls outside the backing store.
    #[error("Update of {len} bytes at offset {offset} exceeds resource size {size}")]
    UpdateOutOfBounds {
        /// Byte offset of the write
        offset: usize,
        /// Length of the write
        len: usize,
        /// Size of the backing store
        size: usize,
    },

    // ========================================================================
    // Binding Errors
    // ========================================================================
    /// A slot range exceeds a fixed hardware slot count.
    #[error("Slot overflow in {table} table: start {start} + count {count} exceeds {max}")]
    SlotOverflow {
        /// Which slot table was targeted
        table: &'static str,
        /// First slot of the range
        start: u32,
        /// Number of slots in the range
        count: u32,
        /// Number of slots available
        max: u32,
    },

    /// A null resource was bound without an explicit slot and stage mask.
    #[error("Ambiguous bind in {0}: a slot and a non-empty stage mask are required")]
    AmbiguousBind(&'static str),

    /// An object belongs to a different instance than the context it was passed to.
    #[error("Cross-instance use in {0}: object belongs to another instance")]
    CrossInstance(&'static str),

    /// An operation requires a different context role.
    #[error("Context role violation: {0}")]
    ContextRole(&'static str),

    // ========================================================================
    // Map Errors
    // ========================================================================
    /// The resource is already mapped.
    #[error("Resource is already mapped")]
    DoubleMap,

    /// The resource was unmapped without being mapped.
    #[error("Resource is not mapped")]
    UnmapWithoutMap,

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// The shader compiler reported an error.
    #[error("Shader compilation failed for {source_name}:\n{diagnostics}")]
    ShaderCompile {
        /// File path or a label for inline source text
        source_name: String,
        /// Full compiler output
        diagnostics: String,
    },

    // ========================================================================
    // I/O & Image Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecode(String),
}

impl From<image::ImageError> for AnvilError {
    fn from(err: image::ImageError) -> Self {
        AnvilError::ImageDecode(err.to_string())
    }
}

/// Alias for `Result<T, AnvilError>`.
pub type Result<T> = std::result::Result<T, AnvilError>;
