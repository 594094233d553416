//! Input Layouts
//!
//! Describes how vertex and instance buffer bytes feed vertex shader inputs.
//!
//! Per-vertex elements are read from input slot 0 and per-instance elements
//! from slot 1; offsets inside each slot accumulate in declaration order. All
//! per-vertex elements must come before the first per-instance element.
//!
//! ```rust,ignore
//! let layout = InputLayoutDesc::new()
//!     .per_vertex("POSITION", Format::FLOAT3)
//!     .per_vertex("TEXCOORD", Format::FLOAT2)
//!     .per_instance("WORLD", Format::MAT4);
//! ```

use std::fmt;
use std::sync::Arc;

use anvil_core::{AnvilError, Format, FormatKind, PixelFormat, Result};
use anvil_device::{InputClassification, InputElementDesc, LayoutKey};

use crate::owner::{DeviceRef, next_object_id};

const VERTEX_SLOT: u32 = 0;
const INSTANCE_SLOT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputLayoutElement {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: Format,
    pub classification: InputClassification,
}

/// Ordered list of input elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InputLayoutDesc {
    elements: Vec<InputLayoutElement>,
}

impl InputLayoutDesc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn per_vertex(self, name: impl Into<String>, format: Format) -> Self {
        self.per_vertex_indexed(name, 0, format)
    }

    #[must_use]
    pub fn per_vertex_indexed(mut self, name: impl Into<String>, semantic_index: u32, format: Format) -> Self {
        self.push(InputLayoutElement {
            semantic_name: name.into(),
            semantic_index,
            format,
            classification: InputClassification::PerVertex,
        });
        self
    }

    #[must_use]
    pub fn per_instance(self, name: impl Into<String>, format: Format) -> Self {
        self.per_instance_indexed(name, 0, format)
    }

    #[must_use]
    pub fn per_instance_indexed(mut self, name: impl Into<String>, semantic_index: u32, format: Format) -> Self {
        self.push(InputLayoutElement {
            semantic_name: name.into(),
            semantic_index,
            format,
            classification: InputClassification::PerInstance,
        });
        self
    }

    pub fn push(&mut self, element: InputLayoutElement) {
        self.elements.push(element);
    }

    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[InputLayoutElement] {
        &self.elements
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Expands the description into device elements.
    ///
    /// Matrices become four `Float x4` rows with consecutive semantic indices.
    pub fn resolve(&self) -> Result<Vec<InputElementDesc>> {
        let mut resolved = Vec::with_capacity(self.elements.len());
        let mut offsets = [0u32; 2];
        let mut seen_instance = false;

        for element in &self.elements {
            let (slot, step_rate) = match element.classification {
                InputClassification::PerVertex if seen_instance => {
                    return Err(AnvilError::InvalidUsage(format!(
                        "per-vertex element {}{} follows a per-instance element",
                        element.semantic_name, element.semantic_index
                    )));
                }
                InputClassification::PerVertex => (VERTEX_SLOT, 0),
                InputClassification::PerInstance => {
                    seen_instance = true;
                    (INSTANCE_SLOT, 1)
                }
            };
            let offset = &mut offsets[slot as usize];

            let rows = if element.format.kind == FormatKind::Mat4x4 {
                vec![(PixelFormat::Rgba32Float, Format::FLOAT4.element_size()); 4]
            } else {
                vec![(element.format.pixel_format()?, element.format.element_size())]
            };
            for (row, (format, size)) in rows.into_iter().enumerate() {
                resolved.push(InputElementDesc {
                    semantic_name: element.semantic_name.clone(),
                    semantic_index: element.semantic_index + row as u32,
                    format,
                    input_slot: slot,
                    aligned_byte_offset: *offset,
                    classification: element.classification,
                    instance_step_rate: step_rate,
                });
                *offset += size;
            }
        }
        Ok(resolved)
    }
}

struct InputLayoutInner {
    id: u64,
    owner: DeviceRef,
    key: LayoutKey,
    elements: Vec<InputElementDesc>,
}

impl Drop for InputLayoutInner {
    fn drop(&mut self) {
        self.owner.device.release_input_layout(self.key);
    }
}

/// A native input layout, validated against one vertex shader's bytecode.
#[derive(Clone)]
pub struct InputLayout(Arc<InputLayoutInner>);

impl InputLayout {
    pub(crate) fn create(owner: &DeviceRef, desc: &InputLayoutDesc, vertex_bytecode: &[u8]) -> Result<Self> {
        let elements = desc.resolve()?;
        let key = owner.device.create_input_layout(&elements, vertex_bytecode)?;
        Ok(Self(Arc::new(InputLayoutInner {
            id: next_object_id(),
            owner: owner.clone(),
            key,
            elements,
        })))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// The resolved elements, matrices expanded.
    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[InputElementDesc] {
        &self.0.elements
    }

    pub(crate) fn key(&self) -> LayoutKey {
        self.0.key
    }
}

impl PartialEq for InputLayout {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for InputLayout {}

impl fmt::Debug for InputLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputLayout")
            .field("id", &self.0.id)
            .field("elements", &self.0.elements.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_run_per_slot() {
        let elements = InputLayoutDesc::new()
            .per_vertex("POSITION", Format::FLOAT3)
            .per_vertex("TEXCOORD", Format::FLOAT2)
            .per_instance("COLOR", Format::RGBA8_UNORM)
            .per_instance("SCALE", Format::FLOAT)
            .resolve()
            .unwrap();

        let layout: Vec<_> = elements.iter().map(|e| (e.input_slot, e.aligned_byte_offset)).collect();
        assert_eq!(layout, [(0, 0), (0, 12), (1, 0), (1, 4)]);
        assert_eq!(elements[2].instance_step_rate, 1);
        assert_eq!(elements[0].instance_step_rate, 0);
    }

    #[test]
    fn matrix_expands_to_four_rows() {
        let elements = InputLayoutDesc::new()
            .per_vertex("POSITION", Format::FLOAT4)
            .per_instance("WORLD", Format::MAT4)
            .resolve()
            .unwrap();

        assert_eq!(elements.len(), 5);
        for (row, element) in elements[1..].iter().enumerate() {
            assert_eq!(element.semantic_name, "WORLD");
            assert_eq!(element.semantic_index, row as u32);
            assert_eq!(element.format, PixelFormat::Rgba32Float);
            assert_eq!(element.aligned_byte_offset, 16 * row as u32);
        }
    }

    #[test]
    fn vertex_after_instance_is_rejected() {
        let desc = InputLayoutDesc::new()
            .per_instance("WORLD", Format::MAT4)
            .per_vertex("POSITION", Format::FLOAT3);
        assert!(matches!(desc.resolve(), Err(AnvilError::InvalidUsage(_))));
    }

    #[test]
    fn unsupported_formats_surface() {
        let desc = InputLayoutDesc::new().per_vertex("POSITION", Format::new(FormatKind::UNorm8, 3));
        assert!(matches!(desc.resolve(), Err(AnvilError::UnsupportedFormat { .. })));
    }
}
