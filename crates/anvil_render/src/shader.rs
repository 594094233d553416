//! Shaders and Shader Programs
//!
//! # Overview
//!
//! A [`Shader`] is one compiled stage. Its source is one of:
//! - precompiled bytecode
//! - a source file plus entry point, compiled on load
//! - source text plus entry point, compiled on load
//!
//! Compilation goes through the instance's [`ShaderCompiler`]; any
//! diagnostic containing an error fails with [`AnvilError::ShaderCompile`]
//! carrying the full compiler output. Warnings are logged.
//!
//! A [`ShaderProgram`] bundles the graphics stages. Vertex and pixel stages
//! are mandatory, hull and domain come together or not at all, geometry is
//! optional. Compute shaders are never part of a program.
//!
//! [`ShaderCompiler`]: anvil_device::ShaderCompiler

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anvil_core::{AnvilError, Result, ShaderStage, ShaderStages};
use anvil_device::ShaderKey;

use crate::input_layout::{InputLayout, InputLayoutDesc};
use crate::instance::Instance;
use crate::owner::{DeviceRef, InstanceId, next_object_id};

const INLINE_SOURCE_NAME: &str = "<inline>";

/// Where a shader stage comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ShaderSource {
    #[default]
    NotPresent,
    Precompiled(Vec<u8>),
    File { path: PathBuf, entry_point: String },
    Text { text: String, entry_point: String },
}

impl ShaderSource {
    #[must_use]
    pub fn file(path: impl Into<PathBuf>, entry_point: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            entry_point: entry_point.into(),
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            entry_point: entry_point.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::NotPresent)
    }
}

// ============================================================================
// Shader
// ============================================================================

struct ShaderInner {
    id: u64,
    owner: DeviceRef,
    stage: ShaderStage,
    key: ShaderKey,
    bytecode: Vec<u8>,
    input_layout: Option<InputLayout>,
}

impl Drop for ShaderInner {
    fn drop(&mut self) {
        self.owner.device.release_shader(self.key);
        log::debug!("Released {:?} shader #{}", self.stage, self.id);
    }
}

/// A compiled shader for one stage.
#[derive(Clone)]
pub struct Shader(Arc<ShaderInner>);

impl Shader {
    fn create(owner: &DeviceRef, stage: ShaderStage, bytecode: Vec<u8>, input_layout: Option<InputLayout>) -> Result<Self> {
        let key = owner.device.create_shader(stage, &bytecode)?;
        let shader = Self(Arc::new(ShaderInner {
            id: next_object_id(),
            owner: owner.clone(),
            stage,
            key,
            bytecode,
            input_layout,
        }));
        log::debug!("Created {:?} shader #{}", stage, shader.id());
        Ok(shader)
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.0.stage
    }

    #[inline]
    #[must_use]
    pub fn bytecode(&self) -> &[u8] {
        &self.0.bytecode
    }

    /// Input layout bound with this shader. Only vertex shaders carry one.
    #[inline]
    #[must_use]
    pub fn input_layout(&self) -> Option<&InputLayout> {
        self.0.input_layout.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn instance(&self) -> InstanceId {
        self.0.owner.instance
    }

    /// Native key, for inspecting bound pipeline state.
    #[must_use]
    pub fn key(&self) -> ShaderKey {
        self.0.key
    }

    pub(crate) fn owner(&self) -> &DeviceRef {
        &self.0.owner
    }
}

impl PartialEq for Shader {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Shader {}

impl Hash for Shader {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.0.id)
            .field("stage", &self.0.stage)
            .field("input_layout", &self.0.input_layout.is_some())
            .finish()
    }
}

macro_rules! typed_shader {
    ($name:ident, $stage:ident) => {
        #[derive(Clone, PartialEq, Eq, Hash, Debug)]
        pub struct $name(Shader);

        impl $name {
            #[inline]
            #[must_use]
            pub fn shader(&self) -> &Shader {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = Shader;

            fn deref(&self) -> &Shader {
                &self.0
            }
        }

        impl From<$name> for Shader {
            fn from(shader: $name) -> Shader {
                shader.0
            }
        }

        impl TryFrom<Shader> for $name {
            type Error = AnvilError;

            fn try_from(shader: Shader) -> Result<Self> {
                if shader.stage() == ShaderStage::$stage {
                    Ok(Self(shader))
                } else {
                    Err(AnvilError::InvalidUsage(format!(
                        "{:?} shader is not a {}",
                        shader.stage(),
                        stringify!($name)
                    )))
                }
            }
        }
    };
}

typed_shader!(VertexShader, Vertex);
typed_shader!(PixelShader, Pixel);
typed_shader!(HullShader, Hull);
typed_shader!(DomainShader, Domain);
typed_shader!(GeometryShader, Geometry);
typed_shader!(ComputeShader, Compute);

// ============================================================================
// Programs
// ============================================================================

/// Sources for every graphics stage of a program.
#[derive(Debug, Clone, Default)]
pub struct ShaderProgramDesc {
    pub input_layout: InputLayoutDesc,
    pub vertex: ShaderSource,
    pub pixel: ShaderSource,
    pub hull: ShaderSource,
    pub domain: ShaderSource,
    pub geometry: ShaderSource,
}

impl ShaderProgramDesc {
    fn validate(&self) -> Result<()> {
        if !self.vertex.is_present() || !self.pixel.is_present() {
            return Err(AnvilError::InvalidUsage(
                "shader programs need both a vertex and a pixel shader".into(),
            ));
        }
        if self.hull.is_present() != self.domain.is_present() {
            return Err(AnvilError::InvalidUsage(
                "hull and domain shaders must be supplied together".into(),
            ));
        }
        Ok(())
    }
}

/// A bundle of graphics stages bound together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    pub vertex: VertexShader,
    pub pixel: PixelShader,
    pub hull: Option<HullShader>,
    pub domain: Option<DomainShader>,
    pub geometry: Option<GeometryShader>,
}

impl ShaderProgram {
    /// Stages this program has shaders for.
    #[must_use]
    pub fn active_stages(&self) -> ShaderStages {
        let mut stages = ShaderStages::VERTEX | ShaderStages::PIXEL;
        if self.hull.is_some() {
            stages |= ShaderStages::HULL | ShaderStages::DOMAIN;
        }
        if self.geometry.is_some() {
            stages |= ShaderStages::GEOMETRY;
        }
        stages
    }
}

// ============================================================================
// Factories
// ============================================================================

impl Instance {
    /// Runs the instance's compiler on `source` for `profile`.
    fn compile(&self, source: &str, source_name: &str, entry_point: &str, profile: &str) -> Result<Vec<u8>> {
        let output = self.shared().compiler.compile(source, source_name, entry_point, profile);
        if output.has_errors() {
            log::error!("Compiling {source_name} ({entry_point}, {profile}) failed");
            return Err(AnvilError::ShaderCompile {
                source_name: source_name.to_owned(),
                diagnostics: output.diagnostics,
            });
        }
        if !output.diagnostics.is_empty() {
            log::warn!("{source_name}: {}", output.diagnostics);
        }
        output.bytecode.ok_or_else(|| AnvilError::ShaderCompile {
            source_name: source_name.to_owned(),
            diagnostics: "compiler produced no bytecode".into(),
        })
    }

    /// Reads and compiles a shader file.
    pub fn compile_shader_from_file(&self, path: impl AsRef<Path>, entry_point: &str, profile: &str) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        self.compile(&source, &path.display().to_string(), entry_point, profile)
    }

    fn bytecode(&self, stage: ShaderStage, source: &ShaderSource) -> Result<Vec<u8>> {
        match source {
            ShaderSource::NotPresent => Err(AnvilError::InvalidUsage(format!(
                "no source given for the {stage:?} shader"
            ))),
            ShaderSource::Precompiled(bytecode) => Ok(bytecode.clone()),
            ShaderSource::File { path, entry_point } => {
                self.compile_shader_from_file(path, entry_point, stage.profile())
            }
            ShaderSource::Text { text, entry_point } => {
                self.compile(text, INLINE_SOURCE_NAME, entry_point, stage.profile())
            }
        }
    }

    pub fn create_shader(&self, stage: ShaderStage, source: &ShaderSource) -> Result<Shader> {
        let bytecode = self.bytecode(stage, source)?;
        Shader::create(self.owner(), stage, bytecode, None)
    }

    /// A vertex shader with an input layout validated against its bytecode.
    /// An empty layout creates no native layout object.
    pub fn create_vertex_shader(&self, source: &ShaderSource, layout: &InputLayoutDesc) -> Result<VertexShader> {
        let bytecode = self.bytecode(ShaderStage::Vertex, source)?;
        let input_layout = if layout.is_empty() {
            None
        } else {
            Some(InputLayout::create(self.owner(), layout, &bytecode)?)
        };
        Shader::create(self.owner(), ShaderStage::Vertex, bytecode, input_layout).map(VertexShader)
    }

    pub fn create_compute_shader(&self, source: &ShaderSource) -> Result<ComputeShader> {
        self.create_shader(ShaderStage::Compute, source).map(ComputeShader)
    }

    /// Builds every stage of `desc`. Missing mandatory stages and a lone
    /// hull or domain stage fail before anything is compiled.
    pub fn create_shader_program(&self, desc: &ShaderProgramDesc) -> Result<ShaderProgram> {
        desc.validate()?;

        let optional = |stage: ShaderStage, source: &ShaderSource| -> Result<Option<Shader>> {
            if source.is_present() {
                self.create_shader(stage, source).map(Some)
            } else {
                Ok(None)
            }
        };

        let program = ShaderProgram {
            vertex: self.create_vertex_shader(&desc.vertex, &desc.input_layout)?,
            pixel: PixelShader(self.create_shader(ShaderStage::Pixel, &desc.pixel)?),
            hull: optional(ShaderStage::Hull, &desc.hull)?.map(HullShader),
            domain: optional(ShaderStage::Domain, &desc.domain)?.map(DomainShader),
            geometry: optional(ShaderStage::Geometry, &desc.geometry)?.map(GeometryShader),
        };
        log::debug!("Created shader program with stages {:?}", program.active_stages());
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc_with(hull: bool, domain: bool) -> ShaderProgramDesc {
        let src = || ShaderSource::text("void main() {}", "main");
        ShaderProgramDesc {
            vertex: src(),
            pixel: src(),
            hull: if hull { src() } else { ShaderSource::NotPresent },
            domain: if domain { src() } else { ShaderSource::NotPresent },
            ..Default::default()
        }
    }

    #[test]
    fn hull_and_domain_travel_together() {
        assert!(desc_with(false, false).validate().is_ok());
        assert!(desc_with(true, true).validate().is_ok());
        assert!(desc_with(true, false).validate().is_err());
        assert!(desc_with(false, true).validate().is_err());
    }

    #[test]
    fn vertex_and_pixel_are_mandatory() {
        let desc = ShaderProgramDesc {
            pixel: ShaderSource::NotPresent,
            ..desc_with(false, false)
        };
        assert!(matches!(desc.validate(), Err(AnvilError::InvalidUsage(_))));
    }
}
