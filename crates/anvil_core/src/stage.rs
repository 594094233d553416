//! Shader stages and stage masks.

use bitflags::bitflags;

/// A single programmable stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Hull,
    Domain,
    Geometry,
    Compute,
}

impl ShaderStage {
    pub const COUNT: usize = 6;

    pub const ALL: [ShaderStage; Self::COUNT] = [
        Self::Vertex,
        Self::Pixel,
        Self::Hull,
        Self::Domain,
        Self::Geometry,
        Self::Compute,
    ];

    /// Position of the stage in per-stage tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn mask(self) -> ShaderStages {
        match self {
            Self::Vertex => ShaderStages::VERTEX,
            Self::Pixel => ShaderStages::PIXEL,
            Self::Hull => ShaderStages::HULL,
            Self::Domain => ShaderStages::DOMAIN,
            Self::Geometry => ShaderStages::GEOMETRY,
            Self::Compute => ShaderStages::COMPUTE,
        }
    }

    /// Compiler profile for shader model 5.
    #[must_use]
    pub const fn profile(self) -> &'static str {
        match self {
            Self::Vertex => "vs_5_0",
            Self::Pixel => "ps_5_0",
            Self::Hull => "hs_5_0",
            Self::Domain => "ds_5_0",
            Self::Geometry => "gs_5_0",
            Self::Compute => "cs_5_0",
        }
    }

    /// Inverse of [`ShaderStage::profile`], matched on the two-letter prefix.
    #[must_use]
    pub fn from_profile(profile: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| profile.get(..2) == Some(&stage.profile()[..2]))
    }
}

bitflags! {
    /// A set of shader stages a binding applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX   = 1 << 0;
        const PIXEL    = 1 << 1;
        const HULL     = 1 << 2;
        const DOMAIN   = 1 << 3;
        const GEOMETRY = 1 << 4;
        const COMPUTE  = 1 << 5;

        /// Every graphics pipeline stage.
        const PIPELINE = Self::VERTEX.bits()
            | Self::PIXEL.bits()
            | Self::HULL.bits()
            | Self::DOMAIN.bits()
            | Self::GEOMETRY.bits();
        const ALL = Self::PIPELINE.bits() | Self::COMPUTE.bits();
    }
}

impl ShaderStages {
    /// Individual stages contained in the mask, in table order.
    pub fn stages(self) -> impl Iterator<Item = ShaderStage> {
        ShaderStage::ALL.into_iter().filter(move |stage| self.contains(stage.mask()))
    }
}

impl From<ShaderStage> for ShaderStages {
    fn from(stage: ShaderStage) -> Self {
        stage.mask()
    }
}
