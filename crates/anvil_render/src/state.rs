//! Pipeline State Objects
//!
//! Immutable sampler, rasterizer, blend and depth-stencil states.
//!
//! # Overview
//!
//! A state object is created once from a full descriptor and never changes.
//! Handles are cheap clones; two handles are equal only when they share the
//! same native object, even if their descriptors match.
//!
//! The six cull/fill rasterizer presets and the four depth presets are built
//! when the [`Instance`] is constructed; [`Instance::rasterizer`] and
//! [`Instance::depth_preset`] hand out clones of those.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use anvil_core::limits::RENDER_TARGET_SLOTS;
use anvil_core::{
    AddressMode, AnvilError, BlendStateDesc, CullMode, DepthState, DepthStencilDesc, FillMode, Filter,
    RasterizerDesc, RenderTargetBlendDesc, Result, SamplerDesc,
};
use anvil_device::StateKey;

use crate::instance::Instance;
use crate::owner::{DeviceRef, InstanceId, next_object_id};

pub(crate) struct StateInner<D> {
    id: u64,
    owner: DeviceRef,
    key: StateKey,
    desc: D,
}

impl<D> Drop for StateInner<D> {
    fn drop(&mut self) {
        self.owner.device.release_state(self.key);
        log::debug!("Released state object #{}", self.id);
    }
}

macro_rules! state_object {
    ($(#[$meta:meta])* $name:ident, $desc:ty) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Arc<StateInner<$desc>>);

        impl $name {
            fn new(owner: &DeviceRef, key: StateKey, desc: $desc) -> Self {
                Self(Arc::new(StateInner {
                    id: next_object_id(),
                    owner: owner.clone(),
                    key,
                    desc,
                }))
            }

            #[inline]
            #[must_use]
            pub fn id(&self) -> u64 {
                self.0.id
            }

            /// The descriptor this object was created from.
            #[inline]
            #[must_use]
            pub fn desc(&self) -> $desc {
                self.0.desc
            }

            #[inline]
            #[must_use]
            pub fn instance(&self) -> InstanceId {
                self.0.owner.instance
            }

            /// Native key, for inspecting bound pipeline state.
            #[must_use]
            pub fn key(&self) -> StateKey {
                self.0.key
            }

            pub(crate) fn owner(&self) -> &DeviceRef {
                &self.0.owner
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0)
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.id.hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("id", &self.0.id)
                    .field("desc", &self.0.desc)
                    .finish()
            }
        }
    };
}

state_object!(
    /// Texture filtering and addressing.
    SamplerState,
    SamplerDesc
);
state_object!(RasterizerState, RasterizerDesc);
state_object!(
    /// Per-render-target blending for all eight output slots.
    BlendState,
    BlendStateDesc
);
state_object!(DepthStencilState, DepthStencilDesc);

pub(crate) fn create_rasterizer(owner: &DeviceRef, desc: RasterizerDesc) -> Result<RasterizerState> {
    let key = owner.device.create_rasterizer_state(&desc)?;
    Ok(RasterizerState::new(owner, key, desc))
}

pub(crate) fn create_depth_stencil(owner: &DeviceRef, desc: DepthStencilDesc) -> Result<DepthStencilState> {
    let key = owner.device.create_depth_stencil_state(&desc)?;
    Ok(DepthStencilState::new(owner, key, desc))
}

/// Fills the first `targets.len()` slots; the rest stay disabled.
fn per_target_desc(targets: &[RenderTargetBlendDesc]) -> Result<BlendStateDesc> {
    if targets.len() > RENDER_TARGET_SLOTS as usize {
        return Err(AnvilError::SlotOverflow {
            table: "blend target",
            start: 0,
            count: targets.len() as u32,
            max: RENDER_TARGET_SLOTS,
        });
    }
    let mut desc = BlendStateDesc {
        independent_blend: true,
        ..Default::default()
    };
    desc.targets[..targets.len()].copy_from_slice(targets);
    Ok(desc)
}

// ============================================================================
// Factories
// ============================================================================

impl Instance {
    pub fn create_sampler(&self, desc: &SamplerDesc) -> Result<SamplerState> {
        let key = self.owner().device.create_sampler_state(desc)?;
        Ok(SamplerState::new(self.owner(), key, *desc))
    }

    /// Every call creates a new sampler object.
    pub fn create_sampler_point_wrap(&self) -> Result<SamplerState> {
        self.create_sampler(&SamplerDesc::preset(Filter::Point, AddressMode::Wrap))
    }

    pub fn create_sampler_point_clamp(&self) -> Result<SamplerState> {
        self.create_sampler(&SamplerDesc::preset(Filter::Point, AddressMode::Clamp))
    }

    pub fn create_sampler_point_mirror(&self) -> Result<SamplerState> {
        self.create_sampler(&SamplerDesc::preset(Filter::Point, AddressMode::Mirror))
    }

    pub fn create_sampler_bilinear_wrap(&self) -> Result<SamplerState> {
        self.create_sampler(&SamplerDesc::preset(Filter::Linear, AddressMode::Wrap))
    }

    pub fn create_sampler_bilinear_clamp(&self) -> Result<SamplerState> {
        self.create_sampler(&SamplerDesc::preset(Filter::Linear, AddressMode::Clamp))
    }

    pub fn create_sampler_bilinear_mirror(&self) -> Result<SamplerState> {
        self.create_sampler(&SamplerDesc::preset(Filter::Linear, AddressMode::Mirror))
    }

    pub fn create_depth_stencil_state(&self, desc: &DepthStencilDesc) -> Result<DepthStencilState> {
        create_depth_stencil(self.owner(), *desc)
    }

    /// The shared depth-stencil object behind a named depth behaviour.
    #[must_use]
    pub fn depth_preset(&self, state: DepthState) -> DepthStencilState {
        self.shared().depth_presets[state.index()].clone()
    }

    /// One blend description replicated across all eight render-target slots.
    pub fn create_blend_state(&self, desc: &RenderTargetBlendDesc) -> Result<BlendState> {
        let desc = BlendStateDesc {
            alpha_to_coverage: false,
            independent_blend: false,
            targets: [*desc; RENDER_TARGET_SLOTS as usize],
        };
        let key = self.owner().device.create_blend_state(&desc)?;
        Ok(BlendState::new(self.owner(), key, desc))
    }

    /// One description per render-target slot, at most eight.
    pub fn create_blend_state_per_target(&self, targets: &[RenderTargetBlendDesc]) -> Result<BlendState> {
        let desc = per_target_desc(targets)?;
        let key = self.owner().device.create_blend_state(&desc)?;
        Ok(BlendState::new(self.owner(), key, desc))
    }

    /// The shared rasterizer preset for a cull/fill pair.
    #[must_use]
    pub fn rasterizer(&self, cull: CullMode, fill: FillMode) -> RasterizerState {
        self.shared().rasterizers[RasterizerDesc::preset_index(cull, fill)].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_blend_targets_stay_disabled() {
        let desc = per_target_desc(&[RenderTargetBlendDesc::alpha_blending(), RenderTargetBlendDesc::additive()])
            .unwrap();
        assert!(desc.independent_blend);
        assert!(desc.targets[0].enable);
        assert!(desc.targets[1].enable);
        assert!(desc.targets[2..].iter().all(|t| *t == RenderTargetBlendDesc::default()));
    }

    #[test]
    fn nine_blend_targets_overflow() {
        let targets = [RenderTargetBlendDesc::additive(); 9];
        assert!(matches!(
            per_target_desc(&targets),
            Err(AnvilError::SlotOverflow { count: 9, max: 8, .. })
        ));
    }
}
