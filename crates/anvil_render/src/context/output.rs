//! Output merger and fixed-function state: render targets, viewport,
//! rasterizer, blend and depth-stencil.

use anvil_core::limits::{RENDER_TARGET_SLOTS, UAV_SLOTS};
use anvil_core::{AnvilError, CullMode, DepthState, FillMode, PrimitiveTopology, RasterizerDesc, Result, Viewport};
use anvil_device::{Command, Slots, ViewKey};
use smallvec::smallvec;

use super::{Context, check_range};
use crate::resource::{DepthBuffer, RenderTarget, Resource};
use crate::state::{BlendState, DepthStencilState};
use crate::window::Window;

const OPAQUE_BLEND_FACTOR: [f32; 4] = [1.0; 4];
const FULL_SAMPLE_MASK: u32 = 0xFFFF_FFFF;

impl Context {
    fn render_target_keys(&self, targets: &[Option<&RenderTarget>], call: &'static str) -> Result<Slots<ViewKey>> {
        check_range("render target", 0, targets.len(), RENDER_TARGET_SLOTS)?;
        targets
            .iter()
            .map(|target| {
                let Some(target) = target else { return Ok(None) };
                self.check_owner(target.owner(), call)?;
                self.retain(target.resource());
                target.views().rtv.map(Some).ok_or_else(|| {
                    AnvilError::InvalidUsage(format!("render target #{} has no render-target view", target.id()))
                })
            })
            .collect()
    }

    fn depth_key(&self, depth: Option<&DepthBuffer>, call: &'static str) -> Result<Option<ViewKey>> {
        let Some(depth) = depth else { return Ok(None) };
        self.check_owner(depth.owner(), call)?;
        self.retain(depth.resource());
        depth
            .views()
            .dsv
            .map(Some)
            .ok_or_else(|| AnvilError::InvalidUsage(format!("depth buffer #{} has no depth-stencil view", depth.id())))
    }

    // ========================================================================
    // Render targets
    // ========================================================================

    /// Binds a single target to slot 0 and unbinds the rest.
    pub fn bind_render_target(&self, target: Option<&RenderTarget>, depth: Option<&DepthBuffer>) -> Result<()> {
        self.bind_render_targets(&[target], depth)
    }

    /// Binds up to eight targets from slot 0; slots past the list unbind.
    pub fn bind_render_targets(&self, targets: &[Option<&RenderTarget>], depth: Option<&DepthBuffer>) -> Result<()> {
        let targets = self.render_target_keys(targets, "bind_render_targets")?;
        let depth = self.depth_key(depth, "bind_render_targets")?;
        self.submit(Command::SetRenderTargets { targets, depth })
    }

    /// Binds targets together with pixel-stage UAVs starting at `uav_start`.
    pub fn bind_render_targets_and_uavs(
        &self,
        targets: &[Option<&RenderTarget>],
        depth: Option<&DepthBuffer>,
        uav_start: u32,
        uavs: &[Option<&Resource>],
    ) -> Result<()> {
        check_range("unordered access", uav_start, uavs.len(), UAV_SLOTS)?;
        let targets = self.render_target_keys(targets, "bind_render_targets_and_uavs")?;
        let depth = self.depth_key(depth, "bind_render_targets_and_uavs")?;
        let uavs = uavs
            .iter()
            .map(|uav| self.unordered_access_key(*uav, "bind_render_targets_and_uavs"))
            .collect::<Result<Slots<_>>>()?;
        self.submit(Command::SetRenderTargetsAndUavs {
            targets,
            depth,
            uav_start,
            uavs,
        })
    }

    pub fn unbind_all_render_targets(&self) -> Result<()> {
        self.submit(Command::SetRenderTargets {
            targets: smallvec![None; RENDER_TARGET_SLOTS as usize],
            depth: None,
        })
    }

    /// Binds a window's back buffer as the only target. `window` defaults
    /// to the instance's own.
    pub fn bind_back_buffer(&self, depth: Option<&DepthBuffer>, window: Option<&Window>) -> Result<()> {
        let back_buffer = match window {
            Some(window) => {
                self.check_owner(window.owner(), "bind_back_buffer")?;
                window.back_buffer()
            }
            None => self.shared.window_back_buffer()?,
        };
        self.bind_render_target(Some(&back_buffer), depth)
    }

    // ========================================================================
    // Rasterizer and input assembly
    // ========================================================================

    pub fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.submit(Command::SetViewport(viewport))
    }

    pub fn set_primitive_topology(&self, topology: PrimitiveTopology) -> Result<()> {
        self.submit(Command::SetPrimitiveTopology(topology))
    }

    /// Binds one of the instance's six precreated rasterizer states.
    pub fn set_cull_and_fill_mode(&self, cull: CullMode, fill: FillMode) -> Result<()> {
        let state = &self.shared.rasterizers[RasterizerDesc::preset_index(cull, fill)];
        self.submit(Command::SetRasterizerState(Some(state.key())))
    }

    // ========================================================================
    // Blend and depth-stencil
    // ========================================================================

    pub fn bind_blend_state(&self, state: &BlendState, factor: Option<[f32; 4]>, sample_mask: Option<u32>) -> Result<()> {
        self.check_owner(state.owner(), "bind_blend_state")?;
        self.retain(state);
        self.submit(Command::SetBlendState {
            state: Some(state.key()),
            factor: factor.unwrap_or(OPAQUE_BLEND_FACTOR),
            sample_mask: sample_mask.unwrap_or(FULL_SAMPLE_MASK),
        })
    }

    /// Restores default (disabled) blending.
    pub fn clear_blend_state(&self) -> Result<()> {
        self.submit(Command::SetBlendState {
            state: None,
            factor: OPAQUE_BLEND_FACTOR,
            sample_mask: FULL_SAMPLE_MASK,
        })
    }

    /// Binds one of the instance's precreated depth presets.
    pub fn set_depth_buffer_state(&self, state: DepthState) -> Result<()> {
        let preset = &self.shared.depth_presets[state.index()];
        self.submit(Command::SetDepthStencilState {
            state: Some(preset.key()),
            stencil_ref: 0,
        })
    }

    pub fn set_depth_stencil_state(&self, state: &DepthStencilState, stencil_ref: u32) -> Result<()> {
        self.check_owner(state.owner(), "set_depth_stencil_state")?;
        self.retain(state);
        self.submit(Command::SetDepthStencilState {
            state: Some(state.key()),
            stencil_ref,
        })
    }
}
