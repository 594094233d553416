//! Draws, dispatches, clears and copies.

use anvil_core::{AnvilError, PixelFormat, Result};
use anvil_device::{ClearFlags, Command};
use glam::Vec4;

use super::Context;
use crate::resource::{DepthBuffer, RenderTarget, Resource};

impl Context {
    pub fn draw(&self, vertex_count: u32, start_vertex: u32) -> Result<()> {
        self.submit(Command::Draw {
            vertex_count,
            start_vertex,
        })
    }

    pub fn draw_indexed(&self, index_count: u32, start_index: u32, base_vertex: i32) -> Result<()> {
        self.submit(Command::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        })
    }

    pub fn draw_instanced(
        &self,
        vertex_count_per_instance: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    ) -> Result<()> {
        self.submit(Command::DrawInstanced {
            vertex_count_per_instance,
            instance_count,
            start_vertex,
            start_instance,
        })
    }

    pub fn draw_indexed_instanced(
        &self,
        index_count_per_instance: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    ) -> Result<()> {
        self.submit(Command::DrawIndexedInstanced {
            index_count_per_instance,
            instance_count,
            start_index,
            base_vertex,
            start_instance,
        })
    }

    pub fn dispatch(&self, x: u32, y: u32, z: u32) -> Result<()> {
        self.submit(Command::Dispatch { x, y, z })
    }

    /// Fills every texel of `target` with `color` (RGBA).
    pub fn clear_render_target(&self, target: &RenderTarget, color: Vec4) -> Result<()> {
        self.check_owner(target.owner(), "clear_render_target")?;
        self.retain(target.resource());
        let view = target.views().rtv.ok_or_else(|| {
            AnvilError::InvalidUsage(format!("render target #{} has no render-target view", target.id()))
        })?;
        self.submit(Command::ClearRenderTargetView {
            view,
            color: color.to_array(),
        })
    }

    /// Clears depth, and stencil when the buffer has one.
    pub fn clear_depth_buffer(&self, buffer: &DepthBuffer, depth: f32, stencil: u8) -> Result<()> {
        self.check_owner(buffer.owner(), "clear_depth_buffer")?;
        self.retain(buffer.resource());
        let view = buffer.views().dsv.ok_or_else(|| {
            AnvilError::InvalidUsage(format!("depth buffer #{} has no depth-stencil view", buffer.id()))
        })?;
        let has_stencil = buffer
            .texture_layout()
            .is_some_and(|layout| layout.pixel_format == PixelFormat::R24G8Typeless);
        let flags = if has_stencil {
            ClearFlags::DEPTH | ClearFlags::STENCIL
        } else {
            ClearFlags::DEPTH
        };
        self.submit(Command::ClearDepthStencilView {
            view,
            flags,
            depth,
            stencil,
        })
    }

    /// Copies the whole of `src` into `dst`. Both must match in size and
    /// layout, and `dst` must not be immutable.
    pub fn copy_resource(&self, dst: &Resource, src: &Resource) -> Result<()> {
        self.check_owner(dst.owner(), "copy_resource")?;
        self.check_owner(src.owner(), "copy_resource")?;
        self.retain(dst);
        self.retain(src);
        self.submit(Command::CopyResource {
            dst: dst.backing(),
            src: src.backing(),
        })
    }

    /// Unbinds everything and restores default pipeline state.
    pub fn clear_state(&self) -> Result<()> {
        self.submit(Command::ClearState)
    }
}
