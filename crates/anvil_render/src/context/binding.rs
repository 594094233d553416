//! Shader-visible bindings: constant buffers, shader resources, samplers,
//! compute UAVs, shaders and the input assembler.

use anvil_core::limits::{CONSTANT_BUFFER_SLOTS, SAMPLER_SLOTS, SHADER_RESOURCE_SLOTS, UAV_SLOTS, VERTEX_BUFFER_SLOTS};
use anvil_core::{AnvilError, PixelFormat, Result, ShaderStage, ShaderStages};
use anvil_device::{Command, ResourceKey, Slots, VertexStream, ViewKey};
use smallvec::{SmallVec, smallvec};

use super::{Context, check_range, resolve_target};
use crate::resource::{
    ConstantBuffer, IndexBuffer, InstanceBuffer, RawBuffer, Resource, StructuredBuffer, VertexBuffer,
};
use crate::shader::{
    ComputeShader, DomainShader, GeometryShader, HullShader, PixelShader, Shader, ShaderProgram, VertexShader,
};
use crate::state::SamplerState;

impl Context {
    fn constant_buffer_key(&self, buffer: Option<&ConstantBuffer>, call: &'static str) -> Result<Option<ResourceKey>> {
        buffer
            .map(|buffer| {
                self.check_owner(buffer.owner(), call)?;
                self.retain(buffer.resource());
                Ok(buffer.backing())
            })
            .transpose()
    }

    fn shader_resource_key(&self, resource: Option<&Resource>, call: &'static str) -> Result<Option<ViewKey>> {
        let Some(resource) = resource else { return Ok(None) };
        self.check_owner(resource.owner(), call)?;
        self.retain(resource);
        resource.views().srv.map(Some).ok_or_else(|| {
            AnvilError::InvalidUsage(format!("{:?} #{} has no shader-resource view", resource.kind(), resource.id()))
        })
    }

    pub(super) fn unordered_access_key(&self, resource: Option<&Resource>, call: &'static str) -> Result<Option<ViewKey>> {
        let Some(resource) = resource else { return Ok(None) };
        self.check_owner(resource.owner(), call)?;
        self.retain(resource);
        resource.views().uav.map(Some).ok_or_else(|| {
            AnvilError::InvalidUsage(format!(
                "{:?} #{} has no unordered-access view",
                resource.kind(),
                resource.id()
            ))
        })
    }

    // ========================================================================
    // Constant buffers
    // ========================================================================

    /// Binds one constant buffer. `slot` and `stages` default to the
    /// buffer's own; unbinding (`None`) must name both.
    pub fn bind_constant_buffer(
        &self,
        buffer: Option<&ConstantBuffer>,
        slot: Option<u32>,
        stages: Option<ShaderStages>,
    ) -> Result<()> {
        let (slot, stages) = resolve_target(buffer.map(|b| b.resource()), slot, stages, "bind_constant_buffer")?;
        check_range("constant buffer", slot, 1, CONSTANT_BUFFER_SLOTS)?;
        let key = self.constant_buffer_key(buffer, "bind_constant_buffer")?;
        self.for_stages(stages, |stage| Command::SetConstantBuffers {
            stage,
            start: slot,
            buffers: smallvec![key],
        })
    }

    /// Binds consecutive constant buffer slots starting at `start`.
    pub fn bind_constant_buffers(
        &self,
        buffers: &[Option<&ConstantBuffer>],
        start: u32,
        stages: ShaderStages,
    ) -> Result<()> {
        check_range("constant buffer", start, buffers.len(), CONSTANT_BUFFER_SLOTS)?;
        let keys = buffers
            .iter()
            .map(|buffer| self.constant_buffer_key(*buffer, "bind_constant_buffers"))
            .collect::<Result<Slots<_>>>()?;
        self.for_stages(stages, |stage| Command::SetConstantBuffers {
            stage,
            start,
            buffers: keys.clone(),
        })
    }

    // ========================================================================
    // Shader resources
    // ========================================================================

    /// Binds any resource with a shader-resource view. `slot` and `stages`
    /// default to the resource's own; unbinding (`None`) must name both.
    pub fn bind_shader_resource(
        &self,
        resource: Option<&Resource>,
        slot: Option<u32>,
        stages: Option<ShaderStages>,
    ) -> Result<()> {
        let (slot, stages) = resolve_target(resource, slot, stages, "bind_shader_resource")?;
        check_range("shader resource", slot, 1, SHADER_RESOURCE_SLOTS)?;
        let view = self.shader_resource_key(resource, "bind_shader_resource")?;
        self.for_stages(stages, |stage| Command::SetShaderResources {
            stage,
            start: slot,
            views: smallvec![view],
        })
    }

    pub fn bind_shader_resources(&self, resources: &[Option<&Resource>], start: u32, stages: ShaderStages) -> Result<()> {
        check_range("shader resource", start, resources.len(), SHADER_RESOURCE_SLOTS)?;
        let views = resources
            .iter()
            .map(|resource| self.shader_resource_key(*resource, "bind_shader_resources"))
            .collect::<Result<Slots<_>>>()?;
        self.for_stages(stages, |stage| Command::SetShaderResources {
            stage,
            start,
            views: views.clone(),
        })
    }

    /// Binds a texture at an explicit slot. Stages default to pixel.
    pub fn bind_texture(&self, texture: Option<&Resource>, slot: u32, stages: Option<ShaderStages>) -> Result<()> {
        self.bind_shader_resource(texture, Some(slot), Some(stages.unwrap_or(ShaderStages::PIXEL)))
    }

    pub fn bind_textures(&self, textures: &[Option<&Resource>], start: u32, stages: Option<ShaderStages>) -> Result<()> {
        self.bind_shader_resources(textures, start, stages.unwrap_or(ShaderStages::PIXEL))
    }

    pub fn bind_structured_buffer(
        &self,
        buffer: Option<&StructuredBuffer>,
        slot: Option<u32>,
        stages: Option<ShaderStages>,
    ) -> Result<()> {
        self.bind_shader_resource(buffer.map(|b| b.resource()), slot, stages)
    }

    pub fn bind_structured_buffers(
        &self,
        buffers: &[Option<&StructuredBuffer>],
        start: u32,
        stages: ShaderStages,
    ) -> Result<()> {
        let resources: SmallVec<[_; 8]> = buffers.iter().map(|b| b.map(|b| b.resource())).collect();
        self.bind_shader_resources(&resources, start, stages)
    }

    pub fn bind_raw_buffer(
        &self,
        buffer: Option<&RawBuffer>,
        slot: Option<u32>,
        stages: Option<ShaderStages>,
    ) -> Result<()> {
        self.bind_shader_resource(buffer.map(|b| b.resource()), slot, stages)
    }

    pub fn bind_raw_buffers(&self, buffers: &[Option<&RawBuffer>], start: u32, stages: ShaderStages) -> Result<()> {
        let resources: SmallVec<[_; 8]> = buffers.iter().map(|b| b.map(|b| b.resource())).collect();
        self.bind_shader_resources(&resources, start, stages)
    }

    // ========================================================================
    // Samplers
    // ========================================================================

    pub fn bind_sampler(&self, sampler: Option<&SamplerState>, slot: u32, stages: ShaderStages) -> Result<()> {
        self.bind_samplers(&[sampler], slot, stages)
    }

    pub fn bind_samplers(&self, samplers: &[Option<&SamplerState>], start: u32, stages: ShaderStages) -> Result<()> {
        check_range("sampler", start, samplers.len(), SAMPLER_SLOTS)?;
        let keys = samplers
            .iter()
            .map(|sampler| {
                sampler
                    .map(|sampler| {
                        self.check_owner(sampler.owner(), "bind_samplers")?;
                        self.retain(sampler);
                        Ok(sampler.key())
                    })
                    .transpose()
            })
            .collect::<Result<Slots<_>>>()?;
        self.for_stages(stages, |stage| Command::SetSamplers {
            stage,
            start,
            samplers: keys.clone(),
        })
    }

    // ========================================================================
    // Compute UAVs
    // ========================================================================

    pub fn set_uav_for_cs(&self, resource: Option<&Resource>, slot: u32) -> Result<()> {
        self.set_uavs_for_cs(&[resource], slot)
    }

    pub fn set_uavs_for_cs(&self, resources: &[Option<&Resource>], start: u32) -> Result<()> {
        check_range("unordered access", start, resources.len(), UAV_SLOTS)?;
        let views = resources
            .iter()
            .map(|resource| self.unordered_access_key(*resource, "set_uavs_for_cs"))
            .collect::<Result<Slots<_>>>()?;
        self.submit(Command::SetComputeUavs { start, views })
    }

    // ========================================================================
    // Shaders
    // ========================================================================

    fn bind_shader(&self, shader: &Shader) -> Result<()> {
        self.check_owner(shader.owner(), "bind_shader")?;
        self.retain(shader);
        self.submit(Command::SetShader {
            stage: shader.stage(),
            shader: Some(shader.key()),
        })
    }

    /// Binds the vertex shader, and its input layout when it has one.
    pub fn bind_vertex_shader(&self, shader: &VertexShader) -> Result<()> {
        self.bind_shader(shader)?;
        if let Some(layout) = shader.input_layout() {
            self.submit(Command::SetInputLayout(Some(layout.key())))?;
        }
        Ok(())
    }

    pub fn bind_pixel_shader(&self, shader: &PixelShader) -> Result<()> {
        self.bind_shader(shader)
    }

    pub fn bind_hull_shader(&self, shader: &HullShader) -> Result<()> {
        self.bind_shader(shader)
    }

    pub fn bind_domain_shader(&self, shader: &DomainShader) -> Result<()> {
        self.bind_shader(shader)
    }

    pub fn bind_geometry_shader(&self, shader: &GeometryShader) -> Result<()> {
        self.bind_shader(shader)
    }

    pub fn bind_compute_shader(&self, shader: &ComputeShader) -> Result<()> {
        self.bind_shader(shader)
    }

    /// Clears the shader bound to `stage`.
    pub fn unbind_shader(&self, stage: ShaderStage) -> Result<()> {
        self.submit(Command::SetShader { stage, shader: None })
    }

    /// Binds every stage the program has. Stages the program lacks keep
    /// whatever was bound before.
    pub fn bind_shader_program(&self, program: &ShaderProgram) -> Result<()> {
        self.bind_vertex_shader(&program.vertex)?;
        if let Some(hull) = &program.hull {
            self.bind_hull_shader(hull)?;
        }
        if let Some(domain) = &program.domain {
            self.bind_domain_shader(domain)?;
        }
        if let Some(geometry) = &program.geometry {
            self.bind_geometry_shader(geometry)?;
        }
        self.bind_pixel_shader(&program.pixel)
    }

    // ========================================================================
    // Input assembler
    // ========================================================================

    /// Binds vertex data to stream 0 and optional instance data to stream 1,
    /// then the vertex buffer's linked index buffer if it has one.
    ///
    /// `None` unbinds every vertex stream and leaves the index buffer alone.
    pub fn bind_vertex_buffer(&self, vertices: Option<&VertexBuffer>, instances: Option<&InstanceBuffer>) -> Result<()> {
        let Some(vertices) = vertices else {
            let streams = (0..VERTEX_BUFFER_SLOTS).map(|_| VertexStream::default()).collect();
            return self.submit(Command::SetVertexBuffers { start: 0, streams });
        };
        self.check_owner(vertices.owner(), "bind_vertex_buffer")?;
        if let Some(instances) = instances {
            self.check_owner(instances.owner(), "bind_vertex_buffer")?;
        }
        self.retain(vertices.resource());
        if let Some(instances) = instances {
            self.retain(instances.resource());
        }

        if vertices.num_elements() > 0 {
            let mut streams: SmallVec<[VertexStream; 2]> = smallvec![stream_of(vertices)];
            if let Some(instances) = instances {
                streams.push(stream_of(instances));
            }
            self.submit(Command::SetVertexBuffers { start: 0, streams })?;
        }
        if let Some(index) = vertices.linked_index_buffer()
            && index.num_elements() > 0
        {
            self.bind_index_buffer(Some(&index))?;
        }
        Ok(())
    }

    pub fn bind_index_buffer(&self, indices: Option<&IndexBuffer>) -> Result<()> {
        let command = match indices {
            Some(indices) => {
                self.check_owner(indices.owner(), "bind_index_buffer")?;
                self.retain(indices.resource());
                Command::SetIndexBuffer {
                    buffer: Some(indices.backing()),
                    format: indices.index_format(),
                    offset: 0,
                }
            }
            None => Command::SetIndexBuffer {
                buffer: None,
                format: PixelFormat::Unknown,
                offset: 0,
            },
        };
        self.submit(command)
    }
}

fn stream_of(buffer: &Resource) -> VertexStream {
    VertexStream {
        buffer: Some(buffer.backing()),
        stride: buffer.type_size(),
        offset: 0,
    }
}
