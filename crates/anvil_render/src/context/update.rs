//! CPU writes into resources: map/unmap and whole or partial updates.
//!
//! | Usage       | `update_resource`                       | `map_resource`  |
//! |-------------|-----------------------------------------|-----------------|
//! | `Static`    | whole resource from offset 0            | rejected        |
//! | `Dynamic`   | map (write-discard), copy, unmap        | write-discard   |
//! | `Staging`   | map (read-write), copy, unmap           | read-write      |
//! | `Immutable` | rejected                                | rejected        |

use anvil_core::{AnvilError, Result, Usage};
use anvil_device::{Command, MappedSubresource};
use bytemuck::Pod;

use super::{Context, Retained};
use crate::resource::{
    ConstantBuffer, IndexBuffer, InstanceBuffer, RawBuffer, Resource, StructuredBuffer, VertexBuffer,
};

impl Context {
    /// Maps `resource` for CPU access. Every map must be paired with exactly
    /// one [`Context::unmap_resource`] before the resource maps again.
    pub fn map_resource(&self, resource: &Resource) -> Result<MappedSubresource> {
        self.check_owner(resource.owner(), "map_resource")?;
        let mut state = resource.write();
        if state.mapped {
            return Err(AnvilError::DoubleMap);
        }
        if !state.usage.is_mappable() {
            return Err(AnvilError::InvalidUsage(format!("{:?} resources cannot be mapped", state.usage)));
        }
        let mapped = self.device().map(self.key, state.backing, state.usage.map_mode())?;
        state.mapped = true;
        if !self.is_immediate() {
            let mut recording = self.recording.lock();
            recording.retained.push(Retained::from(resource));
            recording.mapped.push(resource.clone());
        }
        Ok(mapped)
    }

    pub fn unmap_resource(&self, resource: &Resource) -> Result<()> {
        self.check_owner(resource.owner(), "unmap_resource")?;
        let mut state = resource.write();
        if !state.mapped {
            return Err(AnvilError::UnmapWithoutMap);
        }
        self.device().unmap(self.key, state.backing)?;
        state.mapped = false;
        let mut recording = self.recording.lock();
        if let Some(index) = recording.mapped.iter().position(|mapped| mapped == resource) {
            recording.mapped.swap_remove(index);
        }
        Ok(())
    }

    /// Writes `data` at byte `offset`.
    ///
    /// Static resources take whole-resource updates only, so `offset` must
    /// be zero. Immutable resources are never written.
    pub fn update_resource(&self, resource: &Resource, data: &[u8], offset: usize) -> Result<()> {
        self.check_owner(resource.owner(), "update_resource")?;
        if data.is_empty() {
            return Err(AnvilError::InvalidUsage("update with no data".into()));
        }
        let (usage, backing) = {
            let state = resource.read();
            (state.usage, state.backing)
        };
        match usage {
            Usage::Immutable => Err(AnvilError::ImmutableWrite),
            Usage::Static if offset != 0 => Err(AnvilError::InvalidOffset { offset }),
            Usage::Static => {
                self.retain(resource);
                self.submit(Command::UpdateSubresource {
                    dst: backing,
                    offset: 0,
                    data: data.to_vec(),
                })
            }
            Usage::Dynamic | Usage::Staging => {
                let mapped = self.map_resource(resource)?;
                let written = mapped.write(offset, data);
                self.unmap_resource(resource)?;
                written
            }
        }
    }

    /// Writes `count` elements starting at element `first`. A `count` of 0
    /// means every element from `first` to the end.
    fn update_elements(&self, buffer: &Resource, data: &[u8], count: u32, first: u32) -> Result<()> {
        let type_size = buffer.type_size() as usize;
        let count = match count {
            0 => buffer.num_elements().saturating_sub(first),
            n => n,
        } as usize;
        let len = count * type_size;
        let bytes = data.get(..len).ok_or_else(|| {
            AnvilError::InvalidUsage(format!(
                "{count} elements of {type_size} bytes need {len} bytes, got {}",
                data.len()
            ))
        })?;
        self.update_resource(buffer, bytes, first as usize * type_size)
    }

    pub fn update_vertex_buffer(&self, buffer: &VertexBuffer, data: &[u8], count: u32, first: u32) -> Result<()> {
        self.update_elements(buffer, data, count, first)
    }

    pub fn update_index_buffer(&self, buffer: &IndexBuffer, data: &[u8], count: u32, first: u32) -> Result<()> {
        self.update_elements(buffer, data, count, first)
    }

    pub fn update_instance_buffer(&self, buffer: &InstanceBuffer, data: &[u8], count: u32, first: u32) -> Result<()> {
        self.update_elements(buffer, data, count, first)
    }

    pub fn update_structured_buffer(
        &self,
        buffer: &StructuredBuffer,
        data: &[u8],
        count: u32,
        first: u32,
    ) -> Result<()> {
        self.update_elements(buffer, data, count, first)
    }

    pub fn update_raw_buffer(&self, buffer: &RawBuffer, data: &[u8], count: u32, first: u32) -> Result<()> {
        self.update_elements(buffer, data, count, first)
    }

    /// Writes `size` bytes at byte `offset`; a `size` of 0 means the whole
    /// buffer.
    pub fn update_constant_buffer(&self, buffer: &ConstantBuffer, data: &[u8], offset: usize, size: usize) -> Result<()> {
        let size = if size == 0 { buffer.type_size() as usize } else { size };
        let bytes = data.get(..size).ok_or_else(|| {
            AnvilError::InvalidUsage(format!("constant buffer update needs {size} bytes, got {}", data.len()))
        })?;
        self.update_resource(buffer, bytes, offset)
    }

    /// Overwrites the whole constant buffer with `value`.
    pub fn update_constant_buffer_from<T: Pod>(&self, buffer: &ConstantBuffer, value: &T) -> Result<()> {
        self.update_resource(buffer, bytemuck::bytes_of(value), 0)
    }
}
