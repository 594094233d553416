//! Resource Tests
//!
//! Tests for:
//! - Buffer reallocation: identity kept, sizes and usage replaced
//! - Map/unmap pairing
//! - Update rules per usage (immutable, static, dynamic, staging)
//! - Typed update helpers with element counts and offsets
//! - Weak vertex/index buffer links
//! - Static to staging copy round trip
//! - Handle lifetime and native object release

use anvil::anvil_device::VertexStream;
use anvil::{
    AnvilError, Instance, InstanceSettings, PixelFormat, Resource, ShaderStages, TextureParams2D, Usage, WindowParams,
};

fn instance() -> Instance {
    let _ = env_logger::builder().is_test(true).try_init();
    Instance::new(InstanceSettings {
        window: WindowParams::headless(64, 64),
        ..Default::default()
    })
    .unwrap()
}

/// Reads a GPU-only buffer the way applications must: copy into a staging
/// twin, then map it.
fn staged(inst: &Instance, buffer: &Resource) -> anyhow::Result<Vec<u8>> {
    let ctx = inst.immediate_context();
    let staging = inst.create_vertex_buffer(buffer.type_size(), buffer.num_elements(), Usage::Staging, None)?;
    ctx.copy_resource(&staging, buffer)?;
    let bytes = ctx.map_resource(&staging)?.to_vec();
    ctx.unmap_resource(&staging)?;
    Ok(bytes)
}

fn words(bytes: &[u8]) -> Vec<u32> {
    bytes.chunks_exact(4).map(bytemuck::pod_read_unaligned::<u32>).collect()
}

// ============================================================================
// Reallocation
// ============================================================================

#[test]
fn reallocate_keeps_identity_and_reports_new_sizes() {
    let inst = instance();
    let vb = inst.create_vertex_buffer(12, 4, Usage::Static, None).unwrap();
    let (id, old_backing) = (vb.id(), vb.backing());

    vb.reallocate(16, 10, Usage::Dynamic, None).unwrap();

    assert_eq!(vb.id(), id);
    assert_ne!(vb.backing(), old_backing);
    assert_eq!(vb.type_size(), 16);
    assert_eq!(vb.num_elements(), 10);
    assert_eq!(vb.byte_width(), 160);
    assert!(vb.is_dynamic());
}

#[test]
fn reallocate_seen_through_every_clone() {
    let inst = instance();
    let vb = inst.create_vertex_buffer(4, 4, Usage::Static, None).unwrap();
    let alias = vb.clone();

    vb.reallocate(8, 2, Usage::Static, None).unwrap();

    assert_eq!(alias.backing(), vb.backing());
    assert_eq!(alias.byte_width(), 16);
}

#[test]
fn constant_buffer_reallocates_to_one_element_only() {
    let inst = instance();
    let cb = inst
        .create_constant_buffer(16, ShaderStages::PIXEL, 0, Usage::Dynamic, None)
        .unwrap();

    assert!(matches!(
        cb.reallocate(16, 2, Usage::Dynamic, None),
        Err(AnvilError::InvalidUsage(_))
    ));
    cb.reallocate(64, 1, Usage::Dynamic, None).unwrap();
    assert_eq!(cb.type_size(), 64);
}

#[test]
fn mapped_buffer_cannot_reallocate() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vb = inst.create_vertex_buffer(4, 4, Usage::Dynamic, None).unwrap();

    let _mapped = ctx.map_resource(&vb).unwrap();
    assert!(vb.reallocate(4, 8, Usage::Dynamic, None).is_err());
    ctx.unmap_resource(&vb).unwrap();
    vb.reallocate(4, 8, Usage::Dynamic, None).unwrap();
}

// ============================================================================
// Map / Unmap
// ============================================================================

#[test]
fn second_map_fails_until_unmapped() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vb = inst.create_vertex_buffer(4, 4, Usage::Dynamic, None).unwrap();

    let mapped = ctx.map_resource(&vb).unwrap();
    assert!(vb.is_mapped());
    assert!(matches!(ctx.map_resource(&vb), Err(AnvilError::DoubleMap)));

    mapped.write(0, &[1, 2, 3, 4]).unwrap();
    ctx.unmap_resource(&vb).unwrap();
    assert!(!vb.is_mapped());

    let again = ctx.map_resource(&vb).unwrap();
    assert_eq!(&again.to_vec()[..4], &[1, 2, 3, 4]);
    ctx.unmap_resource(&vb).unwrap();
}

#[test]
fn unmap_without_map_fails() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let staging = inst.create_vertex_buffer(4, 4, Usage::Staging, None).unwrap();

    assert!(matches!(ctx.unmap_resource(&staging), Err(AnvilError::UnmapWithoutMap)));

    ctx.map_resource(&staging).unwrap();
    ctx.unmap_resource(&staging).unwrap();
    assert!(matches!(ctx.unmap_resource(&staging), Err(AnvilError::UnmapWithoutMap)));
}

#[test]
fn static_and_immutable_resources_do_not_map() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let static_vb = inst.create_vertex_buffer(4, 4, Usage::Static, None).unwrap();
    let immutable_vb = inst
        .create_vertex_buffer(4, 1, Usage::Immutable, Some(&[0; 4]))
        .unwrap();

    assert!(matches!(ctx.map_resource(&static_vb), Err(AnvilError::InvalidUsage(_))));
    assert!(matches!(ctx.map_resource(&immutable_vb), Err(AnvilError::InvalidUsage(_))));
    assert!(!static_vb.is_mapped());
}

#[test]
fn mapping_reports_pitches() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let params = TextureParams2D {
        usage: Usage::Staging,
        ..TextureParams2D::with_size(8, 4)
    };
    let staging = inst.create_texture_2d(&params, None).unwrap();

    let mapped = ctx.map_resource(&staging).unwrap();
    assert_eq!(mapped.row_pitch(), 8 * 4);
    assert_eq!(mapped.depth_pitch(), 8 * 4 * 4);
    ctx.unmap_resource(&staging).unwrap();
}

// ============================================================================
// Updates
// ============================================================================

#[test]
fn immutable_update_fails_and_leaves_data() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let data: Vec<u8> = (0..16).collect();
    let vb = inst.create_vertex_buffer(4, 4, Usage::Immutable, Some(&data)).unwrap();

    assert!(matches!(
        ctx.update_resource(&vb, &[0xFF; 16], 0),
        Err(AnvilError::ImmutableWrite)
    ));
    assert_eq!(staged(&inst, &vb).unwrap(), data);
}

#[test]
fn static_update_rejects_offsets() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vb = inst.create_vertex_buffer(4, 4, Usage::Static, None).unwrap();

    assert!(matches!(
        ctx.update_resource(&vb, &[1; 4], 4),
        Err(AnvilError::InvalidOffset { offset: 4 })
    ));

    ctx.update_resource(&vb, &[7; 16], 0).unwrap();
    assert_eq!(staged(&inst, &vb).unwrap(), vec![7; 16]);
}

#[test]
fn dynamic_update_writes_at_offset() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vb = inst.create_vertex_buffer(4, 4, Usage::Dynamic, None).unwrap();

    ctx.update_vertex_buffer(&vb, bytemuck::bytes_of(&7u32), 1, 2).unwrap();

    assert_eq!(words(&vb.read_back().unwrap()), [0, 0, 7, 0]);
    assert!(!vb.is_mapped());
}

#[test]
fn zero_count_updates_to_the_end() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let buffer = inst
        .create_structured_buffer(4, 4, ShaderStages::COMPUTE, 0, Usage::Dynamic, None, false)
        .unwrap();

    ctx.update_structured_buffer(&buffer, bytemuck::cast_slice(&[5u32, 6, 7, 8]), 0, 1)
        .unwrap();

    assert_eq!(words(&buffer.read_back().unwrap()), [0, 5, 6, 7]);
}

#[test]
fn short_element_data_is_rejected() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vb = inst.create_vertex_buffer(4, 4, Usage::Dynamic, None).unwrap();

    assert!(matches!(
        ctx.update_vertex_buffer(&vb, &[0; 8], 3, 0),
        Err(AnvilError::InvalidUsage(_))
    ));
}

#[test]
fn update_past_the_end_is_out_of_bounds() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vb = inst.create_vertex_buffer(4, 4, Usage::Dynamic, None).unwrap();

    assert!(matches!(
        ctx.update_resource(&vb, &[0; 8], 12),
        Err(AnvilError::UpdateOutOfBounds { offset: 12, len: 8, size: 16 })
    ));
    assert!(!vb.is_mapped());
}

#[test]
fn empty_update_is_rejected() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vb = inst.create_vertex_buffer(4, 4, Usage::Dynamic, None).unwrap();
    assert!(matches!(ctx.update_resource(&vb, &[], 0), Err(AnvilError::InvalidUsage(_))));
}

#[test]
fn constant_buffer_update_defaults_to_type_size() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let cb = inst
        .create_constant_buffer(16, ShaderStages::VERTEX, 0, Usage::Dynamic, None)
        .unwrap();
    let data: Vec<u8> = (1..=32).collect();

    ctx.update_constant_buffer(&cb, &data, 0, 0).unwrap();
    assert_eq!(cb.read_back().unwrap(), data[..16]);

    ctx.update_constant_buffer_from(&cb, &[9.0f32; 4]).unwrap();
    assert_eq!(words(&cb.read_back().unwrap()), [9.0f32.to_bits(); 4]);
}

// ============================================================================
// Linked index buffers
// ============================================================================

#[test]
fn linked_index_buffer_is_weak() {
    let inst = instance();
    let vb = inst.create_vertex_buffer_from(&[[0.0f32; 3]; 3], Usage::Static).unwrap();

    {
        let ib = inst.create_index_buffer_from(&[0u16, 1, 2], Usage::Static).unwrap();
        vb.link_index_buffer(&ib).unwrap();
        assert_eq!(vb.linked_index_buffer().as_ref(), Some(&ib));
        assert_eq!(ib.handle_count(), 1);
    }

    assert!(vb.linked_index_buffer().is_none());
}

#[test]
fn cleared_link_returns_none() {
    let inst = instance();
    let vb = inst.create_vertex_buffer_from(&[[0.0f32; 3]; 3], Usage::Static).unwrap();
    let ib = inst.create_index_buffer_from(&[0u32, 1, 2], Usage::Static).unwrap();

    vb.link_index_buffer(&ib).unwrap();
    vb.clear_index_buffer();
    assert!(vb.linked_index_buffer().is_none());
}

#[test]
fn index_format_follows_element_size() {
    let inst = instance();
    let narrow = inst.create_index_buffer_from(&[0u8, 1, 2], Usage::Static).unwrap();
    let short = inst.create_index_buffer_from(&[0u16, 1, 2], Usage::Static).unwrap();
    let wide = inst.create_index_buffer_from(&[0u32, 1, 2], Usage::Static).unwrap();

    assert_eq!(narrow.index_format(), PixelFormat::R8Uint);
    assert_eq!(short.index_format(), PixelFormat::R16Uint);
    assert_eq!(wide.index_format(), PixelFormat::R32Uint);
}

// ============================================================================
// Round trips and scenarios
// ============================================================================

#[test]
fn staging_readback_matches_the_backing_store() -> anyhow::Result<()> {
    let inst = instance();
    let data: Vec<u8> = (0..32).rev().collect();
    let vb = inst.create_vertex_buffer(8, 4, Usage::Static, Some(&data))?;

    assert_eq!(staged(&inst, &vb)?, data);
    assert_eq!(staged(&inst, &vb)?, vb.read_back()?);
    Ok(())
}

#[test]
fn static_buffer_reads_back_through_staging() -> anyhow::Result<()> {
    let inst = instance();
    let ctx = inst.immediate_context();
    let data: Vec<u8> = (0..64).collect();
    let source = inst.create_vertex_buffer(16, 4, Usage::Static, Some(&data))?;
    let staging = inst.create_vertex_buffer(16, 4, Usage::Staging, None)?;

    ctx.copy_resource(&staging, &source)?;
    let mapped = ctx.map_resource(&staging)?;
    assert_eq!(mapped.to_vec(), data);
    ctx.unmap_resource(&staging)?;
    Ok(())
}

#[test]
fn quad_binds_vertex_and_linked_index_buffer() -> anyhow::Result<()> {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vertices = [[-1.0f32, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]];
    let vb = inst.create_vertex_buffer_from(&vertices, Usage::Static)?;
    let ib = inst.create_index_buffer_from(&[0u16, 1, 2, 0, 2, 3], Usage::Static)?;
    vb.link_index_buffer(&ib)?;

    assert_eq!((vb.type_size(), vb.num_elements()), (12, 4));
    assert_eq!((ib.type_size(), ib.num_elements()), (2, 6));

    ctx.bind_vertex_buffer(Some(&vb), None)?;
    let state = ctx.pipeline_state()?;
    assert_eq!(
        state.vertex_stream(0),
        VertexStream {
            buffer: Some(vb.backing()),
            stride: 12,
            offset: 0,
        }
    );
    let index = state.index_buffer.expect("linked index buffer bound");
    assert_eq!(index.buffer, ib.backing());
    assert_eq!(index.format, PixelFormat::R16Uint);

    let before = inst.device_stats().draw_calls;
    ctx.draw_indexed(6, 0, 0)?;
    assert_eq!(inst.device_stats().draw_calls, before + 1);
    Ok(())
}

#[test]
fn instance_buffer_goes_to_stream_one() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vb = inst.create_vertex_buffer_from(&[[0.0f32; 3]; 3], Usage::Static).unwrap();
    let instances = inst.create_instance_buffer_from(&[[0.0f32; 4]; 8], Usage::Dynamic).unwrap();

    ctx.bind_vertex_buffer(Some(&vb), Some(&instances)).unwrap();

    let stream = ctx.pipeline_state().unwrap().vertex_stream(1);
    assert_eq!(stream.buffer, Some(instances.backing()));
    assert_eq!(stream.stride, 16);
}

#[test]
fn null_vertex_buffer_unbinds_streams_only() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let vb = inst.create_vertex_buffer_from(&[[0.0f32; 3]; 3], Usage::Static).unwrap();
    let ib = inst.create_index_buffer_from(&[0u16, 1, 2], Usage::Static).unwrap();
    vb.link_index_buffer(&ib).unwrap();
    ctx.bind_vertex_buffer(Some(&vb), None).unwrap();

    ctx.bind_vertex_buffer(None, None).unwrap();

    let state = ctx.pipeline_state().unwrap();
    assert_eq!(state.vertex_stream(0).buffer, None);
    assert!(state.index_buffer.is_some());

    ctx.bind_index_buffer(None).unwrap();
    assert!(ctx.pipeline_state().unwrap().index_buffer.is_none());
}

#[test]
fn empty_vertex_buffer_skips_stream_bind() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let empty = inst.create_vertex_buffer(12, 0, Usage::Static, None).unwrap();

    ctx.bind_vertex_buffer(Some(&empty), None).unwrap();
    assert_eq!(ctx.pipeline_state().unwrap().vertex_stream(0).buffer, None);
}

// ============================================================================
// Lifetime
// ============================================================================

#[test]
fn last_handle_releases_native_objects() {
    let inst = instance();
    let baseline = inst.live_object_count();

    let texture = inst.create_texture_2d(&TextureParams2D::with_size(16, 16), None).unwrap();
    let clone = texture.clone();
    assert_eq!(texture.handle_count(), 2);
    // backing store plus shader-resource view
    assert_eq!(inst.live_object_count(), baseline + 2);

    drop(texture);
    assert_eq!(inst.live_object_count(), baseline + 2);
    drop(clone);
    assert_eq!(inst.live_object_count(), baseline);
}
