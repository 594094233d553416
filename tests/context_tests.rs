//! Context Tests
//!
//! Tests for:
//! - Slot range limits per table, checked before any state changes
//! - Default slot/stage fallback and stage fan-out
//! - Null binds and ambiguous binds
//! - Cross-instance rejection
//! - Shader programs and pipeline state presets
//! - Deferred recording, replay and context roles

use anvil::{
    AnvilError, Context, CullMode, DepthState, FillMode, Format, InputLayoutDesc, Instance, InstanceSettings,
    PipelineState, PrimitiveTopology, RenderTargetBlendDesc, ShaderProgramDesc, ShaderSource, ShaderStage,
    ShaderStages, Texture2D, TextureParams2D, Usage, Viewport, WindowParams,
};

const VERTEX_SOURCE: &str = "float4 main(float3 pos : POSITION) : SV_Position { return float4(pos, 1.0); }";
const PIXEL_SOURCE: &str = "float4 main() : SV_Target { return float4(1.0, 0.0, 0.0, 1.0); }";
const PATCH_SOURCE: &str = "void main() {}";

fn instance() -> Instance {
    let _ = env_logger::builder().is_test(true).try_init();
    Instance::new(InstanceSettings {
        window: WindowParams::headless(64, 64),
        ..Default::default()
    })
    .unwrap()
}

fn texture(inst: &Instance) -> Texture2D {
    inst.create_texture_2d(&TextureParams2D::with_size(4, 4), None).unwrap()
}

fn state(ctx: &Context) -> PipelineState {
    ctx.pipeline_state().unwrap()
}

// ============================================================================
// Slot limits
// ============================================================================

#[test]
fn constant_buffer_slots_end_at_fifteen() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let cb = inst
        .create_constant_buffer(16, ShaderStages::PIXEL, 0, Usage::Dynamic, None)
        .unwrap();

    ctx.bind_constant_buffer(Some(&cb), Some(14), None).unwrap();
    ctx.bind_constant_buffers(&[Some(&cb); 15], 0, ShaderStages::PIXEL).unwrap();

    let before = state(ctx);
    assert!(matches!(
        ctx.bind_constant_buffer(Some(&cb), Some(15), None),
        Err(AnvilError::SlotOverflow { max: 15, .. })
    ));
    assert!(matches!(
        ctx.bind_constant_buffers(&[Some(&cb); 16], 0, ShaderStages::PIXEL),
        Err(AnvilError::SlotOverflow { start: 0, count: 16, max: 15, .. })
    ));
    assert_eq!(state(ctx), before);
}

#[test]
fn shader_resource_slots_end_at_128() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let tex = texture(&inst);
    let views = vec![Some(tex.resource()); 128];

    ctx.bind_shader_resource(Some(tex.resource()), Some(127), Some(ShaderStages::PIXEL))
        .unwrap();
    ctx.bind_shader_resources(&views, 0, ShaderStages::PIXEL).unwrap();

    let before = state(ctx);
    assert!(matches!(
        ctx.bind_shader_resource(Some(tex.resource()), Some(128), Some(ShaderStages::PIXEL)),
        Err(AnvilError::SlotOverflow { max: 128, .. })
    ));
    assert!(matches!(
        ctx.bind_shader_resources(&views, 1, ShaderStages::PIXEL),
        Err(AnvilError::SlotOverflow { start: 1, count: 128, .. })
    ));
    assert_eq!(state(ctx), before);
}

#[test]
fn sampler_slots_end_at_sixteen() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let sampler = inst.create_sampler_point_clamp().unwrap();

    ctx.bind_samplers(&[Some(&sampler); 16], 0, ShaderStages::PIXEL).unwrap();
    ctx.bind_sampler(Some(&sampler), 15, ShaderStages::PIXEL).unwrap();

    assert!(matches!(
        ctx.bind_samplers(&[Some(&sampler); 17], 0, ShaderStages::PIXEL),
        Err(AnvilError::SlotOverflow { max: 16, .. })
    ));
    assert!(matches!(
        ctx.bind_sampler(Some(&sampler), 16, ShaderStages::PIXEL),
        Err(AnvilError::SlotOverflow { .. })
    ));
}

#[test]
fn render_target_and_uav_tables_hold_eight() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let target = inst.create_render_target(&TextureParams2D::with_size(8, 8)).unwrap();

    ctx.bind_render_targets(&[Some(&target); 8], None).unwrap();
    assert!(matches!(
        ctx.bind_render_targets(&[Some(&target); 9], None),
        Err(AnvilError::SlotOverflow { max: 8, .. })
    ));

    let params = TextureParams2D {
        allow_unordered_access: true,
        ..TextureParams2D::with_size(8, 8)
    };
    let storage = inst.create_texture_2d(&params, None).unwrap();
    ctx.set_uavs_for_cs(&[Some(storage.resource()); 8], 0).unwrap();
    assert!(matches!(
        ctx.set_uav_for_cs(Some(storage.resource()), 8),
        Err(AnvilError::SlotOverflow { max: 8, .. })
    ));
}

// ============================================================================
// Defaults, fan-out and null binds
// ============================================================================

#[test]
fn default_slot_and_stages_fan_out() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let cb = inst
        .create_constant_buffer(16, ShaderStages::VERTEX | ShaderStages::PIXEL, 3, Usage::Dynamic, None)
        .unwrap();

    ctx.bind_constant_buffer(Some(&cb), None, None).unwrap();

    let bound = state(ctx);
    assert_eq!(bound.constant_buffer(ShaderStage::Vertex, 3), Some(cb.backing()));
    assert_eq!(bound.constant_buffer(ShaderStage::Pixel, 3), Some(cb.backing()));
    assert_eq!(bound.constant_buffer(ShaderStage::Hull, 3), None);
}

#[test]
fn changed_defaults_apply_to_later_binds() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let tex = texture(&inst);
    tex.set_default_slot(5);
    tex.set_default_stages(ShaderStages::COMPUTE);

    ctx.bind_shader_resource(Some(tex.resource()), None, None).unwrap();

    assert_eq!(
        state(ctx).shader_resource(ShaderStage::Compute, 5),
        tex.shader_resource_view()
    );
}

#[test]
fn textures_default_to_the_pixel_stage() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let tex = texture(&inst);

    ctx.bind_texture(Some(tex.resource()), 2, None).unwrap();

    let bound = state(ctx);
    assert_eq!(bound.shader_resource(ShaderStage::Pixel, 2), tex.shader_resource_view());
    assert_eq!(bound.shader_resource(ShaderStage::Vertex, 2), None);
}

#[test]
fn null_bind_needs_explicit_slot_and_stages() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let cb = inst
        .create_constant_buffer(16, ShaderStages::PIXEL, 2, Usage::Dynamic, None)
        .unwrap();
    ctx.bind_constant_buffer(Some(&cb), None, None).unwrap();

    assert!(matches!(
        ctx.bind_constant_buffer(None, None, None),
        Err(AnvilError::AmbiguousBind(_))
    ));
    assert!(matches!(
        ctx.bind_constant_buffer(None, Some(2), Some(ShaderStages::empty())),
        Err(AnvilError::AmbiguousBind(_))
    ));
    assert!(matches!(
        ctx.bind_shader_resource(None, None, Some(ShaderStages::PIXEL)),
        Err(AnvilError::AmbiguousBind(_))
    ));

    ctx.bind_constant_buffer(None, Some(2), Some(ShaderStages::PIXEL)).unwrap();
    assert_eq!(state(ctx).constant_buffer(ShaderStage::Pixel, 2), None);
}

#[test]
fn resources_without_views_are_rejected() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let params = TextureParams2D {
        usage: Usage::Staging,
        ..TextureParams2D::with_size(4, 4)
    };
    let staging = inst.create_texture_2d(&params, None).unwrap();

    assert!(matches!(
        ctx.bind_texture(Some(staging.resource()), 0, None),
        Err(AnvilError::InvalidUsage(_))
    ));
    assert!(matches!(
        ctx.set_uav_for_cs(Some(texture(&inst).resource()), 0),
        Err(AnvilError::InvalidUsage(_))
    ));
}

#[test]
fn bilinear_wrap_sampler_twice() {
    let inst = instance();
    let ctx = inst.immediate_context();

    let first = inst.create_sampler_bilinear_wrap().unwrap();
    let second = inst.create_sampler_bilinear_wrap().unwrap();
    assert_ne!(first, second);
    assert_eq!(first.desc(), second.desc());

    ctx.bind_sampler(Some(&first), 0, ShaderStages::PIXEL).unwrap();
    ctx.bind_sampler(Some(&second), 1, ShaderStages::PIXEL).unwrap();

    let bound = state(ctx);
    assert_eq!(bound.sampler(ShaderStage::Pixel, 0), Some(first.key()));
    assert_eq!(bound.sampler(ShaderStage::Pixel, 1), Some(second.key()));
}

// ============================================================================
// Cross-instance and context roles
// ============================================================================

#[test]
fn objects_from_another_instance_are_rejected() {
    let a = instance();
    let b = instance();
    let ctx = a.immediate_context();
    let foreign_cb = b
        .create_constant_buffer(16, ShaderStages::PIXEL, 0, Usage::Dynamic, None)
        .unwrap();
    let foreign_sampler = b.create_sampler_point_wrap().unwrap();
    let local_vb = a.create_vertex_buffer(4, 4, Usage::Static, None).unwrap();
    let foreign_vb = b.create_vertex_buffer(4, 4, Usage::Static, None).unwrap();

    assert!(matches!(
        ctx.bind_constant_buffer(Some(&foreign_cb), None, None),
        Err(AnvilError::CrossInstance(_))
    ));
    assert!(matches!(
        ctx.bind_sampler(Some(&foreign_sampler), 0, ShaderStages::PIXEL),
        Err(AnvilError::CrossInstance(_))
    ));
    assert!(matches!(
        ctx.copy_resource(&local_vb, &foreign_vb),
        Err(AnvilError::CrossInstance(_))
    ));
    assert!(matches!(
        ctx.bind_back_buffer(None, Some(b.window())),
        Err(AnvilError::CrossInstance(_))
    ));
}

#[test]
fn deferred_lists_replay_only_on_the_immediate_context() {
    let inst = instance();
    let deferred = inst.create_deferred_context().unwrap();
    let other = inst.create_deferred_context().unwrap();
    assert!(!deferred.is_immediate());

    deferred.draw(3, 0).unwrap();
    let list = deferred.finish_command_list(false).unwrap();

    assert!(matches!(
        other.execute_deferred_commands(list, false),
        Err(AnvilError::ContextRole(_))
    ));
}

#[test]
fn lists_from_another_instance_are_rejected() {
    let inst = instance();
    let deferred = inst.create_deferred_context().unwrap();
    deferred.draw(3, 0).unwrap();
    let list = deferred.finish_command_list(false).unwrap();

    let foreign = instance();
    assert!(matches!(
        foreign.immediate_context().execute_deferred_commands(list, false),
        Err(AnvilError::CrossInstance(_))
    ));
}

// ============================================================================
// Deferred recording
// ============================================================================

#[test]
fn replay_applies_recorded_bindings_and_work() -> anyhow::Result<()> {
    let inst = instance();
    let ctx = inst.immediate_context();
    let deferred = inst.create_deferred_context()?;
    let cb = inst.create_constant_buffer(16, ShaderStages::VERTEX, 1, Usage::Dynamic, None)?;

    deferred.bind_constant_buffer(Some(&cb), None, None)?;
    deferred.draw(3, 0)?;
    let list = deferred.finish_command_list(true)?;

    assert_eq!(deferred.pipeline_state()?, PipelineState::default());
    assert_eq!(state(ctx).constant_buffer(ShaderStage::Vertex, 1), None);

    let draws = inst.device_stats().draw_calls;
    ctx.execute_deferred_commands(list, false)?;

    assert_eq!(state(ctx).constant_buffer(ShaderStage::Vertex, 1), Some(cb.backing()));
    assert_eq!(inst.device_stats().draw_calls, draws + 1);
    assert_eq!(inst.device_stats().command_lists_executed, 1);
    Ok(())
}

#[test]
fn replay_with_clear_state_resets_the_immediate_context() -> anyhow::Result<()> {
    let inst = instance();
    let ctx = inst.immediate_context();
    let deferred = inst.create_deferred_context()?;
    let cb = inst.create_constant_buffer(16, ShaderStages::PIXEL, 0, Usage::Dynamic, None)?;

    deferred.bind_constant_buffer(Some(&cb), None, None)?;
    let list = deferred.finish_command_list(false)?;
    ctx.execute_deferred_commands(list, true)?;

    assert_eq!(state(ctx), PipelineState::default());
    Ok(())
}

#[test]
fn deferred_updates_land_on_replay() -> anyhow::Result<()> {
    let inst = instance();
    let ctx = inst.immediate_context();
    let deferred = inst.create_deferred_context()?;
    let cb = inst.create_constant_buffer(16, ShaderStages::PIXEL, 0, Usage::Dynamic, None)?;
    let data: Vec<u8> = (1..=16).collect();

    deferred.update_constant_buffer(&cb, &data, 0, 0)?;
    let list = deferred.finish_command_list(false)?;
    assert_eq!(cb.read_back()?, vec![0; 16]);

    ctx.execute_deferred_commands(list, false)?;
    assert_eq!(cb.read_back()?, data);
    Ok(())
}

#[test]
fn unexecuted_lists_are_released() {
    let inst = instance();
    let deferred = inst.create_deferred_context().unwrap();
    let baseline = inst.live_object_count();

    deferred.draw(3, 0).unwrap();
    let list = deferred.finish_command_list(false).unwrap();
    assert_eq!(inst.live_object_count(), baseline + 1);

    drop(list);
    assert_eq!(inst.live_object_count(), baseline);
}

#[test]
fn lists_keep_recorded_resources_alive() -> anyhow::Result<()> {
    let inst = instance();
    let ctx = inst.immediate_context();
    let baseline = inst.live_object_count();
    let deferred = inst.create_deferred_context()?;

    let tex = texture(&inst);
    deferred.bind_texture(Some(tex.resource()), 0, None)?;
    deferred.draw(3, 0)?;
    drop(tex);

    let list = deferred.finish_command_list(true)?;
    let draws = inst.device_stats().draw_calls;
    ctx.execute_deferred_commands(list, true)?;
    assert_eq!(inst.device_stats().draw_calls, draws + 1);

    drop(deferred);
    assert_eq!(inst.live_object_count(), baseline);
    Ok(())
}

#[test]
fn lists_keep_recorded_states_and_shaders_alive() -> anyhow::Result<()> {
    let inst = instance();
    let ctx = inst.immediate_context();
    let deferred = inst.create_deferred_context()?;

    let program = inst.create_shader_program(&program_desc())?;
    let sampler = inst.create_sampler_bilinear_wrap()?;
    let blend = inst.create_blend_state(&RenderTargetBlendDesc::alpha_blending())?;
    deferred.bind_shader_program(&program)?;
    deferred.bind_sampler(Some(&sampler), 0, ShaderStages::PIXEL)?;
    deferred.bind_blend_state(&blend, None, None)?;
    deferred.draw(3, 0)?;
    drop((program, sampler, blend));

    let list = deferred.finish_command_list(false)?;
    ctx.execute_deferred_commands(list, false)?;
    let bound = state(ctx);
    assert!(bound.stage(ShaderStage::Pixel).shader.is_some());
    assert!(bound.input_layout.is_some());
    assert!(bound.blend.is_some());
    Ok(())
}

#[test]
fn dropped_lists_release_what_they_held() {
    let inst = instance();
    let deferred = inst.create_deferred_context().unwrap();
    let baseline = inst.live_object_count();

    let tex = texture(&inst);
    deferred.bind_texture(Some(tex.resource()), 0, None).unwrap();
    drop(tex);
    let list = deferred.finish_command_list(true).unwrap();
    assert!(inst.live_object_count() > baseline + 1);

    drop(list);
    assert_eq!(inst.live_object_count(), baseline);
}

#[test]
fn dropping_a_deferred_context_ends_its_maps() -> anyhow::Result<()> {
    let inst = instance();
    let cb = inst.create_constant_buffer(16, ShaderStages::PIXEL, 0, Usage::Dynamic, None)?;

    let deferred = inst.create_deferred_context()?;
    deferred.map_resource(&cb)?;
    assert!(matches!(
        deferred.finish_command_list(false),
        Err(AnvilError::InvalidUsage(_))
    ));
    drop(deferred);

    let ctx = inst.immediate_context();
    ctx.map_resource(&cb)?;
    ctx.unmap_resource(&cb)?;
    cb.reallocate(32, 1, Usage::Dynamic, None)?;
    Ok(())
}

#[test]
fn unmapped_resources_are_not_touched_when_the_context_drops() -> anyhow::Result<()> {
    let inst = instance();
    let cb = inst.create_constant_buffer(16, ShaderStages::PIXEL, 0, Usage::Dynamic, None)?;

    let deferred = inst.create_deferred_context()?;
    deferred.map_resource(&cb)?;
    deferred.unmap_resource(&cb)?;
    let ctx = inst.immediate_context();
    ctx.map_resource(&cb)?;
    drop(deferred);

    assert!(matches!(ctx.map_resource(&cb), Err(AnvilError::DoubleMap)));
    ctx.unmap_resource(&cb)?;
    Ok(())
}

// ============================================================================
// Shaders
// ============================================================================

fn program_desc() -> ShaderProgramDesc {
    ShaderProgramDesc {
        input_layout: InputLayoutDesc::new().per_vertex("POSITION", Format::FLOAT3),
        vertex: ShaderSource::text(VERTEX_SOURCE, "main"),
        pixel: ShaderSource::text(PIXEL_SOURCE, "main"),
        ..Default::default()
    }
}

#[test]
fn hull_without_domain_is_rejected() {
    let inst = instance();
    let desc = ShaderProgramDesc {
        hull: ShaderSource::text(PATCH_SOURCE, "main"),
        ..program_desc()
    };
    assert!(matches!(inst.create_shader_program(&desc), Err(AnvilError::InvalidUsage(_))));
}

#[test]
fn program_binds_its_stages_and_layout() -> anyhow::Result<()> {
    let inst = instance();
    let ctx = inst.immediate_context();
    let program = inst.create_shader_program(&program_desc())?;
    assert_eq!(program.active_stages(), ShaderStages::VERTEX | ShaderStages::PIXEL);

    ctx.bind_shader_program(&program)?;

    let bound = state(ctx);
    assert_eq!(bound.stage(ShaderStage::Vertex).shader, Some(program.vertex.key()));
    assert_eq!(bound.stage(ShaderStage::Pixel).shader, Some(program.pixel.key()));
    assert_eq!(bound.stage(ShaderStage::Hull).shader, None);
    assert!(bound.input_layout.is_some());
    Ok(())
}

#[test]
fn tessellation_program_binds_hull_and_domain() -> anyhow::Result<()> {
    let inst = instance();
    let ctx = inst.immediate_context();
    let desc = ShaderProgramDesc {
        hull: ShaderSource::text(PATCH_SOURCE, "main"),
        domain: ShaderSource::text(PATCH_SOURCE, "main"),
        ..program_desc()
    };
    let program = inst.create_shader_program(&desc)?;

    ctx.bind_shader_program(&program)?;
    ctx.set_primitive_topology(PrimitiveTopology::PatchList(3))?;

    let bound = state(ctx);
    assert!(bound.stage(ShaderStage::Hull).shader.is_some());
    assert!(bound.stage(ShaderStage::Domain).shader.is_some());
    assert_eq!(bound.topology, PrimitiveTopology::PatchList(3));
    Ok(())
}

#[test]
fn broken_source_reports_diagnostics() {
    let inst = instance();
    let source = ShaderSource::text("float4 main( { }", "main");
    assert!(matches!(
        inst.create_shader(ShaderStage::Pixel, &source),
        Err(AnvilError::ShaderCompile { .. })
    ));
}

// ============================================================================
// Pipeline state
// ============================================================================

#[test]
fn instance_presets_are_bound_at_startup() {
    let inst = instance();
    let bound = state(inst.immediate_context());

    assert_eq!(bound.rasterizer, Some(inst.rasterizer(CullMode::Back, FillMode::Solid).key()));
    assert_eq!(bound.depth_stencil, Some(inst.depth_preset(DepthState::ReadWrite).key()));
    assert_eq!(bound.topology, PrimitiveTopology::TriangleList);
    assert_eq!(bound.viewport, Some(Viewport::from_size(64, 64)));
}

#[test]
fn cull_and_fill_select_a_preset() {
    let inst = instance();
    let ctx = inst.immediate_context();

    ctx.set_cull_and_fill_mode(CullMode::None, FillMode::Wireframe).unwrap();
    assert_eq!(
        state(ctx).rasterizer,
        Some(inst.rasterizer(CullMode::None, FillMode::Wireframe).key())
    );
}

#[test]
fn blend_state_defaults_and_clear() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let blend = inst.create_blend_state(&RenderTargetBlendDesc::alpha_blending()).unwrap();

    ctx.bind_blend_state(&blend, None, None).unwrap();
    let bound = state(ctx);
    assert_eq!(bound.blend, Some(blend.key()));
    assert_eq!(bound.blend_factor, [1.0; 4]);
    assert_eq!(bound.sample_mask, 0xFFFF_FFFF);

    ctx.bind_blend_state(&blend, Some([0.5; 4]), Some(0xF)).unwrap();
    assert_eq!(state(ctx).sample_mask, 0xF);

    ctx.clear_blend_state().unwrap();
    let cleared = state(ctx);
    assert_eq!(cleared.blend, None);
    assert_eq!(cleared.sample_mask, 0xFFFF_FFFF);
}

#[test]
fn depth_stencil_state_carries_the_reference() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let read_only = inst.depth_preset(DepthState::ReadOnly);

    ctx.set_depth_stencil_state(&read_only, 7).unwrap();
    let bound = state(ctx);
    assert_eq!(bound.depth_stencil, Some(read_only.key()));
    assert_eq!(bound.stencil_ref, 7);
}

#[test]
fn clear_state_unbinds_everything() {
    let inst = instance();
    let ctx = inst.immediate_context();
    let tex = texture(&inst);
    ctx.bind_texture(Some(tex.resource()), 0, None).unwrap();

    ctx.clear_state().unwrap();
    assert_eq!(state(ctx), PipelineState::default());
}

#[test]
fn dispatch_counts() {
    let inst = instance();
    let ctx = inst.immediate_context();
    ctx.dispatch(8, 8, 1).unwrap();
    ctx.dispatch(1, 1, 1).unwrap();
    assert_eq!(inst.device_stats().dispatches, 2);
}
