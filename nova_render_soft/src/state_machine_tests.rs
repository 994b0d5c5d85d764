use glam::Vec2;
use nova_render::nova::Error;
use nova_render::nova::render::{AttachmentDesc, ClearValue, CullMode, GraphicsDevice, TextureFormat};
use crate::explicit_object::ExplicitObjectDevice;
use crate::soft_device::SoftDeviceConfig;
use super::*;

// ============================================================================
// TEST HELPERS
// ============================================================================

struct Setup {
    device: StateMachineDevice,
    color: AttachmentHandle,
    depth: AttachmentHandle,
    desc: PassDescriptor,
}

fn setup() -> Setup {
    let mut device = StateMachineDevice::new(SoftDeviceConfig::default()).unwrap();
    let color_desc = AttachmentDesc::new(TextureFormat::Rgba16Float, 4, 4);
    let depth_desc = AttachmentDesc::new(TextureFormat::Depth32Float, 4, 4);
    let color = device.create_attachment(&color_desc).unwrap();
    let depth = device.create_attachment(&depth_desc).unwrap();
    let desc = PassDescriptor::new("geometry")
        .with_color(AttachmentRef::new(color, color_desc).cleared(ClearValue::Color([0.0; 4])))
        .with_depth_stencil(
            AttachmentRef::new(depth, depth_desc)
                .cleared(ClearValue::DepthStencil { depth: 1.0, stencil: 0 })
                .with_store_op(StoreOp::DontCare),
        )
        .with_pipeline_state(PipelineStateDescriptor::opaque());
    Setup { device, color, depth, desc }
}

// ============================================================================
// SNAPSHOT TESTS
// ============================================================================

#[test]
fn test_restore_only_touches_masked_groups() {
    let mut state = AmbientState::default();
    let snapshot = state.snapshot(StateMask::BLEND | StateMask::DEPTH);

    state.apply_pipeline_state(&PipelineStateDescriptor::additive_particles());
    state.draw_targets = vec![AttachmentHandle::default()];
    state.restore(&snapshot);

    assert_eq!(state.blend, BlendMode::Opaque);
    assert_eq!(state.depth, DepthState::DISABLED);
    // Not covered by the mask
    assert_eq!(state.color_write_mask, ColorWriteMask::RGB);
    assert_eq!(state.draw_targets.len(), 1);
    assert_eq!(snapshot.mask(), StateMask::BLEND | StateMask::DEPTH);
}

#[test]
fn test_pipeline_state_round_trips_through_ambient_state() {
    let mut state = AmbientState::default();
    let desired = PipelineStateDescriptor::overlay_depth_tested().with_scissor(Some(Rect2D::new(1, 1, 2, 2)));

    state.apply_pipeline_state(&desired);
    assert_eq!(state.pipeline_state(), desired);
}

#[test]
fn test_scoped_capture_restores_on_drop() {
    let context = AmbientContext::new();
    let before = context.current();
    {
        let capture = ScopedCapture::capture(&context, StateMask::ALL);
        assert_eq!(capture.mask(), StateMask::ALL);
        context.with(|state| {
            state.rasterization.cull_mode = CullMode::FrontAndBack;
            state.read_target = Some(AttachmentHandle::default());
        });
        assert_ne!(context.current(), before);
    }
    assert_eq!(context.current(), before);
}

// ============================================================================
// PASS TESTS
// ============================================================================

#[test]
fn test_pass_binds_during_and_restores_after() {
    let mut s = setup();
    let context = s.device.context();
    let before = context.current();
    let mut executor = s.device.create_pass_executor(&s.desc).unwrap();
    let mut cmd = s.device.create_command_list().unwrap();

    cmd.begin().unwrap();
    executor.begin(cmd.as_mut()).unwrap();

    let during = context.current();
    assert_eq!(during.draw_targets, vec![s.color]);
    assert_eq!(during.depth_target, Some(s.depth));
    assert_eq!(during.pipeline_state(), PipelineStateDescriptor::opaque());

    executor.apply_state(cmd.as_mut(), &PipelineStateDescriptor::additive_particles()).unwrap();
    assert_eq!(context.current().blend, BlendMode::Additive);

    executor.end(cmd.as_mut()).unwrap();
    assert_eq!(context.current(), before);
    cmd.end().unwrap();
}

#[test]
fn test_pass_records_load_and_store_ops() {
    let mut s = setup();
    let mut executor = s.device.create_pass_executor(&s.desc).unwrap();
    let mut cmd = s.device.create_command_list().unwrap();

    cmd.begin().unwrap();
    executor.begin(cmd.as_mut()).unwrap();
    cmd.draw_quad(&QuadDraw::new(Vec2::splat(-1.0), Vec2::splat(1.0), 0.5, [1.0; 4])).unwrap();
    executor.end(cmd.as_mut()).unwrap();
    cmd.end().unwrap();

    let list = cmd.as_any().downcast_ref::<StateMachineCommandList>().unwrap();
    let names: Vec<&str> = list.commands().iter().map(DeviceCommand::name).collect();
    assert_eq!(names, vec!["clear", "clear", "draw", "discard"]);
    match &list.commands()[2] {
        DeviceCommand::Draw(draw) => {
            assert_eq!(draw.colors, vec![s.color]);
            assert_eq!(draw.depth, Some(s.depth));
            assert_eq!(draw.state, PipelineStateDescriptor::opaque());
        }
        other => panic!("expected a draw, got {:?}", other),
    }
}

#[test]
fn test_transfer_inside_pass_keeps_pass_bindings() {
    let mut s = setup();
    let context = s.device.context();
    let other = s
        .device
        .create_attachment(&AttachmentDesc::new(TextureFormat::Rgba16Float, 4, 4))
        .unwrap();
    let mut executor = s.device.create_pass_executor(&s.desc).unwrap();
    let mut cmd = s.device.create_command_list().unwrap();

    cmd.begin().unwrap();
    executor.begin(cmd.as_mut()).unwrap();
    let bound = context.current();

    cmd.copy_attachment(other, s.color).unwrap();

    assert_eq!(context.current(), bound);
    executor.end(cmd.as_mut()).unwrap();
}

#[test]
fn test_failed_begin_leaves_context_untouched() {
    let mut s = setup();
    let context = s.device.context();
    let before = context.current();
    let mut executor = s.device.create_pass_executor(&s.desc).unwrap();
    let mut cmd = s.device.create_command_list().unwrap();

    // Not recording
    assert!(matches!(executor.begin(cmd.as_mut()), Err(Error::LogicError(_))));
    assert_eq!(context.current(), before);

    // Second begin while the pass still holds the context
    cmd.begin().unwrap();
    executor.begin(cmd.as_mut()).unwrap();
    assert!(matches!(executor.begin(cmd.as_mut()), Err(Error::LogicError(_))));
    executor.end(cmd.as_mut()).unwrap();
    assert_eq!(context.current(), before);
}

#[test]
fn test_contract_violations() {
    let mut s = setup();
    let mut executor = s.device.create_pass_executor(&s.desc).unwrap();
    let mut cmd = s.device.create_command_list().unwrap();
    cmd.begin().unwrap();

    let quad = QuadDraw::new(Vec2::splat(-1.0), Vec2::splat(1.0), 0.5, [1.0; 4]);
    assert!(matches!(cmd.draw_quad(&quad), Err(Error::LogicError(_))));
    assert!(matches!(executor.end(cmd.as_mut()), Err(Error::LogicError(_))));
    assert!(matches!(
        executor.apply_state(cmd.as_mut(), &PipelineStateDescriptor::opaque()),
        Err(Error::LogicError(_))
    ));

    executor.begin(cmd.as_mut()).unwrap();
    assert!(matches!(cmd.end(), Err(Error::LogicError(_))));
    executor.end(cmd.as_mut()).unwrap();
    cmd.end().unwrap();
}

#[test]
fn test_foreign_command_list_rejected() {
    let mut s = setup();
    let mut foreign_device = ExplicitObjectDevice::new(SoftDeviceConfig::default()).unwrap();
    let mut foreign = foreign_device.create_command_list().unwrap();
    foreign.begin().unwrap();
    let mut executor = s.device.create_pass_executor(&s.desc).unwrap();

    assert!(matches!(executor.begin(foreign.as_mut()), Err(Error::BackendError(_))));
    foreign.end().unwrap();
    assert!(matches!(s.device.submit(foreign.as_mut()), Err(Error::BackendError(_))));
}

#[test]
fn test_rendered_result_and_discarded_depth() {
    let mut s = setup();
    let mut executor = s.device.create_pass_executor(&s.desc).unwrap();
    let mut cmd = s.device.create_command_list().unwrap();

    cmd.begin().unwrap();
    executor.begin(cmd.as_mut()).unwrap();
    cmd.draw_quad(&QuadDraw::new(Vec2::splat(-1.0), Vec2::splat(1.0), 0.5, [0.0, 1.0, 0.0, 1.0])).unwrap();
    executor.end(cmd.as_mut()).unwrap();
    cmd.end().unwrap();
    let marker = s.device.submit(cmd.as_mut()).unwrap();
    s.device.wait_for(marker).unwrap();

    let color = s.device.read_attachment(s.color).unwrap();
    assert!(color.iter().all(|texel| *texel == [0.0, 1.0, 0.0, 1.0]));
    let depth = s.device.read_attachment(s.depth).unwrap();
    assert!(depth.iter().all(crate::soft_image::is_poisoned));
}
