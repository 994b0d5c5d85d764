use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use glam::Vec2;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{CommandList, GraphicsDevice, QuadDraw};
use super::*;

fn frame() -> FrameInputs {
    FrameInputs {
        geometry: vec![QuadDraw::new(Vec2::NEG_ONE, Vec2::ZERO, 0.1, [1.0; 4])],
        gizmos: vec![QuadDraw::new(Vec2::NEG_ONE, Vec2::ZERO, 0.2, [1.0; 4])],
        particles: vec![
            QuadDraw::new(Vec2::NEG_ONE, Vec2::ZERO, 0.3, [1.0; 4]),
            QuadDraw::new(Vec2::ZERO, Vec2::ONE, 0.4, [1.0; 4]),
        ],
    }
}

#[test]
fn test_fullscreen_action_requires_sampled_input() {
    let mut device = MockGraphicsDevice::new();
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    let inputs = frame();
    let ctx = PassContext { label: "lighting", sampled_inputs: &[], frame: &inputs };

    let result = FullscreenAction::default().execute(cmd.as_mut(), &ctx);

    assert!(matches!(result, Err(Error::ConfigurationError(_))));
    assert_eq!(cmd.command_count(), 0);
}

#[test]
fn test_overlay_action_draws_its_stream_only() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let inputs = frame();
    let ctx = PassContext { label: "particle", sampled_inputs: &[], frame: &inputs };

    // Draws are only accepted inside a pass: the stream is observed through the error
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    let result = OverlayAction::new(OverlayStream::Particles).execute(cmd.as_mut(), &ctx);
    assert!(matches!(result, Err(Error::LogicError(_))));

    let empty = FrameInputs::default();
    let ctx = PassContext { label: "gizmo", sampled_inputs: &[], frame: &empty };
    OverlayAction::new(OverlayStream::Gizmos).execute(cmd.as_mut(), &ctx).unwrap();
    DrawListAction.execute(cmd.as_mut(), &ctx).unwrap();
    assert!(controller.recorded().is_empty());
}

#[test]
fn test_custom_action_runs_closure() {
    let mut device = MockGraphicsDevice::new();
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    let inputs = frame();
    let ctx = PassContext { label: "custom", sampled_inputs: &[], frame: &inputs };
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut action = CustomAction::new(move |_cmd, ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(ctx.label, "custom");
        assert_eq!(ctx.frame.particles.len(), 2);
        Ok(())
    });

    action.execute(cmd.as_mut(), &ctx).unwrap();
    action.execute(cmd.as_mut(), &ctx).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
