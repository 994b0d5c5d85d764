//! Integration tests for surface changes on both software backends
//!
//! Resize round trips, stale-surface recovery and minimized windows, driven
//! through FrameRenderer against a resizable SoftSurface.


use nova_render::nova::{FrameStatus, RendererConfig};
use nova_render::nova::render::Swapchain;
use nova_render_soft::{SoftDeviceConfig, SoftSurface};
use soft_test_utils::*;

// ============================================================================
// RESIZE TESTS
// ============================================================================

#[test]
fn test_resize_round_trip() {
    for kind in BACKENDS {
        let device = soft_device(kind, SoftDeviceConfig::default());
        let (mut renderer, surface) = renderer_on(device, 800, 600, RendererConfig::default());
        let mut fixture = SceneFixture::new(800, 600);

        assert_eq!(fixture.frame(&mut renderer).unwrap(), FrameStatus::Presented);
        let attachments = renderer.device().live_attachment_count();

        for (width, height) in [(1920, 1080), (800, 600)] {
            surface.resize(width, height);

            // The stale image is noticed on acquire: skipped, then rebuilt
            assert_eq!(fixture.frame(&mut renderer).unwrap(), FrameStatus::Skipped, "{:?}", kind);
            assert_eq!(renderer.extent(), (width, height));
            assert_eq!(renderer.swapchain().unwrap().extent(), (width, height));

            assert_eq!(fixture.frame(&mut renderer).unwrap(), FrameStatus::Presented, "{:?}", kind);
            assert!((fixture.camera.aspect() - width as f32 / height as f32).abs() < 1e-6);
            renderer.graph().verify_extents(renderer.device()).unwrap();
        }

        // Nothing leaked: old sets were destroyed before new ones were built
        assert_eq!(renderer.device().live_attachment_count(), attachments, "{:?}", kind);
        assert_eq!(renderer.graph().sets_created() - renderer.graph().sets_destroyed(), 2);
        assert_eq!(renderer.swapchain().unwrap().presented_count(), 3);
    }
}

#[test]
fn test_explicit_resize_rebuilds_before_next_frame() {
    for kind in BACKENDS {
        let device = soft_device(kind, SoftDeviceConfig::default());
        let (mut renderer, surface) = renderer_on(device, 64, 64, RendererConfig::default());
        let mut fixture = SceneFixture::new(64, 64);

        surface.resize(32, 16);
        renderer.handle_resize(&mut fixture.camera).unwrap();

        assert_eq!(renderer.extent(), (32, 16));
        assert_eq!(fixture.camera.aspect(), 2.0);
        assert_eq!(fixture.frame(&mut renderer).unwrap(), FrameStatus::Presented, "{:?}", kind);
    }
}

// ============================================================================
// STALE / MINIMIZED SURFACE TESTS
// ============================================================================

#[test]
fn test_minimized_surface_skips_until_restored() {
    for kind in BACKENDS {
        let device = soft_device(kind, SoftDeviceConfig::default());
        let (mut renderer, surface) = renderer_on(device, 64, 48, RendererConfig::default());
        let mut fixture = SceneFixture::new(64, 48);
        fixture.frame(&mut renderer).unwrap();

        surface.resize(0, 0);
        for _ in 0..3 {
            assert_eq!(fixture.frame(&mut renderer).unwrap(), FrameStatus::Skipped, "{:?}", kind);
            assert!(renderer.is_rebuild_pending());
        }
        // Surface-bound resources were never torn down for a zero size
        assert_eq!(renderer.extent(), (64, 48));

        surface.resize(64, 48);
        assert_eq!(fixture.frame(&mut renderer).unwrap(), FrameStatus::Presented, "{:?}", kind);
        assert!(!renderer.is_rebuild_pending());
        assert_eq!(renderer.swapchain().unwrap().presented_count(), 2);
    }
}

#[test]
fn test_requested_rebuild_keeps_rendering() {
    for kind in BACKENDS {
        let device = soft_device(kind, SoftDeviceConfig::default());
        let (mut renderer, _surface) = renderer_on(device, 32, 32, RendererConfig::default());
        let mut fixture = SceneFixture::new(32, 32);

        renderer.request_rebuild();
        assert_eq!(fixture.frame(&mut renderer).unwrap(), FrameStatus::Presented, "{:?}", kind);
        assert!(!renderer.is_rebuild_pending());
        // Same size: the attachment sets are kept
        assert_eq!(renderer.graph().sets_created(), 2);
    }
}

#[test]
fn test_swapchain_on_its_own_surface() {
    for kind in BACKENDS {
        let mut device = soft_device(kind, SoftDeviceConfig::default());
        let surface = SoftSurface::new(4, 4);
        let mut swapchain: Box<dyn Swapchain> = device.create_swapchain(surface.clone()).unwrap();

        let image = swapchain.acquire_next_image().unwrap();
        surface.resize(8, 8);
        assert!(swapchain.present(&image, Default::default()).is_err(), "{:?}", kind);

        swapchain.recreate(8, 8).unwrap();
        let image = swapchain.acquire_next_image().unwrap();
        assert_eq!((image.width, image.height), (8, 8));
        swapchain.present(&image, Default::default()).unwrap();
        assert_eq!(swapchain.presented_count(), 1);
    }
}
