use crate::config::RendererConfig;
use crate::error::Error;
use crate::frame_graph::PassId;
use crate::graphics_device::{PipelineStateDescriptor, TextureFormat};

#[test]
fn test_default_config_is_valid() {
    let config = RendererConfig::default();
    assert_eq!(config.frames_in_flight, 2);
    assert_eq!(config.max_timestamp_queries, 64);
    assert!(config.validate().is_ok());
}

#[test]
fn test_frames_in_flight_bounds() {
    for frames in [0, 9] {
        let config = RendererConfig { frames_in_flight: frames, ..RendererConfig::default() };
        assert!(matches!(config.validate(), Err(Error::ConfigurationError(_))));
    }
    for frames in [1, 3, 8] {
        let config = RendererConfig { frames_in_flight: frames, ..RendererConfig::default() };
        assert!(config.validate().is_ok());
    }
}

#[test]
fn test_query_capacity_minimum() {
    let config = RendererConfig { max_timestamp_queries: 1, ..RendererConfig::default() };
    assert!(matches!(config.validate(), Err(Error::ConfigurationError(_))));
}

#[test]
fn test_depth_format_must_carry_depth() {
    let config = RendererConfig { depth_format: TextureFormat::Rgba8Unorm, ..RendererConfig::default() };
    assert!(config.validate().is_err());

    let config = RendererConfig { depth_format: TextureFormat::Stencil8, ..RendererConfig::default() };
    assert!(config.validate().is_err());
}

#[test]
fn test_color_formats_must_be_color() {
    let config = RendererConfig { albedo_format: TextureFormat::Depth32Float, ..RendererConfig::default() };
    assert!(config.validate().is_err());
}

#[test]
fn test_pass_state_override() {
    let state = PipelineStateDescriptor::overlay_depth_tested();
    let config = RendererConfig::default().with_pass_state(PassId::Gizmo, state);

    assert_eq!(config.pass_state(PassId::Gizmo), Some(&state));
    assert_eq!(config.pass_state(PassId::Lighting), None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_override_on_transfer_node_rejected() {
    let config = RendererConfig::default()
        .with_pass_state(PassId::CopyDepth, PipelineStateDescriptor::opaque());
    assert!(matches!(config.validate(), Err(Error::ConfigurationError(_))));
}
