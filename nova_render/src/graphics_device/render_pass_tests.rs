//! Unit tests for render_pass.rs
//!
//! Tests PassDescriptor construction and validation.

use slotmap::SlotMap;
use crate::error::Error;
use crate::graphics_device::{
    AttachmentDesc, AttachmentHandle, AttachmentRef, ClearValue, LoadOp, PassDescriptor,
    PipelineStateDescriptor, StoreOp, TextureFormat,
};

// ============================================================================
// TEST HELPERS
// ============================================================================

struct Fixture {
    color: AttachmentRef,
    depth: AttachmentRef,
    other: AttachmentHandle,
}

fn fixture() -> Fixture {
    let mut arena: SlotMap<AttachmentHandle, ()> = SlotMap::with_key();
    let color = AttachmentRef::new(arena.insert(()), AttachmentDesc::new(TextureFormat::Rgba8Unorm, 64, 32));
    let depth = AttachmentRef::new(arena.insert(()), AttachmentDesc::new(TextureFormat::Depth32Float, 64, 32));
    Fixture { color, depth, other: arena.insert(()) }
}

fn valid(f: &Fixture) -> PassDescriptor {
    PassDescriptor::new("test")
        .with_color(f.color.cleared(ClearValue::Color([0.0, 0.0, 0.0, 1.0])))
        .with_depth_stencil(f.depth.cleared(ClearValue::DepthStencil { depth: 1.0, stencil: 0 }))
        .with_pipeline_state(PipelineStateDescriptor::opaque())
}

// ============================================================================
// CONSTRUCTION TESTS
// ============================================================================

#[test]
fn test_attachment_ref_defaults() {
    let f = fixture();
    assert_eq!(f.color.load_op, LoadOp::Load);
    assert_eq!(f.color.store_op, StoreOp::Store);
    assert_eq!(f.depth.clear_value, ClearValue::DepthStencil { depth: 1.0, stencil: 0 });
}

#[test]
fn test_descriptor_counts_and_extent() {
    let f = fixture();
    let desc = valid(&f);
    assert_eq!(desc.attachment_count(), 2);
    assert_eq!(desc.extent(), Some((64, 32)));
    assert!(desc.validate().is_ok());
}

#[test]
fn test_loaded_and_stored_sets() {
    let f = fixture();
    let desc = PassDescriptor::new("overlay")
        .with_color(f.color)
        .with_depth_stencil(f.depth.with_store_op(StoreOp::DontCare))
        .with_pipeline_state(PipelineStateDescriptor::overlay_depth_tested());

    assert_eq!(desc.loaded_attachments(), vec![f.color.handle, f.depth.handle]);
    assert_eq!(desc.stored_attachments(), vec![f.color.handle]);
}

// ============================================================================
// VALIDATION TESTS
// ============================================================================

#[test]
fn test_missing_pipeline_state() {
    let f = fixture();
    let mut desc = valid(&f);
    desc.pipeline_state = None;
    assert!(matches!(desc.validate(), Err(Error::ConfigurationError(_))));
}

#[test]
fn test_no_attachments() {
    let desc = PassDescriptor::new("empty").with_pipeline_state(PipelineStateDescriptor::opaque());
    assert!(desc.validate().is_err());
}

#[test]
fn test_size_mismatch() {
    let f = fixture();
    let mut small = f.depth;
    small.desc.width = 32;
    let desc = PassDescriptor::new("mismatch")
        .with_color(f.color)
        .with_depth_stencil(small)
        .with_pipeline_state(PipelineStateDescriptor::opaque());
    assert!(matches!(desc.validate(), Err(Error::ConfigurationError(_))));
}

#[test]
fn test_depth_bound_as_color() {
    let f = fixture();
    let desc = PassDescriptor::new("swapped")
        .with_color(f.depth)
        .with_pipeline_state(PipelineStateDescriptor::opaque());
    assert!(desc.validate().is_err());
}

#[test]
fn test_clear_value_must_match_role() {
    let f = fixture();
    let desc = PassDescriptor::new("bad clear")
        .with_color(f.color.cleared(ClearValue::DepthStencil { depth: 1.0, stencil: 0 }))
        .with_pipeline_state(PipelineStateDescriptor::opaque());
    assert!(desc.validate().is_err());
}

#[test]
fn test_dont_care_requires_full_coverage() {
    let f = fixture();
    let desc = PassDescriptor::new("resolve")
        .with_color(f.color.with_load_op(LoadOp::DontCare))
        .with_pipeline_state(PipelineStateDescriptor::fullscreen());
    assert!(matches!(desc.validate(), Err(Error::ConfigurationError(_))));

    let desc = desc.with_full_coverage(true);
    assert!(desc.validate().is_ok());
}

#[test]
fn test_sampling_own_attachment_rejected() {
    let f = fixture();
    let desc = valid(&f).with_sampled_input(f.color.handle);
    assert!(desc.validate().is_err());

    let desc = valid(&f).with_sampled_input(f.other);
    assert!(desc.validate().is_ok());
}
