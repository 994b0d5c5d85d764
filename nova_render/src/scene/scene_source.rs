/// Scene collaborator: the flattened per-frame stream the frame graph consumes

use glam::{Mat4, Vec2, Vec3};
use crate::scene::{MaterialHandle, MeshHandle};

/// One visible object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    /// Local-to-world transform
    pub transform: Mat4,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

/// Camera-facing overlay quad anchored at a world position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayQuad {
    /// World-space anchor
    pub center: Vec3,
    /// Half size in normalized device coordinates
    pub half_size: Vec2,
    pub color: [f32; 4],
}

/// Supplies what is visible this frame
///
/// Traversal, culling policy and the component model stay on the caller's
/// side; the renderer only sees the flattened stream.
pub trait SceneSource {
    /// Append every visible object
    fn collect_visible(&self, out: &mut Vec<RenderItem>);

    /// Append gizmo overlay quads
    fn collect_gizmos(&self, _out: &mut Vec<OverlayQuad>) {}

    /// Append particle quads
    fn collect_particles(&self, _out: &mut Vec<OverlayQuad>) {}
}

/// Plain list-backed scene
#[derive(Debug, Clone, Default)]
pub struct SimpleScene {
    pub items: Vec<RenderItem>,
    pub gizmos: Vec<OverlayQuad>,
    pub particles: Vec<OverlayQuad>,
}

impl SimpleScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, transform: Mat4, mesh: MeshHandle, material: MaterialHandle) {
        self.items.push(RenderItem { transform, mesh, material });
    }

    pub fn add_gizmo(&mut self, quad: OverlayQuad) {
        self.gizmos.push(quad);
    }

    pub fn add_particle(&mut self, quad: OverlayQuad) {
        self.particles.push(quad);
    }
}

impl SceneSource for SimpleScene {
    fn collect_visible(&self, out: &mut Vec<RenderItem>) {
        out.extend_from_slice(&self.items);
    }

    fn collect_gizmos(&self, out: &mut Vec<OverlayQuad>) {
        out.extend_from_slice(&self.gizmos);
    }

    fn collect_particles(&self, out: &mut Vec<OverlayQuad>) {
        out.extend_from_slice(&self.particles);
    }
}
