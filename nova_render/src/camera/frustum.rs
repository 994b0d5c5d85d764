/// View frustum used to reject scene items before they reach the draw list
///
/// Planes are stored as `(normal, offset)` in a `Vec4` with inward normals:
/// a point `p` is inside a plane when `normal.dot(p) + offset >= 0`.

use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};
use crate::scene::AABB;

/// Left, right, bottom, top, near, far
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Planes of a view-projection matrix with 0..1 clip depth
    pub fn from_view_projection(view_proj: &Mat4) -> Self {
        let (x, y, z, w) = (view_proj.row(0), view_proj.row(1), view_proj.row(2), view_proj.row(3));
        let planes = [w + x, w - x, w + y, w - y, z, w - z].map(normalize_plane);
        Self { planes }
    }

    /// Conservative overlap test
    ///
    /// A box is rejected only when its corner furthest along a plane's normal
    /// is still behind that plane.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.xyz();
            let furthest = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            normal.dot(furthest) + plane.w >= 0.0
        })
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.xyz().length();
    if length > 0.0 { plane / length } else { plane }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
