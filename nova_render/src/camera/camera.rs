/// Camera collaborator and a perspective camera implementation.
///
/// The renderer only reads view/projection matrices and pushes aspect-ratio
/// updates when the surface is resized. Cameras are owned by the caller.

use glam::{Mat4, Vec3};
use super::frustum::Frustum;

/// Source of the view and projection matrices
pub trait CameraSource {
    /// View matrix (inverse of the camera's world transform)
    fn view_matrix(&self) -> Mat4;

    /// Projection matrix (clip-space depth 0..1)
    fn projection_matrix(&self) -> Mat4;

    /// Called by the renderer when the drawable aspect ratio changes
    fn set_aspect_ratio(&mut self, aspect: f32);

    /// Combined view-projection matrix (projection * view)
    fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Right-handed perspective camera
///
/// The projection is recomputed whenever a parameter changes.
#[derive(Debug, Clone)]
pub struct Camera {
    view_matrix: Mat4,
    projection_matrix: Mat4,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Camera {
    /// Perspective camera with vertical field of view `fov_y` (radians)
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::perspective_rh(fov_y, aspect, near, far),
            fov_y,
            aspect,
            near,
            far,
        }
    }

    /// Point the camera from `eye` at `target`
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.view_matrix = Mat4::look_at_rh(eye, target, up);
    }

    pub fn set_view(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// Frustum planes for culling
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection_matrix())
    }

    fn rebuild_projection(&mut self) {
        self.projection_matrix = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
    }
}

impl CameraSource for Camera {
    fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    fn set_aspect_ratio(&mut self, aspect: f32) {
        // Ignore degenerate sizes (minimized surface)
        if !aspect.is_finite() || aspect <= 0.0 {
            return;
        }
        self.aspect = aspect;
        self.rebuild_projection();
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
