//! Camera module: camera collaborator and frustum.
//!
//! The renderer does NOT store or manage cameras. They are owned and driven
//! by the caller; the renderer reads matrices and pushes aspect updates.

mod camera;
mod frustum;

pub use camera::{Camera, CameraSource};
pub use frustum::Frustum;
