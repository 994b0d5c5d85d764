//! Scene module: collaborator interfaces feeding the frame graph.
//!
//! The renderer does not own a scene graph. It consumes a flattened stream
//! of `RenderItem`s and overlay quads and resolves mesh bounds and material
//! colors through a `ResourceStore`.

mod aabb;
mod resource_store;
mod scene_source;

pub use aabb::AABB;
pub use resource_store::{MaterialHandle, MeshHandle, ResourceStore, SimpleResourceStore};
pub use scene_source::{OverlayQuad, RenderItem, SceneSource, SimpleScene};

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
