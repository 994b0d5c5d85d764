/// Resource collaborator: meshes and material parameters by arena handle

use slotmap::{new_key_type, SlotMap};
use crate::scene::AABB;

new_key_type! {
    /// Stable key of a mesh in a ResourceStore
    pub struct MeshHandle;

    /// Stable key of a material in a ResourceStore
    pub struct MaterialHandle;
}

/// Read access to loaded resources
pub trait ResourceStore {
    /// Local-space bounds of a mesh
    fn mesh_bounds(&self, mesh: MeshHandle) -> Option<AABB>;

    /// Base color of a material
    fn material_color(&self, material: MaterialHandle) -> Option<[f32; 4]>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct SimpleResourceStore {
    meshes: SlotMap<MeshHandle, AABB>,
    materials: SlotMap<MaterialHandle, [f32; 4]>,
}

impl SimpleResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, bounds: AABB) -> MeshHandle {
        self.meshes.insert(bounds)
    }

    pub fn add_material(&mut self, base_color: [f32; 4]) -> MaterialHandle {
        self.materials.insert(base_color)
    }

    pub fn remove_mesh(&mut self, mesh: MeshHandle) -> Option<AABB> {
        self.meshes.remove(mesh)
    }

    pub fn remove_material(&mut self, material: MaterialHandle) -> Option<[f32; 4]> {
        self.materials.remove(material)
    }
}

impl ResourceStore for SimpleResourceStore {
    fn mesh_bounds(&self, mesh: MeshHandle) -> Option<AABB> {
        self.meshes.get(mesh).copied()
    }

    fn material_color(&self, material: MaterialHandle) -> Option<[f32; 4]> {
        self.materials.get(material).copied()
    }
}
