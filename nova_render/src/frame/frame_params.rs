/// Per-frame parameter block uploaded into the slot's buffer region

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Alignment of each slot's region in the shared parameter buffer
pub const PARAMS_ALIGNMENT: u64 = 256;

/// GPU layout of the per-frame parameters
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameParams {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_projection: [[f32; 4]; 4],
    /// x, y, width, height
    pub viewport: [f32; 4],
    pub frame_index: u32,
    pub slot: u32,
    pub _pad: [u32; 2],
}

impl FrameParams {
    pub fn new(view: Mat4, projection: Mat4, extent: (u32, u32), frame_index: u64, slot: usize) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view_projection: (projection * view).to_cols_array_2d(),
            viewport: [0.0, 0.0, extent.0 as f32, extent.1 as f32],
            frame_index: frame_index as u32,
            slot: slot as u32,
            _pad: [0; 2],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Size of one slot region, rounded up to the alignment
    pub fn region_size() -> u64 {
        let size = std::mem::size_of::<Self>() as u64;
        size.div_ceil(PARAMS_ALIGNMENT) * PARAMS_ALIGNMENT
    }
}
