/// Draw-list construction: scene items to screen-space quads
///
/// Each visible item becomes the screen-space bounding rectangle of its
/// transformed bounds, colored by its material. Draws are sorted
/// front-to-back so early depth rejection does the most work.

use glam::{Mat4, Vec2, Vec4};
use rdst::{RadixKey, RadixSort};
use crate::camera::Frustum;
use crate::graphics_device::QuadDraw;
use crate::scene::{OverlayQuad, RenderItem, ResourceStore};

/// Encoded view-space normal written to the second geometry target
pub const FLAT_NORMAL: [f32; 4] = [0.5, 0.5, 1.0, 1.0];

const MIN_CLIP_W: f32 = 1e-5;

#[derive(Debug, Clone, Copy)]
struct SortedDraw {
    key: u32,
    draw: QuadDraw,
}

impl RadixKey for SortedDraw {
    const LEVELS: usize = 4;

    #[inline]
    fn get_level(&self, level: usize) -> u8 {
        (self.key >> (level * 8)) as u8
    }
}

/// Depth in 0..1 quantized to a sortable key
fn depth_key(depth: f32) -> u32 {
    (depth.clamp(0.0, 1.0) * u32::MAX as f32) as u32
}

fn to_ndc(view_proj: &Mat4, corner: glam::Vec3) -> Option<(Vec2, f32)> {
    let clip = *view_proj * Vec4::new(corner.x, corner.y, corner.z, 1.0);
    if clip.w <= MIN_CLIP_W {
        return None;
    }
    Some((Vec2::new(clip.x / clip.w, clip.y / clip.w), clip.z / clip.w))
}

/// Build the sorted geometry draw list
///
/// Items whose mesh or material is missing from `store` are skipped with a
/// warning. Items outside the frustum, or crossing the camera plane, are
/// dropped.
pub fn build_draw_list(
    items: &[RenderItem],
    store: &dyn ResourceStore,
    view_proj: &Mat4,
) -> Vec<QuadDraw> {
    let frustum = Frustum::from_view_projection(view_proj);
    let mut sorted: Vec<SortedDraw> = Vec::with_capacity(items.len());

    for item in items {
        let (bounds, color) = match (store.mesh_bounds(item.mesh), store.material_color(item.material)) {
            (Some(bounds), Some(color)) => (bounds, color),
            _ => {
                crate::engine_warn!("nova::DrawList", "Skipping item with unknown mesh or material");
                continue;
            }
        };

        let world = bounds.transformed(&item.transform);
        if !frustum.intersects_aabb(&world) {
            continue;
        }

        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        let mut nearest = f32::MAX;
        let mut projected = true;
        for corner in world.corners() {
            match to_ndc(view_proj, corner) {
                Some((ndc, depth)) => {
                    min = min.min(ndc);
                    max = max.max(ndc);
                    nearest = nearest.min(depth);
                }
                None => {
                    projected = false;
                    break;
                }
            }
        }
        if !projected {
            continue;
        }

        let depth = nearest.clamp(0.0, 1.0);
        let draw = QuadDraw::new(min.max(Vec2::NEG_ONE), max.min(Vec2::ONE), depth, color)
            .with_secondary(FLAT_NORMAL);
        sorted.push(SortedDraw { key: depth_key(depth), draw });
    }

    sorted.radix_sort_unstable();
    sorted.into_iter().map(|s| s.draw).collect()
}

/// Project overlay quads (gizmos, particles) to screen space
///
/// Quads anchored behind the camera are dropped. Submission order is kept.
pub fn project_overlays(quads: &[OverlayQuad], view_proj: &Mat4) -> Vec<QuadDraw> {
    quads
        .iter()
        .filter_map(|quad| {
            let (center, depth) = to_ndc(view_proj, quad.center)?;
            if !(0.0..=1.0).contains(&depth) {
                return None;
            }
            Some(QuadDraw::new(
                center - quad.half_size,
                center + quad.half_size,
                depth,
                quad.color,
            ))
        })
        .collect()
}

#[cfg(test)]
#[path = "draw_list_tests.rs"]
mod tests;
