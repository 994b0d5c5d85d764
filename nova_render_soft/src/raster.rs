/// Quad rasterizer of the software device
///
/// Pixel (x, y) is covered when its center lies inside the quad's footprint
/// (top-left rule on the half-open span). Fragments go through scissor,
/// depth test/write, blending and the color write mask, in that order.

use slotmap::SlotMap;
use nova_render::nova::render::{AttachmentHandle, FragmentColor, PolygonMode, QuadDraw};
use crate::soft_command::ResolvedDraw;
use crate::soft_image::{SoftImage, POISON};
use crate::soft_validation::ValidationLog;

/// Pixel-space extent of a quad on a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    x0: u32,
    x1: u32,
    y0: u32,
    y1: u32,
}

/// Pixels whose centers fall in [lo, hi)
fn span(lo: f32, hi: f32, size: u32) -> (u32, u32) {
    let start = (lo - 0.5).ceil().clamp(0.0, size as f32) as u32;
    let end = (hi - 0.5).ceil().clamp(0.0, size as f32) as u32;
    (start, end)
}

impl Footprint {
    /// Footprint of `quad` on a `width` x `height` target, `None` when nothing is covered
    pub fn new(quad: &QuadDraw, (width, height): (u32, u32)) -> Option<Self> {
        let left = (quad.min.x + 1.0) * 0.5 * width as f32;
        let right = (quad.max.x + 1.0) * 0.5 * width as f32;
        // NDC y points up, rows go down
        let top = (1.0 - quad.max.y) * 0.5 * height as f32;
        let bottom = (1.0 - quad.min.y) * 0.5 * height as f32;

        if !(left < right && top < bottom) {
            return None;
        }

        let (x0, x1) = span(left, right, width);
        let (y0, y1) = span(top, bottom, height);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        Some(Self { left, right, top, bottom, x0, x1, y0, y1 })
    }

    /// Covered pixel rectangle as (x0, y0, x1, y1), exclusive upper bounds
    pub fn bounds(&self) -> (u32, u32, u32, u32) {
        (self.x0, self.y0, self.x1, self.y1)
    }

    /// Pixels produced under `mode`
    pub fn pixels(&self, mode: PolygonMode) -> Vec<(u32, u32)> {
        let (last_x, last_y) = (self.x1 - 1, self.y1 - 1);
        match mode {
            PolygonMode::Fill => (self.y0..self.y1)
                .flat_map(|y| (self.x0..self.x1).map(move |x| (x, y)))
                .collect(),
            PolygonMode::Line => (self.y0..self.y1)
                .flat_map(|y| (self.x0..self.x1).map(move |x| (x, y)))
                .filter(|&(x, y)| x == self.x0 || x == last_x || y == self.y0 || y == last_y)
                .collect(),
            PolygonMode::Point => {
                let mut corners = vec![
                    (self.x0, self.y0),
                    (last_x, self.y0),
                    (self.x0, last_y),
                    (last_x, last_y),
                ];
                corners.sort_unstable();
                corners.dedup();
                corners
            }
        }
    }

    /// Interpolated texture coordinates at the center of pixel (x, y)
    pub fn uv(&self, x: u32, y: u32) -> (f32, f32) {
        let u = (x as f32 + 0.5 - self.left) / (self.right - self.left);
        let v = (y as f32 + 0.5 - self.top) / (self.bottom - self.top);
        (u, v)
    }
}

fn shade(quad: &QuadDraw, source: Option<&SoftImage>, footprint: &Footprint, x: u32, y: u32) -> [f32; 4] {
    match (quad.color, source) {
        (FragmentColor::Constant(color), _) => color,
        (FragmentColor::Sample { tint, .. }, Some(image)) => {
            let (u, v) = footprint.uv(x, y);
            let texel = image.sample(u, v);
            [texel[0] * tint[0], texel[1] * tint[1], texel[2] * tint[2], texel[3] * tint[3]]
        }
        (FragmentColor::Sample { .. }, None) => POISON,
    }
}

/// Rasterize one resolved draw into its targets
pub fn rasterize(images: &mut SlotMap<AttachmentHandle, SoftImage>, draw: &ResolvedDraw, validation: &ValidationLog) {
    let state = &draw.state;
    let quad = &draw.quad;

    if !state.passes_cull(quad.winding) {
        return;
    }

    for handle in draw.colors.iter().chain(draw.depth.iter()) {
        if !images.contains_key(*handle) {
            validation.error("draw into a destroyed attachment");
            return;
        }
    }

    let extent = match draw.colors.first().or(draw.depth.as_ref()).and_then(|h| images.get(*h)) {
        Some(image) => image.desc().extent(),
        None => {
            validation.warning("draw with no bound target");
            return;
        }
    };

    // Sampled sources are never bound as targets, a snapshot is exact
    let source = match quad.color {
        FragmentColor::Sample { source, .. } => match images.get(source) {
            Some(image) => Some(image.clone()),
            None => {
                validation.error("draw samples a destroyed attachment");
                return;
            }
        },
        FragmentColor::Constant(_) => None,
    };

    let footprint = match Footprint::new(quad, extent) {
        Some(footprint) => footprint,
        None => return,
    };

    let mut fragments: Vec<(u32, u32)> = footprint
        .pixels(state.effective_polygon_mode())
        .into_iter()
        .filter(|&(x, y)| match state.scissor {
            Some(rect) => rect.contains(x as i32, y as i32),
            None => true,
        })
        .collect();

    if let Some(depth) = draw.depth.and_then(|handle| images.get_mut(handle)) {
        fragments.retain(|&(x, y)| {
            let mut texel = depth.get(x, y);
            if state.depth.test_enable && !state.depth.compare.test(quad.depth, texel[0]) {
                return false;
            }
            if state.depth.write_enable {
                texel[0] = quad.depth;
                depth.set(x, y, texel);
            }
            true
        });
    }

    for (i, handle) in draw.colors.iter().enumerate() {
        let target = match images.get_mut(*handle) {
            Some(target) => target,
            None => continue,
        };
        for &(x, y) in &fragments {
            let base = shade(quad, source.as_ref(), &footprint, x, y);
            let color = if i == 0 { base } else { quad.secondary.unwrap_or(base) };
            let mut dst = target.get(x, y);
            let blended = state.blend.blend(color, dst);
            state.color_write_mask.apply(&mut dst, blended);
            target.set(x, y, dst);
        }
    }
}

#[cfg(test)]
#[path = "raster_tests.rs"]
mod tests;
