/// Axis-aligned bounding box

use glam::{Mat4, Vec3};

/// Axis-Aligned Bounding Box in local space
///
/// Stored in local space and transformed by the item's world transform at
/// draw-list build time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of half-size `half_extent` around the origin
    pub fn centered(half_extent: Vec3) -> Self {
        Self { min: -half_extent, max: half_extent }
    }

    /// World-space bounds after `matrix` (tight for affine transforms)
    ///
    /// Each basis column contributes its smaller and larger product with the
    /// local extents; the eight corners are never transformed.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let origin = matrix.w_axis.truncate();
        let (mut min, mut max) = (origin, origin);

        for (axis, (lo, hi)) in [matrix.x_axis, matrix.y_axis, matrix.z_axis]
            .into_iter()
            .zip(self.min.to_array().into_iter().zip(self.max.to_array()))
        {
            let (a, b) = (axis.truncate() * lo, axis.truncate() * hi);
            min += a.min(b);
            max += a.max(b);
        }

        AABB { min, max }
    }

    /// The eight corners, x varying fastest
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Whether the two boxes overlap (touching counts)
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }
}
