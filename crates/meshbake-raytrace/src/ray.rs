//! Rays and the slab test used during BVH traversal.

use meshbake_math::{Dir3, Point3, Vec3};

use crate::Aabb3;

/// A ray with a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
    /// Per-axis reciprocal of the direction; infinite on axes the ray is parallel to.
    inv_direction: Vec3,
}

impl Ray {
    /// Create a ray; `direction` is normalized.
    ///
    /// Returns `None` for a zero-length direction.
    pub fn new(origin: Point3, direction: Vec3) -> Option<Self> {
        let direction = Dir3::try_new(direction, 0.0)?;
        Some(Self::from_unit(origin, direction))
    }

    /// Create a ray from an already normalized direction.
    pub fn from_unit(origin: Point3, direction: Dir3) -> Self {
        let inv_direction = direction.map(|c| 1.0 / c);
        Self {
            origin,
            direction,
            inv_direction,
        }
    }

    /// The same ray pointing the other way.
    pub fn reversed(&self) -> Self {
        Self::from_unit(self.origin, -self.direction)
    }

    /// Slab test against `aabb`.
    ///
    /// Returns the clipped `(entry, exit)` parameters for the part of the
    /// ray with `t >= 0`, or `None` when the box is missed or lies behind.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        let mut entry = 0.0f64;
        let mut exit = f64::INFINITY;

        for axis in 0..3 {
            let inv = self.inv_direction[axis];
            let o = self.origin[axis];
            let t0 = (aabb.min[axis] - o) * inv;
            let t1 = (aabb.max[axis] - o) * inv;
            // NaN from 0 * inf (origin on a slab plane of a parallel axis)
            // falls through min/max and leaves the interval unchanged.
            entry = entry.max(t0.min(t1));
            exit = exit.min(t0.max(t1));
        }

        (entry <= exit).then_some((entry, exit))
    }
}
