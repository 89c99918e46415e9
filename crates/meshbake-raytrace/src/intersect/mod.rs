//! Intersection routines and nearest-hit selection.
//!
//! A bake probes each texel ray in both directions. [`NearestHit`] stores
//! the winning triangle with a signed `t` (negative for hits found against
//! the ray direction) and [`NearestHit::beats`] is the single ordering every
//! backend uses to pick between candidates.

mod triangle;

pub use triangle::{
    clamp_barycentric, compute_barycentric, ray_plane_parameter, ray_triangle_intersect,
};

use meshbake_math::{BakeTolerance, Point3, Vec3};

/// Closest triangle found for one ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestHit {
    /// Index of the triangle in the high-detail mesh.
    pub triangle: u32,
    /// Signed ray parameter; negative when the hit lies behind the origin.
    pub t: f64,
}

impl NearestHit {
    /// Whether `self` should replace `other` as the nearest hit.
    ///
    /// Smaller `|t|` wins. On equal distance the lower triangle index wins,
    /// and for the same triangle the forward hit wins.
    #[inline]
    pub fn beats(&self, other: &NearestHit) -> bool {
        let (a, b) = (self.t.abs(), other.t.abs());
        if a != b {
            return a < b;
        }
        if self.triangle != other.triangle {
            return self.triangle < other.triangle;
        }
        self.t > other.t
    }

    /// Replace `best` with `candidate` if the candidate wins.
    #[inline]
    pub fn keep_nearest(best: &mut Option<NearestHit>, candidate: NearestHit) {
        match best {
            Some(current) if !candidate.beats(current) => {}
            _ => *best = Some(candidate),
        }
    }
}

/// Probe one triangle along `direction` and against it.
///
/// Returns the nearer of the two hits, with a negative `t` for the
/// backward one.
#[inline]
pub fn bidirectional_hit(
    origin: &Point3,
    direction: &Vec3,
    triangle: u32,
    corners: &[Point3; 3],
    tol: &BakeTolerance,
) -> Option<NearestHit> {
    let [a, b, c] = corners;
    let mut best = None;

    if let Some(t) = ray_triangle_intersect(origin, direction, a, b, c, tol) {
        best = Some(NearestHit { triangle, t });
    }
    if let Some(t) = ray_triangle_intersect(origin, &-direction, a, b, c, tol) {
        NearestHit::keep_nearest(&mut best, NearestHit { triangle, t: -t });
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smaller_distance_wins() {
        let near = NearestHit { triangle: 7, t: -0.5 };
        let far = NearestHit { triangle: 1, t: 1.0 };
        assert!(near.beats(&far));
        assert!(!far.beats(&near));
    }

    #[test]
    fn test_equal_distance_lower_index_wins() {
        let a = NearestHit { triangle: 2, t: 1.0 };
        let b = NearestHit { triangle: 5, t: -1.0 };
        assert!(a.beats(&b));
        assert!(!b.beats(&a));
    }

    #[test]
    fn test_same_triangle_forward_wins() {
        let fwd = NearestHit { triangle: 3, t: 1.0 };
        let back = NearestHit { triangle: 3, t: -1.0 };
        assert!(fwd.beats(&back));
        assert!(!back.beats(&fwd));
    }

    #[test]
    fn test_keep_nearest() {
        let mut best = None;
        NearestHit::keep_nearest(&mut best, NearestHit { triangle: 4, t: 2.0 });
        NearestHit::keep_nearest(&mut best, NearestHit { triangle: 9, t: 3.0 });
        NearestHit::keep_nearest(&mut best, NearestHit { triangle: 1, t: -2.0 });
        assert_eq!(best, Some(NearestHit { triangle: 1, t: -2.0 }));
    }

    #[test]
    fn test_bidirectional_finds_backward_hit() {
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let origin = Point3::new(0.25, 0.25, 1.0);
        let hit = bidirectional_hit(&origin, &Vec3::z(), 0, &corners, &BakeTolerance::DEFAULT);
        let hit = hit.unwrap();
        assert!((hit.t + 1.0).abs() < 1e-12);
    }
}
