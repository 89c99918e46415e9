#![warn(missing_docs)]

//! Math types for the meshbake baker.
//!
//! Thin wrappers around nalgebra providing the point, vector and
//! direction types used by the rasterizer, the intersection routines and
//! the attribute resolver, plus the single tolerance policy every
//! intersection and barycentric test shares.

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D texel space.
pub type Point2 = nalgebra::Point2<f64>;

/// Squared length below which a vector is treated as zero.
const ZERO_NORM_SQUARED: f64 = 1e-24;

/// Normalize `v`, or return the zero vector when `v` has no usable length.
#[inline]
pub fn normalize_or_zero(v: &Vec3) -> Vec3 {
    let n2 = v.norm_squared();
    if n2 > ZERO_NORM_SQUARED {
        v / n2.sqrt()
    } else {
        Vec3::zeros()
    }
}

/// Tolerances shared by every intersection and barycentric routine.
///
/// The host intersection code, the BVH traversal and the GPU kernel all
/// read their epsilons from one value of this type, so a near-edge hit is
/// accepted or rejected the same way everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeTolerance {
    /// Slack on barycentric bounds; weights within this distance of
    /// `[0, 1]` are accepted and snapped onto the boundary.
    pub bary_eps: f64,
    /// Minimum determinant magnitude for a ray/triangle test; smaller values
    /// mean a degenerate triangle or a ray parallel to its plane.
    pub det_eps: f64,
    /// Hits at or below this ray parameter are rejected.
    pub t_min: f64,
}

impl BakeTolerance {
    /// Default bake tolerances.
    pub const DEFAULT: Self = Self {
        bary_eps: 1e-4,
        det_eps: 1e-8,
        t_min: 1e-6,
    };

    /// Check whether a barycentric weight lies in `[0, 1]` up to `bary_eps`.
    #[inline]
    pub fn weight_in_range(&self, w: f64) -> bool {
        w >= -self.bary_eps && w <= 1.0 + self.bary_eps
    }

    /// Snap a weight onto `0` or `1` when it overshoots by less than `bary_eps`.
    #[inline]
    pub fn snap_weight(&self, w: f64) -> f64 {
        if w < 0.0 && w > -self.bary_eps {
            0.0
        } else if w > 1.0 && w < 1.0 + self.bary_eps {
            1.0
        } else {
            w
        }
    }

    /// Check if a determinant is too small to intersect reliably.
    #[inline]
    pub fn is_degenerate(&self, det: f64) -> bool {
        det.abs() < self.det_eps
    }
}

impl Default for BakeTolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_or_zero() {
        let n = normalize_or_zero(&Vec3::new(0.0, 3.0, 4.0));
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(n.y, 0.6, epsilon = 1e-12);

        let z = normalize_or_zero(&Vec3::zeros());
        assert_eq!(z, Vec3::zeros());
    }

    #[test]
    fn test_snap_weight() {
        let tol = BakeTolerance::DEFAULT;
        assert_eq!(tol.snap_weight(-1e-5), 0.0);
        assert_eq!(tol.snap_weight(1.0 + 1e-5), 1.0);
        assert_eq!(tol.snap_weight(0.5), 0.5);
        // Outside the slack the weight is left alone.
        assert_eq!(tol.snap_weight(-0.1), -0.1);
    }

    #[test]
    fn test_weight_in_range() {
        let tol = BakeTolerance::DEFAULT;
        assert!(tol.weight_in_range(0.0));
        assert!(tol.weight_in_range(-5e-5));
        assert!(!tol.weight_in_range(-1e-3));
        assert!(!tol.weight_in_range(1.01));
    }

    #[test]
    fn test_degenerate_det() {
        let tol = BakeTolerance::DEFAULT;
        assert!(tol.is_degenerate(1e-12));
        assert!(tol.is_degenerate(-1e-12));
        assert!(!tol.is_degenerate(0.5));
    }

    #[test]
    fn test_tolerance_deserialize_partial() {
        let tol: BakeTolerance = serde_json::from_str(r#"{ "t_min": 0.001 }"#).unwrap();
        assert_eq!(tol.t_min, 0.001);
        assert_eq!(tol.bary_eps, BakeTolerance::DEFAULT.bary_eps);
    }
}
