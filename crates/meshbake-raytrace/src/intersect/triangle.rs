//! Ray-triangle intersection and barycentric coordinates.
//!
//! Both routines read their epsilons from a [`BakeTolerance`]. Directions
//! are expected to be unit length so that `t` is a distance.

use meshbake_math::{BakeTolerance, Point3, Vec3};

/// Möller–Trumbore ray-triangle intersection.
///
/// Returns the ray parameter `t` of the hit, or `None` when:
///
/// - the triangle is degenerate or the ray is parallel to its plane
///   (`|det| < det_eps`)
/// - a barycentric weight falls outside `[0, 1]` by more than `bary_eps`
/// - the hit lies at or behind `t_min`
#[inline]
pub fn ray_triangle_intersect(
    origin: &Point3,
    direction: &Vec3,
    v0: &Point3,
    v1: &Point3,
    v2: &Point3,
    tol: &BakeTolerance,
) -> Option<f64> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let p = direction.cross(&edge2);
    let det = edge1.dot(&p);

    if tol.is_degenerate(det) {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - v0;
    let u = s.dot(&p) * inv_det;
    if !tol.weight_in_range(u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = direction.dot(&q) * inv_det;
    if v < -tol.bary_eps || u + v > 1.0 + tol.bary_eps {
        return None;
    }

    let t = edge2.dot(&q) * inv_det;
    (t > tol.t_min).then_some(t)
}

/// Signed parameter at which the ray meets the triangle's plane.
///
/// Unlike [`ray_triangle_intersect`] this ignores the triangle's extent and
/// the `t_min` cutoff; it is used to measure distance to a triangle that a
/// backend has already reported.
pub fn ray_plane_parameter(
    origin: &Point3,
    direction: &Vec3,
    v0: &Point3,
    v1: &Point3,
    v2: &Point3,
    tol: &BakeTolerance,
) -> Option<f64> {
    let normal = (v1 - v0).cross(&(v2 - v0));
    let denom = normal.dot(direction);
    if tol.is_degenerate(denom) {
        return None;
    }
    Some(normal.dot(&(v0 - origin)) / denom)
}

/// Barycentric coordinates of `p` with respect to `(v0, v1, v2)`.
///
/// Weights come from the signed areas of the sub-triangles opposite each
/// vertex, then go through [`clamp_barycentric`]. A zero-area triangle
/// yields `[0, 0, 0]`.
pub fn compute_barycentric(
    v0: &Point3,
    v1: &Point3,
    v2: &Point3,
    p: &Point3,
    tol: &BakeTolerance,
) -> [f64; 3] {
    let normal = (v1 - v0).cross(&(v2 - v0));
    let area = normal.norm();
    if area == 0.0 || !area.is_finite() {
        return [0.0; 3];
    }

    let signed = |a: &Point3, b: &Point3| -> f64 {
        let sub = (a - p).cross(&(b - p));
        let magnitude = sub.norm() / area;
        if normal.dot(&sub) < 0.0 {
            -magnitude
        } else {
            magnitude
        }
    };

    let mut bary = [signed(v1, v2), signed(v2, v0), signed(v0, v1)];
    clamp_barycentric(&mut bary, tol);
    bary
}

/// Snap weights that overshoot `[0, 1]` by less than `bary_eps`, then
/// rescale so the weights sum to one.
pub fn clamp_barycentric(bary: &mut [f64; 3], tol: &BakeTolerance) {
    for w in bary.iter_mut() {
        *w = tol.snap_weight(*w);
    }
    let sum: f64 = bary.iter().sum();
    if sum > 0.0 {
        for w in bary.iter_mut() {
            *w /= sum;
        }
    }
}
