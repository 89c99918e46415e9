//! Bounding volume hierarchy over the high-detail triangles.
//!
//! Built top-down with a bucketed surface area heuristic. The host uses it
//! directly for nearest-hit queries and flattens it for the GPU kernel.

use meshbake_math::{BakeTolerance, Dir3, Point3, Vec3};
use meshbake_mesh::Mesh;

use crate::intersect::{ray_triangle_intersect, NearestHit};
use crate::{Aabb3, Ray};

/// Triangles per leaf.
const MAX_LEAF_TRIANGLES: usize = 4;

/// SAH buckets per axis.
const NUM_BUCKETS: usize = 12;

/// Below this depth splits use SAH; deeper nodes split at the median so the
/// tree stays shallow enough for the fixed GPU traversal stack.
const MAX_SAH_DEPTH: usize = 24;

/// A flattened node: `(aabb, is_leaf, left_or_first, right_or_count)`.
///
/// Internal nodes store child indices; leaves store a range into
/// [`FlatBvh::triangles`].
pub type FlatBvhNode = (Aabb3, bool, u32, u32);

/// Array form of a [`Bvh`] for upload.
#[derive(Debug, Clone, Default)]
pub struct FlatBvh {
    /// Nodes in depth-first order; index 0 is the root.
    pub nodes: Vec<FlatBvhNode>,
    /// Triangle indices in leaf order.
    pub triangles: Vec<u32>,
}

/// A BVH node.
#[derive(Debug, Clone)]
pub enum BvhNode {
    /// Leaf holding triangle indices.
    Leaf {
        /// Bounds of the leaf's triangles.
        aabb: Aabb3,
        /// Indices into the source mesh's triangle list.
        triangles: Vec<u32>,
    },
    /// Internal node with two children.
    Internal {
        /// Bounds of both children.
        aabb: Aabb3,
        /// Left child.
        left: Box<BvhNode>,
        /// Right child.
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    /// Bounds of this node.
    pub fn aabb(&self) -> &Aabb3 {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

#[derive(Clone, Copy)]
struct TriangleRef {
    index: u32,
    aabb: Aabb3,
    centroid: Point3,
}

/// Bounding volume hierarchy over a triangle mesh.
#[derive(Debug, Clone)]
pub struct Bvh {
    root: Option<BvhNode>,
    corners: Vec<[Point3; 3]>,
}

impl Bvh {
    /// Build a BVH over the triangles of `mesh`.
    ///
    /// Indices must already be validated. Degenerate triangles are kept;
    /// the intersection test rejects them.
    pub fn build(mesh: &Mesh) -> Self {
        let corners: Vec<[Point3; 3]> = mesh.triangles().collect();

        let mut refs: Vec<TriangleRef> = corners
            .iter()
            .enumerate()
            .map(|(i, tri)| {
                let aabb = Aabb3::from_triangle(tri);
                TriangleRef {
                    index: i as u32,
                    aabb,
                    centroid: aabb.centroid(),
                }
            })
            .collect();

        let root = (!refs.is_empty()).then(|| build_node(&mut refs, 0));
        Self { root, corners }
    }

    /// Number of triangles indexed.
    pub fn triangle_count(&self) -> usize {
        self.corners.len()
    }

    /// Corner positions of triangle `index`.
    pub fn triangle(&self, index: u32) -> &[Point3; 3] {
        &self.corners[index as usize]
    }

    /// Length of the longest root-to-leaf path, counting nodes.
    pub fn depth(&self) -> usize {
        fn walk(node: &BvhNode) -> usize {
            match node {
                BvhNode::Leaf { .. } => 1,
                BvhNode::Internal { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }

    /// Closest hit along `ray` with `t > tol.t_min`.
    pub fn closest_hit(&self, ray: &Ray, tol: &BakeTolerance) -> Option<NearestHit> {
        let mut best = None;
        if let Some(root) = &self.root {
            self.closest_in_node(ray, root, tol, &mut best);
        }
        best
    }

    /// Nearest hit probing both along `direction` and against it.
    ///
    /// `direction` must be unit length; a zero direction never hits.
    /// Backward hits carry a negative `t`. Equivalent to testing every
    /// triangle with [`crate::intersect::bidirectional_hit`].
    pub fn nearest_hit(
        &self,
        origin: &Point3,
        direction: &Vec3,
        tol: &BakeTolerance,
    ) -> Option<NearestHit> {
        if *direction == Vec3::zeros() {
            return None;
        }
        let ray = Ray::from_unit(*origin, Dir3::new_unchecked(*direction));

        let mut best = self.closest_hit(&ray, tol);
        if let Some(back) = self.closest_hit(&ray.reversed(), tol) {
            NearestHit::keep_nearest(
                &mut best,
                NearestHit {
                    triangle: back.triangle,
                    t: -back.t,
                },
            );
        }
        best
    }

    fn closest_in_node(
        &self,
        ray: &Ray,
        node: &BvhNode,
        tol: &BakeTolerance,
        best: &mut Option<NearestHit>,
    ) {
        let Some((entry, _)) = ray.intersect_aabb(node.aabb()) else {
            return;
        };
        // Equal distances must still be visited so the lower index can win.
        if best.is_some_and(|b| entry > b.t) {
            return;
        }

        match node {
            BvhNode::Leaf { triangles, .. } => {
                let dir = ray.direction.into_inner();
                for &index in triangles {
                    let [a, b, c] = &self.corners[index as usize];
                    if let Some(t) = ray_triangle_intersect(&ray.origin, &dir, a, b, c, tol) {
                        NearestHit::keep_nearest(best, NearestHit { triangle: index, t });
                    }
                }
            }
            BvhNode::Internal { left, right, .. } => {
                let left_t = ray.intersect_aabb(left.aabb()).map(|(t, _)| t);
                let right_t = ray.intersect_aabb(right.aabb()).map(|(t, _)| t);
                let (first, second) = match (left_t, right_t) {
                    (Some(lt), Some(rt)) if rt < lt => (right, left),
                    _ => (left, right),
                };
                self.closest_in_node(ray, first, tol, best);
                self.closest_in_node(ray, second, tol, best);
            }
        }
    }

    /// Flatten into depth-first arrays.
    pub fn flatten(&self) -> FlatBvh {
        let mut flat = FlatBvh::default();
        if let Some(root) = &self.root {
            flatten_node(root, &mut flat);
        }
        flat
    }
}

fn flatten_node(node: &BvhNode, flat: &mut FlatBvh) -> u32 {
    let idx = flat.nodes.len();
    match node {
        BvhNode::Leaf { aabb, triangles } => {
            let first = flat.triangles.len() as u32;
            flat.triangles.extend_from_slice(triangles);
            flat.nodes.push((*aabb, true, first, triangles.len() as u32));
        }
        BvhNode::Internal { aabb, left, right } => {
            flat.nodes.push((*aabb, false, 0, 0));
            let l = flatten_node(left, flat);
            let r = flatten_node(right, flat);
            flat.nodes[idx].2 = l;
            flat.nodes[idx].3 = r;
        }
    }
    idx as u32
}

fn build_node(refs: &mut [TriangleRef], depth: usize) -> BvhNode {
    let mut bounds = Aabb3::empty();
    for r in refs.iter() {
        bounds.include_aabb(&r.aabb);
    }

    if refs.len() <= MAX_LEAF_TRIANGLES {
        return BvhNode::Leaf {
            aabb: bounds,
            triangles: refs.iter().map(|r| r.index).collect(),
        };
    }

    let sah_mid = if depth < MAX_SAH_DEPTH {
        find_best_split(refs, &bounds).map(|(axis, pos)| partition(refs, axis, pos))
    } else {
        None
    };

    let mid = match sah_mid {
        Some(mid) if mid > 0 && mid < refs.len() => mid,
        _ => median_split(refs, &bounds),
    };

    let (left, right) = refs.split_at_mut(mid);
    BvhNode::Internal {
        aabb: bounds,
        left: Box::new(build_node(left, depth + 1)),
        right: Box::new(build_node(right, depth + 1)),
    }
}

/// Best `(axis, position)` by bucketed SAH, or `None` when every centroid
/// falls in one bucket.
fn find_best_split(refs: &[TriangleRef], bounds: &Aabb3) -> Option<(usize, f64)> {
    let mut centroid_bounds = Aabb3::empty();
    for r in refs {
        centroid_bounds.include_point(&r.centroid);
    }

    let total_area = bounds.surface_area();
    let mut best: Option<(f64, usize, f64)> = None;

    for axis in 0..3 {
        let lo = centroid_bounds.min[axis];
        let extent = centroid_bounds.max[axis] - lo;
        if extent < 1e-12 {
            continue;
        }

        let mut counts = [0usize; NUM_BUCKETS];
        let mut boxes = [Aabb3::empty(); NUM_BUCKETS];
        for r in refs {
            let b = bucket(r.centroid[axis], lo, extent);
            counts[b] += 1;
            boxes[b].include_aabb(&r.aabb);
        }

        for split in 1..NUM_BUCKETS {
            let (mut left_box, mut right_box) = (Aabb3::empty(), Aabb3::empty());
            let (mut left_n, mut right_n) = (0, 0);
            for b in 0..NUM_BUCKETS {
                if counts[b] == 0 {
                    continue;
                }
                if b < split {
                    left_n += counts[b];
                    left_box.include_aabb(&boxes[b]);
                } else {
                    right_n += counts[b];
                    right_box.include_aabb(&boxes[b]);
                }
            }
            if left_n == 0 || right_n == 0 {
                continue;
            }

            let cost = if total_area > 0.0 {
                0.125
                    + (left_box.surface_area() * left_n as f64
                        + right_box.surface_area() * right_n as f64)
                        / total_area
            } else {
                (left_n as f64 - right_n as f64).abs()
            };

            if best.map_or(true, |(c, _, _)| cost < c) {
                let pos = lo + extent * split as f64 / NUM_BUCKETS as f64;
                best = Some((cost, axis, pos));
            }
        }
    }

    best.map(|(_, axis, pos)| (axis, pos))
}

#[inline]
fn bucket(c: f64, lo: f64, extent: f64) -> usize {
    (((c - lo) / extent * NUM_BUCKETS as f64) as usize).min(NUM_BUCKETS - 1)
}

fn partition(refs: &mut [TriangleRef], axis: usize, pos: f64) -> usize {
    let mut left = 0;
    let mut right = refs.len();
    while left < right {
        if refs[left].centroid[axis] < pos {
            left += 1;
        } else {
            right -= 1;
            refs.swap(left, right);
        }
    }
    left
}

/// Split at the median centroid along the longest axis.
fn median_split(refs: &mut [TriangleRef], bounds: &Aabb3) -> usize {
    let extent = bounds.max - bounds.min;
    let axis = extent.imax();
    let mid = refs.len() / 2;
    refs.select_nth_unstable_by(mid, |a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
    mid
}
