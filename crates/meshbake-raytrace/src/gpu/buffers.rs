//! Packed layouts shared with the nearest-hit kernel.
//!
//! Every struct here mirrors a WGSL struct in `nearest_hit.wgsl`; field
//! order and padding must stay in sync with the shader.

use bytemuck::{Pod, Zeroable};
use meshbake_math::{BakeTolerance, Point3, Vec3};

use crate::bvh::Bvh;
use crate::BakeRaySet;

/// One triangle; `w` components are unused.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuTriangle {
    /// First corner.
    pub v0: [f32; 4],
    /// Second corner.
    pub v1: [f32; 4],
    /// Third corner.
    pub v2: [f32; 4],
}

/// Flattened BVH node.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuBvhNode {
    /// Lower corner, rounded down to f32.
    pub aabb_min: [f32; 4],
    /// Upper corner, rounded up to f32.
    pub aabb_max: [f32; 4],
    /// Left child index, or first entry in the leaf triangle list.
    pub left_or_first: u32,
    /// Right child index, or number of triangles in the leaf.
    pub right_or_count: u32,
    /// 1 for leaves.
    pub is_leaf: u32,
    /// Padding.
    pub _pad: u32,
}

/// One texel ray. `origin[3]` is 1 when the texel carries a ray.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuRay {
    /// Origin, plus the active flag in `w`.
    pub origin: [f32; 4],
    /// Unit direction.
    pub direction: [f32; 4],
}

/// Uniform parameters for one dispatch.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuBakeParams {
    /// Texture width in texels.
    pub width: u32,
    /// Texture height in texels.
    pub height: u32,
    /// Number of triangles in the scene.
    pub triangle_count: u32,
    /// Number of BVH nodes; 0 means every ray misses.
    pub node_count: u32,
    /// Barycentric slack.
    pub bary_eps: f32,
    /// Determinant cutoff.
    pub det_eps: f32,
    /// Minimum accepted ray parameter.
    pub t_min: f32,
    /// Padding.
    pub _pad: u32,
}

impl GpuBakeParams {
    /// Parameters for tracing `rays` against `scene`.
    pub fn new(rays: &BakeRaySet, scene: &GpuScene, tol: &BakeTolerance) -> Self {
        Self {
            width: rays.width,
            height: rays.height,
            triangle_count: scene.triangles.len() as u32,
            node_count: scene.nodes.len() as u32,
            bary_eps: tol.bary_eps as f32,
            det_eps: tol.det_eps as f32,
            t_min: tol.t_min as f32,
            _pad: 0,
        }
    }
}

/// Triangle soup and flattened BVH ready for upload.
#[derive(Debug, Clone, Default)]
pub struct GpuScene {
    /// Triangles in source mesh order; the kernel reports these indices.
    pub triangles: Vec<GpuTriangle>,
    /// BVH nodes; index 0 is the root.
    pub nodes: Vec<GpuBvhNode>,
    /// Triangle indices referenced by leaf ranges.
    pub leaf_triangles: Vec<u32>,
}

impl GpuScene {
    /// Pack a host BVH and the triangles it indexes.
    pub fn from_bvh(bvh: &Bvh) -> Self {
        let triangles = (0..bvh.triangle_count() as u32)
            .map(|i| {
                let [a, b, c] = bvh.triangle(i);
                GpuTriangle {
                    v0: point4(a),
                    v1: point4(b),
                    v2: point4(c),
                }
            })
            .collect();

        let flat = bvh.flatten();
        let nodes = flat
            .nodes
            .iter()
            .map(|(aabb, is_leaf, a, b)| GpuBvhNode {
                aabb_min: [round_down(aabb.min.x), round_down(aabb.min.y), round_down(aabb.min.z), 0.0],
                aabb_max: [round_up(aabb.max.x), round_up(aabb.max.y), round_up(aabb.max.z), 0.0],
                left_or_first: *a,
                right_or_count: *b,
                is_leaf: u32::from(*is_leaf),
                _pad: 0,
            })
            .collect();

        Self {
            triangles,
            nodes,
            leaf_triangles: flat.triangles,
        }
    }

    /// Total bytes of geometry to upload.
    pub fn byte_size(&self) -> u64 {
        (std::mem::size_of_val(self.triangles.as_slice())
            + std::mem::size_of_val(self.nodes.as_slice())
            + std::mem::size_of_val(self.leaf_triangles.as_slice())) as u64
    }
}

/// Pack a ray set; texels without a ray get an inactive entry.
pub fn pack_rays(rays: &BakeRaySet) -> Vec<GpuRay> {
    rays.origins
        .iter()
        .zip(&rays.directions)
        .map(|(o, d)| {
            let active = if *d == Vec3::zeros() { 0.0 } else { 1.0 };
            GpuRay {
                origin: [o.x as f32, o.y as f32, o.z as f32, active],
                direction: [d.x as f32, d.y as f32, d.z as f32, 0.0],
            }
        })
        .collect()
}

fn point4(p: &Point3) -> [f32; 4] {
    [p.x as f32, p.y as f32, p.z as f32, 0.0]
}

/// An f32 no greater than `x`.
fn round_down(x: f64) -> f32 {
    let f = x as f32;
    if f as f64 > x {
        f - ulp_bound(f)
    } else {
        f
    }
}

/// An f32 no less than `x`.
fn round_up(x: f64) -> f32 {
    let f = x as f32;
    if (f as f64) < x {
        f + ulp_bound(f)
    } else {
        f
    }
}

/// At least one ulp of `f`.
fn ulp_bound(f: f32) -> f32 {
    (f.abs() * f32::EPSILON).max(f32::MIN_POSITIVE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::rasterize_quads;
    use meshbake_mesh::shapes::{icosphere, planar_quad};

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<GpuTriangle>(), 48);
        assert_eq!(std::mem::size_of::<GpuBvhNode>(), 48);
        assert_eq!(std::mem::size_of::<GpuRay>(), 32);
        assert_eq!(std::mem::size_of::<GpuBakeParams>(), 32);
    }

    #[test]
    fn test_conservative_rounding() {
        let x = 0.1f64;
        assert!(round_down(x) as f64 <= x);
        assert!(round_up(x) as f64 >= x);
        assert_eq!(round_down(1.0), 1.0);
        assert_eq!(round_up(-2.0), -2.0);
    }

    #[test]
    fn test_scene_from_bvh() {
        let mesh = icosphere("s", Point3::origin(), 1.0, 1);
        let bvh = Bvh::build(&mesh);
        let scene = GpuScene::from_bvh(&bvh);

        assert_eq!(scene.triangles.len(), mesh.num_triangles());
        assert_eq!(scene.leaf_triangles.len(), mesh.num_triangles());
        assert!(!scene.nodes.is_empty());
        assert!(scene.nodes.iter().any(|n| n.is_leaf == 1));
        assert!(scene.byte_size() > 0);

        let root = &scene.nodes[0];
        for tri in &scene.triangles {
            for v in [tri.v0, tri.v1, tri.v2] {
                for axis in 0..3 {
                    assert!(v[axis] >= root.aabb_min[axis] && v[axis] <= root.aabb_max[axis]);
                }
            }
        }
    }

    #[test]
    fn test_pack_rays_flags_inactive_texels() {
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = planar_quad("q", corners, Vec3::z(), [0.0, 0.0], [1.0, 1.0]);
        let rays = rasterize_quads(&mesh, 4, 0.0).unwrap();
        let packed = pack_rays(&rays);

        assert_eq!(packed.len(), 16);
        assert_eq!(packed.iter().filter(|r| r.origin[3] == 1.0).count(), 4);
        assert_eq!(packed[0].direction[2], 1.0);
        assert_eq!(packed[rays.index(3, 3)].origin[3], 0.0);
    }

    #[test]
    fn test_params_from_tolerance() {
        let scene = GpuScene::default();
        let rays = BakeRaySet::empty(3, 2, 0.0);
        let params = GpuBakeParams::new(&rays, &scene, &BakeTolerance::DEFAULT);
        assert_eq!((params.width, params.height), (3, 2));
        assert_eq!(params.node_count, 0);
        assert_eq!(params.t_min, 1e-6f32);
    }
}
