//! Turns per-texel triangle indices into displacement and normal maps.
//!
//! Backends only report which triangle was nearest. The resolver
//! recomputes the hit in f64 on the host: signed distance along the texel's
//! ray, barycentric weights, and the interpolated normal. When the host
//! cannot confirm a reported hit (the ray is parallel to the triangle's
//! plane, the triangle has zero area, or the hit point lies clearly outside
//! it) the host wins and the texel becomes a miss.

use meshbake_math::{normalize_or_zero, BakeTolerance, Vec3};
use meshbake_raytrace::intersect::{compute_barycentric, ray_plane_parameter};

use crate::backend::{BakeResult, SENTINEL};
use crate::maps::BakedMaps;

/// How far outside a triangle, in multiples of `bary_eps`, a recomputed hit
/// may land before the host rejects it.
const REJECT_SLACK: f64 = 2.0;

/// Counters from one resolve pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Texels with a confirmed hit.
    pub hits: usize,
    /// Texels with a ray but no reported hit.
    pub misses: usize,
    /// Texels whose reported hit the host could not confirm.
    pub rejected: usize,
}

/// Build displacement and normal maps from a backend result.
///
/// Displacement is measured from the low-detail surface: the ray origin
/// offset is added back. Misses keep zero displacement, a zero normal and
/// `valid == false`.
pub fn resolve_maps(result: &BakeResult<'_>, tol: &BakeTolerance) -> (BakedMaps, ResolveStats) {
    let mesh2 = result.mesh2;
    let rays = &result.rays;
    let mut maps = BakedMaps::new(result.mesh1.name.clone(), result.width, result.height);
    let mut stats = ResolveStats::default();

    for (i, &tri) in result.baked_indices.iter().enumerate() {
        if tri == SENTINEL {
            if rays.has_ray(i) {
                stats.misses += 1;
            }
            continue;
        }

        let hit = recompute_hit(mesh2, tri as usize, &rays.origins[i], &rays.directions[i], tol);
        let Some((t, normal)) = hit else {
            stats.rejected += 1;
            continue;
        };

        maps.displacement[i] = (t - rays.origin_offset) as f32;
        maps.normal[i] = [normal.x as f32, normal.y as f32, normal.z as f32];
        maps.valid[i] = true;
        stats.hits += 1;
    }

    if stats.rejected > 0 {
        log::warn!(
            "{} of {} reported hits on '{}' could not be confirmed on the host and were dropped",
            stats.rejected,
            stats.rejected + stats.hits,
            mesh2.name
        );
    }
    log::info!(
        "resolved '{}': {} hits, {} misses",
        maps.name,
        stats.hits,
        stats.misses
    );

    (maps, stats)
}

/// Signed `t` and interpolated unit normal for the ray hitting triangle `tri`.
fn recompute_hit(
    mesh: &meshbake_mesh::Mesh,
    tri: usize,
    origin: &meshbake_math::Point3,
    direction: &Vec3,
    tol: &BakeTolerance,
) -> Option<(f64, Vec3)> {
    if tri >= mesh.num_triangles() {
        return None;
    }
    let [a, b, c] = mesh.triangle(tri);
    let t = ray_plane_parameter(origin, direction, &a.position, &b.position, &c.position, tol)?;

    let p = origin + direction * t;
    let bary = compute_barycentric(&a.position, &b.position, &c.position, &p, tol);
    if bary == [0.0; 3] || bary.iter().any(|&w| w < -REJECT_SLACK * tol.bary_eps) {
        return None;
    }

    let normal = normalize_or_zero(&(a.normal * bary[0] + b.normal * bary[1] + c.normal * bary[2]));
    Some((t, normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Baker, CpuBaker};
    use crate::config::{BackendKind, BakeConfig};
    use approx::assert_relative_eq;
    use meshbake_math::Point3;
    use meshbake_mesh::shapes::{planar_quad, quad_grid, triangulated_plane};
    use meshbake_mesh::Mesh;
    use meshbake_raytrace::raster::rasterize_quads;

    const TOL: BakeTolerance = BakeTolerance::DEFAULT;

    fn bake(low: &Mesh, high: &Mesh, resolution: i32) -> (BakedMaps, ResolveStats) {
        let baker = CpuBaker::new(&BakeConfig::new(BackendKind::Cpu));
        let result = baker.bake(low, high, resolution).unwrap();
        resolve_maps(&result, &TOL)
    }

    fn unit_quad_low() -> Mesh {
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        planar_quad("low", corners, Vec3::z(), [0.0, 0.0], [3.0, 3.0])
    }

    #[test]
    fn test_plane_offset_by_one() {
        let low = unit_quad_low();
        let high = triangulated_plane("high", [-1.0, -1.0], [2.0, 2.0], 1.0, 3);
        let (maps, stats) = bake(&low, &high, 4);

        assert_eq!(stats.hits, 16);
        assert_eq!(stats.rejected, 0);
        for y in 0..4 {
            for x in 0..4 {
                let i = maps.index(x, y);
                assert!(maps.valid[i]);
                assert_relative_eq!(maps.displacement[i], 1.0, epsilon = 1e-6);
                assert_relative_eq!(maps.normal[i][2], 1.0, epsilon = 1e-6);
                assert_relative_eq!(maps.normal[i][0], 0.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_plane_behind_is_negative() {
        let low = unit_quad_low();
        let high = triangulated_plane("high", [-1.0, -1.0], [2.0, 2.0], -0.5, 2);
        let (maps, _) = bake(&low, &high, 4);
        for d in &maps.displacement {
            assert_relative_eq!(*d, -0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_gap_texels() {
        let low = quad_grid("low", 1.0, 0.0, 2, 2);
        let high = triangulated_plane("high", [-0.5, -0.5], [0.4, 1.5], 1.0, 2);
        let baker = CpuBaker::new(&BakeConfig::new(BackendKind::Cpu));
        let result = baker.bake(&low, &high, 4).unwrap();
        let (maps, stats) = resolve_maps(&result, &TOL);

        // Only the x = 0 texel column lies over the strip.
        assert_eq!(stats.hits, 4);
        assert_eq!(stats.misses, 12);
        for i in 0..maps.len() {
            if result.baked_indices[i] == SENTINEL {
                assert!(!maps.valid[i]);
                assert_eq!(maps.displacement[i], 0.0);
                assert_eq!(maps.normal[i], [0.0; 3]);
            } else {
                assert!(maps.valid[i]);
            }
        }
    }

    #[test]
    fn test_normal_interpolated_from_high_mesh() {
        let low = unit_quad_low();
        let mut high = triangulated_plane("high", [-1.0, -1.0], [2.0, 2.0], 1.0, 1);
        let tilted = Vec3::new(1.0, 0.0, 1.0).normalize();
        for v in &mut high.vertices {
            v.normal = tilted;
        }
        let (maps, _) = bake(&low, &high, 4);
        let n = maps.normal[maps.index(2, 1)];
        assert_relative_eq!(n[0], tilted.x as f32, epsilon = 1e-6);
        assert_relative_eq!(n[2], tilted.z as f32, epsilon = 1e-6);
    }

    #[test]
    fn test_unconfirmed_hit_is_rejected() {
        let low = unit_quad_low();
        let high = triangulated_plane("high", [5.0, 5.0], [6.0, 6.0], 1.0, 1);
        let rays = rasterize_quads(&low, 4, 0.0).unwrap();
        let result = BakeResult {
            width: 4,
            height: 4,
            // Pretend a backend reported triangle 0 everywhere.
            baked_indices: vec![0; 16],
            rays,
            mesh1: &low,
            mesh2: &high,
        };
        let (maps, stats) = resolve_maps(&result, &TOL);
        assert_eq!(stats.rejected, 16);
        assert_eq!(maps.valid_count(), 0);
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let low = unit_quad_low();
        let high = triangulated_plane("high", [-1.0, -1.0], [2.0, 2.0], 1.0, 1);
        let rays = rasterize_quads(&low, 4, 0.0).unwrap();
        let result = BakeResult {
            width: 4,
            height: 4,
            baked_indices: vec![99; 16],
            rays,
            mesh1: &low,
            mesh2: &high,
        };
        let (_, stats) = resolve_maps(&result, &TOL);
        assert_eq!(stats.rejected, 16);
    }
}
