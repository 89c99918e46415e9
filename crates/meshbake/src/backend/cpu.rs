//! Brute-force host backend.

use std::time::Instant;

use meshbake_math::{BakeTolerance, Point3};
use meshbake_mesh::Mesh;
use meshbake_raytrace::intersect::bidirectional_hit;
use meshbake_raytrace::{BakeRaySet, NearestHit};
use rayon::prelude::*;

use super::{prepare_rays, BakeResult, Baker, SENTINEL};
use crate::config::{BackendKind, BakeConfig};
use crate::error::{BakeError, Result};

/// Tests every texel against every triangle, in parallel across texels.
#[derive(Debug, Clone)]
pub struct CpuBaker {
    tolerance: BakeTolerance,
    origin_offset: f64,
    threads: Option<usize>,
}

impl CpuBaker {
    /// Backend using the settings in `config`.
    pub fn new(config: &BakeConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            origin_offset: config.origin_offset,
            threads: config.threads,
        }
    }
}

impl Baker for CpuBaker {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn bake<'a>(
        &self,
        mesh1: &'a Mesh,
        mesh2: &'a Mesh,
        resolution: i32,
    ) -> Result<BakeResult<'a>> {
        let rays = prepare_rays(mesh1, mesh2, resolution, self.origin_offset)?;
        let triangles: Vec<[Point3; 3]> = mesh2.triangles().collect();

        let start = Instant::now();
        let baked_indices = match self.threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| BakeError::Backend(format!("cannot start worker pool: {e}")))?;
                pool.install(|| trace_all(&rays, &triangles, &self.tolerance))
            }
            None => trace_all(&rays, &triangles, &self.tolerance),
        };
        log::debug!(
            "cpu backend traced {} rays against {} triangles in {:.2?}",
            rays.ray_count(),
            triangles.len(),
            start.elapsed()
        );

        Ok(BakeResult {
            width: rays.width,
            height: rays.height,
            baked_indices,
            rays,
            mesh1,
            mesh2,
        })
    }
}

fn trace_all(rays: &BakeRaySet, triangles: &[[Point3; 3]], tol: &BakeTolerance) -> Vec<u32> {
    (0..rays.len())
        .into_par_iter()
        .map(|i| {
            if !rays.has_ray(i) {
                return SENTINEL;
            }
            nearest(&rays.origins[i], &rays.directions[i], triangles, tol)
                .map_or(SENTINEL, |hit| hit.triangle)
        })
        .collect()
}

fn nearest(
    origin: &Point3,
    direction: &meshbake_math::Vec3,
    triangles: &[[Point3; 3]],
    tol: &BakeTolerance,
) -> Option<NearestHit> {
    let mut best = None;
    for (i, corners) in triangles.iter().enumerate() {
        if let Some(hit) = bidirectional_hit(origin, direction, i as u32, corners, tol) {
            NearestHit::keep_nearest(&mut best, hit);
        }
    }
    best
}
