//! GPU backend: host-built BVH traversed by a wgpu compute kernel.
//!
//! Every call opens its own device, uploads the triangles and the flattened
//! BVH, dispatches one invocation per texel and reads back the index
//! buffer. Nothing survives the call. Setup failures are returned as
//! errors; there is no fallback to the CPU backend.

use meshbake_math::BakeTolerance;
use meshbake_mesh::Mesh;

use super::{prepare_rays, BakeResult, Baker};
use crate::config::{BackendKind, BakeConfig};
use crate::error::Result;

/// Nearest-hit queries on the GPU.
#[derive(Debug, Clone)]
pub struct AcceleratedBaker {
    tolerance: BakeTolerance,
    origin_offset: f64,
}

impl AcceleratedBaker {
    /// Backend using the settings in `config`.
    pub fn new(config: &BakeConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            origin_offset: config.origin_offset,
        }
    }
}

impl Baker for AcceleratedBaker {
    fn kind(&self) -> BackendKind {
        BackendKind::Accelerated
    }

    fn bake<'a>(
        &self,
        mesh1: &'a Mesh,
        mesh2: &'a Mesh,
        resolution: i32,
    ) -> Result<BakeResult<'a>> {
        let rays = prepare_rays(mesh1, mesh2, resolution, self.origin_offset)?;
        let baked_indices = gpu::trace(&rays, mesh2, &self.tolerance)?;

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

#[cfg(feature = "gpu")]
mod gpu {
    use std::time::Instant;

    use meshbake_gpu::GpuContext;
    use meshbake_math::BakeTolerance;
    use meshbake_mesh::Mesh;
    use meshbake_raytrace::gpu::{pack_rays, GpuBakeParams, GpuScene, NearestHitPipeline};
    use meshbake_raytrace::{BakeRaySet, Bvh};

    use crate::backend::SENTINEL;
    use crate::error::{BakeError, Result};

    pub(super) fn trace(rays: &BakeRaySet, mesh2: &Mesh, tol: &BakeTolerance) -> Result<Vec<u32>> {
        let start = Instant::now();
        let bvh = Bvh::build(mesh2);
        let scene = GpuScene::from_bvh(&bvh);
        log::debug!(
            "built BVH over {} triangles: {} nodes, depth {}, {} bytes to upload",
            bvh.triangle_count(),
            scene.nodes.len(),
            bvh.depth(),
            scene.byte_size()
        );

        let ctx = GpuContext::new_blocking()?;
        let pipeline = NearestHitPipeline::new(&ctx)?;
        let params = GpuBakeParams::new(rays, &scene, tol);
        let hits = pipeline.dispatch(&ctx, &scene, &pack_rays(rays), &params)?;

        let triangle_count = bvh.triangle_count() as u32;
        if let Some(bad) = hits.iter().find(|&&h| h != SENTINEL && h >= triangle_count) {
            return Err(BakeError::Backend(format!(
                "device reported triangle {bad} but the mesh has {triangle_count}"
            )));
        }

        log::debug!(
            "accelerated backend traced {} rays in {:.2?}",
            rays.ray_count(),
            start.elapsed()
        );
        Ok(hits)
    }
}

#[cfg(not(feature = "gpu"))]
mod gpu {
    use meshbake_math::BakeTolerance;
    use meshbake_mesh::Mesh;
    use meshbake_raytrace::BakeRaySet;

    use crate::error::{BakeError, Result};

    pub(super) fn trace(_rays: &BakeRaySet, _mesh2: &Mesh, _tol: &BakeTolerance) -> Result<Vec<u32>> {
        Err(BakeError::Backend(
            "accelerated backend unavailable: built without the `gpu` feature".into(),
        ))
    }
}
