//! Nearest-hit backends.
//!
//! Every backend follows the same contract: rasterize the low-detail mesh
//! into per-texel rays, probe each ray in both directions against the
//! high-detail triangles, and report the nearest triangle index per texel
//! or [`SENTINEL`]. Backends never compute hit geometry; that is left to
//! the [resolver](crate::resolve).

mod accelerated;
mod cpu;

pub use accelerated::AcceleratedBaker;
pub use cpu::CpuBaker;

use meshbake_mesh::Mesh;
use meshbake_raytrace::raster::rasterize_quads;
use meshbake_raytrace::{BakeRaySet, NO_HIT};

use crate::config::{BackendKind, BakeConfig};
use crate::error::{BakeError, Result};

/// Triangle index stored for texels whose ray hit nothing.
pub const SENTINEL: u32 = NO_HIT;

/// Output of one backend run.
///
/// Borrows both meshes; the resolver reads them back to recompute hits.
#[derive(Debug, Clone)]
pub struct BakeResult<'a> {
    /// Texture width in texels.
    pub width: u32,
    /// Texture height in texels.
    pub height: u32,
    /// Nearest triangle of `mesh2` per texel, or [`SENTINEL`].
    pub baked_indices: Vec<u32>,
    /// The rays that were traced.
    pub rays: BakeRaySet,
    /// Low-detail mesh the rays came from.
    pub mesh1: &'a Mesh,
    /// High-detail mesh the rays were traced against.
    pub mesh2: &'a Mesh,
}

impl BakeResult<'_> {
    /// Number of texels with a hit.
    pub fn hit_count(&self) -> usize {
        self.baked_indices.iter().filter(|&&i| i != SENTINEL).count()
    }
}

/// A nearest-hit backend.
///
/// Instances hold no geometry between calls. One instance must not run
/// overlapping bakes; use one instance per thread instead.
pub trait Baker {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Trace `mesh1`'s texels against `mesh2` at `resolution x resolution`.
    fn bake<'a>(&self, mesh1: &'a Mesh, mesh2: &'a Mesh, resolution: i32)
        -> Result<BakeResult<'a>>;
}

/// Create the backend selected by `config`.
///
/// Fails with a configuration error when no backend is selected.
pub fn create_baker(config: &BakeConfig) -> Result<Box<dyn Baker>> {
    config.validate()?;
    match config.backend {
        BackendKind::None => Err(BakeError::Configuration(
            "no bake backend selected".into(),
        )),
        BackendKind::Cpu => Ok(Box::new(CpuBaker::new(config))),
        BackendKind::Accelerated => Ok(Box::new(AcceleratedBaker::new(config))),
    }
}

/// Validate inputs and build the ray set shared by every backend.
pub(crate) fn prepare_rays(
    mesh1: &Mesh,
    mesh2: &Mesh,
    resolution: i32,
    origin_offset: f64,
) -> Result<BakeRaySet> {
    if resolution <= 0 {
        return Err(BakeError::Data(format!(
            "bake resolution must be positive, got {resolution}"
        )));
    }

    mesh2.validate_triangles()?;
    let degenerate = mesh2.degenerate_triangle_count();
    if degenerate == mesh2.num_triangles() {
        return Err(BakeError::Data(format!(
            "mesh '{}' has only degenerate triangles",
            mesh2.name
        )));
    }
    if degenerate > 0 {
        log::debug!("'{}' has {} degenerate triangles", mesh2.name, degenerate);
    }

    let rays = rasterize_quads(mesh1, resolution, origin_offset)?;
    log::info!(
        "baking '{}' ({} quads) onto '{}' ({} triangles) at {}x{}: {} rays",
        mesh1.name,
        mesh1.num_quads(),
        mesh2.name,
        mesh2.num_triangles(),
        resolution,
        resolution,
        rays.ray_count()
    );
    Ok(rays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BakeErrorKind;
    use meshbake_math::{Point2, Point3, Vec3};
    use meshbake_mesh::shapes::{quad_grid, triangulated_plane};
    use meshbake_mesh::Vertex;

    #[test]
    fn test_no_backend_is_configuration_error() {
        let err = create_baker(&BakeConfig::default()).err().unwrap();
        assert_eq!(err.kind(), BakeErrorKind::Configuration);
    }

    #[test]
    fn test_factory_kinds() {
        let cpu = create_baker(&BakeConfig::new(BackendKind::Cpu)).unwrap();
        assert_eq!(cpu.kind(), BackendKind::Cpu);
        let gpu = create_baker(&BakeConfig::new(BackendKind::Accelerated)).unwrap();
        assert_eq!(gpu.kind(), BackendKind::Accelerated);
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let mut config = BakeConfig::new(BackendKind::Cpu);
        config.threads = Some(0);
        assert!(create_baker(&config).is_err());
    }

    #[test]
    fn test_prepare_rejects_resolution() {
        let low = quad_grid("low", 1.0, 0.0, 1, 4);
        let high = triangulated_plane("high", [0.0, 0.0], [1.0, 1.0], 1.0, 1);
        for res in [0, -1, i32::MIN] {
            let err = prepare_rays(&low, &high, res, 0.0).unwrap_err();
            assert_eq!(err.kind(), BakeErrorKind::Data);
        }
    }

    #[test]
    fn test_prepare_rejects_empty_high_mesh() {
        let low = quad_grid("low", 1.0, 0.0, 1, 4);
        let err = prepare_rays(&low, &Mesh::new("empty"), 4, 0.0).unwrap_err();
        assert_eq!(err.kind(), BakeErrorKind::Data);
    }

    #[test]
    fn test_prepare_rejects_degenerate_high_mesh() {
        let low = quad_grid("low", 1.0, 0.0, 1, 4);
        let v = |x: f64| Vertex::new(Point3::new(x, 0.0, 0.0), Vec3::z(), Point2::origin());
        let high = Mesh::from_parts("line", vec![v(0.0), v(1.0), v(2.0)], vec![0, 1, 2]);
        let err = prepare_rays(&low, &high, 4, 0.0).unwrap_err();
        assert_eq!(err.kind(), BakeErrorKind::Data);
    }

    #[test]
    fn test_prepare_builds_rays() {
        let low = quad_grid("low", 1.0, 0.0, 2, 2);
        let high = triangulated_plane("high", [0.0, 0.0], [1.0, 1.0], 1.0, 1);
        let rays = prepare_rays(&low, &high, 4, 1e-6).unwrap();
        assert_eq!(rays.ray_count(), 16);
    }
}
