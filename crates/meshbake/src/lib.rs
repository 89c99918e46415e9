#![warn(missing_docs)]

//! Mesh-to-mesh displacement and normal map baking.
//!
//! For every texel of a low-detail, UV-mapped quad mesh (`mesh1`) a ray is
//! generated from the surface along its interpolated normal. The nearest
//! point where that ray, in either direction, meets a high-detail triangle
//! mesh (`mesh2`) becomes the texel's displacement and normal.
//!
//! # Architecture
//!
//! - [`backend`] - the [`Baker`] trait with a brute-force CPU backend and a
//!   GPU BVH backend, selected through [`create_baker`]
//! - [`resolve`] - recomputes each reported hit on the host and builds the maps
//! - [`padding`] - grows covered regions outward into uncovered texels
//! - [`curvature`] - per-vertex curvature of the displacement along quad edges
//!
//! # Example
//!
//! ```ignore
//! use meshbake::{bake_maps, BackendKind, BakeConfig};
//!
//! let config = BakeConfig::new(BackendKind::Cpu);
//! let (maps, stats) = bake_maps(&config, &low, &high, 1024)?;
//! println!("{} hits, {} misses", stats.hits, stats.misses);
//! ```

mod config;
mod error;

pub mod backend;
pub mod curvature;
pub mod maps;
pub mod padding;
pub mod resolve;

pub use backend::{create_baker, AcceleratedBaker, BakeResult, Baker, CpuBaker, SENTINEL};
pub use config::{BackendKind, BakeConfig, DEFAULT_ORIGIN_OFFSET};
pub use curvature::estimate_edge_curvature;
pub use error::{BakeError, BakeErrorKind, Result};
pub use maps::{BakedMaps, FloatImage, MapKind, MapWriter, MemoryWriter};
pub use padding::{pad_maps, Neighborhood};
pub use resolve::{resolve_maps, ResolveStats};

pub use meshbake_math::BakeTolerance;
pub use meshbake_mesh::Mesh;

/// Bake `mesh1` against `mesh2` with the backend in `config` and resolve
/// the result into maps.
pub fn bake_maps(
    config: &BakeConfig,
    mesh1: &Mesh,
    mesh2: &Mesh,
    resolution: i32,
) -> Result<(BakedMaps, ResolveStats)> {
    let baker = create_baker(config)?;
    let result = baker.bake(mesh1, mesh2, resolution)?;
    Ok(resolve_maps(&result, &config.tolerance))
}
