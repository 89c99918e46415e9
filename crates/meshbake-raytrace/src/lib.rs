#![warn(missing_docs)]

//! Ray generation and nearest-hit queries for the meshbake baker.
//!
//! # Architecture
//!
//! - [`raster`] - walks the low-detail quad list and emits one ray per texel
//! - [`intersect`] - ray/triangle and barycentric math under one tolerance policy
//! - [`Bvh`] - SAH bounding volume hierarchy over the high-detail triangles
//! - [`gpu`] - wgpu nearest-hit kernel fed with the flattened BVH (feature `gpu`)
//!
//! Every query in this crate is bidirectional: a texel's ray is probed
//! along its direction and against it, and the hit with the smallest
//! `|t|` wins. Backends only report the winning triangle index, or
//! [`NO_HIT`].
//!
//! # Example
//!
//! ```ignore
//! use meshbake_raytrace::{raster::rasterize_quads, Bvh};
//!
//! let rays = rasterize_quads(&low, 512, 1e-6)?;
//! let bvh = Bvh::build(&high);
//! let hit = bvh.nearest_hit(&rays.origins[0], &rays.directions[0], &tolerance);
//! ```

mod aabb;
mod ray;
pub mod bvh;
pub mod intersect;
pub mod raster;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use aabb::Aabb3;
pub use bvh::Bvh;
pub use intersect::NearestHit;
pub use raster::{BakeRaySet, RasterError};
pub use ray::Ray;

/// Triangle index reported for a texel whose ray hit nothing.
pub const NO_HIT: u32 = u32::MAX;
