//! GPU nearest-hit queries using wgpu compute shaders.
//!
//! The host builds the BVH, flattens it into [`GpuScene`], and the kernel
//! traverses it once per texel in both directions. The only thing read back
//! is one triangle index per texel.

mod buffers;
mod pipeline;
pub mod shaders;

pub use buffers::{pack_rays, GpuBakeParams, GpuBvhNode, GpuRay, GpuScene, GpuTriangle};
pub use pipeline::NearestHitPipeline;
