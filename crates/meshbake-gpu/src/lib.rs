//! wgpu device context for meshbake.
//!
//! The accelerated baker opens a fresh context per bake and drops it when
//! the bake returns; nothing is cached across calls.

#![warn(missing_docs)]

mod context;

pub use context::{GpuContext, GpuError};
