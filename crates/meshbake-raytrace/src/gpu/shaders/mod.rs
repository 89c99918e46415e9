//! WGSL shader sources.

/// Bidirectional nearest-hit compute kernel.
pub const NEAREST_HIT_SHADER: &str = include_str!("nearest_hit.wgsl");
