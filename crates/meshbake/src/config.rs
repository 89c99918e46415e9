//! Bake configuration.
//!
//! A [`BakeConfig`] is an explicit value handed to
//! [`create_baker`](crate::create_baker). It can be built in code or loaded
//! from TOML:
//!
//! ```toml
//! backend = "cpu"
//! origin_offset = 1e-4
//! threads = 8
//!
//! [tolerance]
//! bary_eps = 1e-4
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use meshbake_math::BakeTolerance;
use serde::{Deserialize, Serialize};

use crate::error::{BakeError, Result};

/// Default distance rays start behind the low-detail surface.
///
/// Must stay well above `BakeTolerance::t_min`, or a high-detail surface
/// lying on the low-detail one is hit too close to the ray origin and lost.
pub const DEFAULT_ORIGIN_OFFSET: f64 = 1e-4;

/// Which nearest-hit backend runs the bake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// No backend; baking fails with a configuration error.
    #[default]
    None,
    /// Brute-force host backend.
    Cpu,
    /// BVH traversal on the GPU.
    Accelerated,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::None => "none",
            BackendKind::Cpu => "cpu",
            BackendKind::Accelerated => "accelerated",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = BakeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(BackendKind::None),
            "cpu" => Ok(BackendKind::Cpu),
            "accelerated" | "gpu" => Ok(BackendKind::Accelerated),
            other => Err(BakeError::Configuration(format!(
                "unknown backend '{other}' (expected none, cpu or accelerated)"
            ))),
        }
    }
}

/// Settings for one baker instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Active backend.
    pub backend: BackendKind,
    /// Distance ray origins are pulled back along `-normal`.
    pub origin_offset: f64,
    /// Intersection and barycentric tolerances.
    pub tolerance: BakeTolerance,
    /// Worker threads for the CPU backend; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::None,
            origin_offset: DEFAULT_ORIGIN_OFFSET,
            tolerance: BakeTolerance::DEFAULT,
            threads: None,
        }
    }
}

impl BakeConfig {
    /// Default settings with `backend` selected.
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Parse from a TOML string; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the numeric settings.
    pub fn validate(&self) -> Result<()> {
        if !self.origin_offset.is_finite() || self.origin_offset < 0.0 {
            return Err(BakeError::Configuration(format!(
                "origin_offset must be finite and non-negative, got {}",
                self.origin_offset
            )));
        }
        let tol = &self.tolerance;
        for (name, value) in [
            ("bary_eps", tol.bary_eps),
            ("det_eps", tol.det_eps),
            ("t_min", tol.t_min),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(BakeError::Configuration(format!(
                    "tolerance.{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.origin_offset > 0.0 && self.origin_offset <= tol.t_min {
            return Err(BakeError::Configuration(format!(
                "origin_offset ({}) must exceed tolerance.t_min ({})",
                self.origin_offset, tol.t_min
            )));
        }
        if self.threads == Some(0) {
            return Err(BakeError::Configuration("threads must be at least 1".into()));
        }
        Ok(())
    }
}
