//! Error types for baking.

use meshbake_mesh::MeshError;
use meshbake_raytrace::RasterError;
use thiserror::Error;

/// Broad category of a [`BakeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeErrorKind {
    /// The baker was not set up correctly.
    Configuration,
    /// The input meshes or parameters cannot be baked.
    Data,
    /// The compute backend failed to set up or run.
    Backend,
}

/// Errors that abort a bake.
///
/// Per-ray degeneracies (parallel rays, zero-area triangles) are never
/// errors; they only turn one texel into a miss.
#[derive(Error, Debug)]
pub enum BakeError {
    /// No usable backend was configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A configuration file could not be read.
    #[error("cannot read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Input data cannot be baked.
    #[error("data error: {0}")]
    Data(String),

    /// A mesh failed validation.
    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),

    /// The backend failed to set up or run.
    #[error("backend error: {0}")]
    Backend(String),

    /// The GPU device reported an error.
    #[cfg(feature = "gpu")]
    #[error("GPU error: {0}")]
    Gpu(#[from] meshbake_gpu::GpuError),
}

impl BakeError {
    /// Category of this error.
    pub fn kind(&self) -> BakeErrorKind {
        match self {
            BakeError::Configuration(_) | BakeError::ConfigIo(_) | BakeError::ConfigParse(_) => {
                BakeErrorKind::Configuration
            }
            BakeError::Data(_) | BakeError::Mesh(_) => BakeErrorKind::Data,
            BakeError::Backend(_) => BakeErrorKind::Backend,
            #[cfg(feature = "gpu")]
            BakeError::Gpu(_) => BakeErrorKind::Backend,
        }
    }
}

impl From<RasterError> for BakeError {
    fn from(err: RasterError) -> Self {
        match err {
            RasterError::Mesh(mesh) => BakeError::Mesh(mesh),
            other => BakeError::Data(other.to_string()),
        }
    }
}

/// Result type for bake operations.
pub type Result<T> = std::result::Result<T, BakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_errors_are_data() {
        let err: BakeError = RasterError::InvalidResolution(0).into();
        assert_eq!(err.kind(), BakeErrorKind::Data);

        let err: BakeError = RasterError::Mesh(MeshError::Empty("m".into())).into();
        assert!(matches!(err, BakeError::Mesh(_)));
        assert_eq!(err.kind(), BakeErrorKind::Data);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            BakeError::Configuration("x".into()).kind(),
            BakeErrorKind::Configuration
        );
        assert_eq!(BakeError::Backend("x".into()).kind(), BakeErrorKind::Backend);
    }
}
