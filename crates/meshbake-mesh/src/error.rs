//! Error types for mesh validation and interchange.

use thiserror::Error;

/// Errors that can occur when validating or loading a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Mesh has no vertices or no indices.
    #[error("mesh '{0}' is empty")]
    Empty(String),

    /// Index count is not a multiple of the primitive size.
    #[error("index count {count} is not a multiple of {arity}")]
    IndexCount {
        /// Number of indices.
        count: usize,
        /// Expected group size.
        arity: usize,
    },

    /// An index points past the vertex list.
    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Position in the index list.
        position: usize,
        /// Offending index value.
        index: u32,
        /// Number of vertices.
        vertex_count: usize,
    },

    /// JSON (de)serialization failed.
    #[error("mesh JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
