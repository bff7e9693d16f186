//! Error types surfaced by the index and its persistence seam.

/// Errors that can occur while building, querying, or persisting a [`crate::Graph`].
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unknown similarity metric: {0}")]
    InvalidMetric(String),

    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("duplicate id: {0}")]
    DuplicateId(u64),

    #[error("graph store not initialized")]
    DatabaseNotReady,

    #[error("graph invariant violated: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
