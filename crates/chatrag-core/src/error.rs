use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Backend failure: {0}")]
    Backend(String),

    #[error("Embedding provider failure: {0}")]
    Embedding(String),

    #[error("Completion provider failure: {0}")]
    Completion(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl Error {
    /// Wrap any displayable backend error.
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
