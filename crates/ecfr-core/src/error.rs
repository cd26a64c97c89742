use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed record in {path}: {reason}")]
    MalformedRecord { path: PathBuf, reason: String },

    #[error("Corrupt artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index row and chunk list disagree.
    #[error("Row {row} is out of range for {len} chunks")]
    Desync { row: usize, len: usize },

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
