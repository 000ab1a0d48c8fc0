//! Error types for the idiom dataset.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for dataset operations.
pub type IdiomResult<T> = Result<T, IdiomError>;

/// Errors that can occur while loading the idiom dataset.
#[derive(Debug, Error)]
pub enum IdiomError {
    /// The dataset file does not exist.
    #[error("idiom dataset not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    /// The dataset file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A required column is missing from a CSV header.
    #[error("missing column: {0}")]
    MissingColumn(String),
}
