//! Error types for storage and cache provisioning.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for key-value store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors from a key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("store I/O error at {}: {source}", path.display())]
    Io {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The backing file is not a JSON object of strings.
    #[error("store file {} is corrupt: {source}", path.display())]
    Corrupt {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Errors raised while provisioning the remote context cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No server-side credential is configured. Not retryable.
    #[error("API key not configured on server")]
    MissingCredential,

    /// The reference dataset is missing from the deployment.
    #[error("idiom dataset not found at {}", path.display())]
    DatasetNotFound {
        /// Where the dataset was expected.
        path: PathBuf,
    },

    /// Upload or cache creation failed; `detail` carries the raw diagnostic.
    #[error("{message}: {detail}")]
    Provisioning {
        /// Short description of the failing step.
        message: String,
        /// Raw provider or transport detail.
        detail: String,
    },

    /// The descriptor could not be persisted.
    #[error(transparent)]
    Storage(#[from] StoreError),
}
