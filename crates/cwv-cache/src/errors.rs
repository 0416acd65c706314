//! Cache error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure at a specific path.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A payload could not be serialized.
    #[error("failed to serialize cache payload: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A stored JSON entry could not be parsed.
    #[error("corrupt cache entry at {location}: {source}")]
    Corrupt {
        /// Entry location.
        location: String,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
