//! Storage error types

use thiserror::Error;

/// Errors that can occur while persisting an upload
#[derive(Debug, Error)]
pub enum StorageError {
    /// The destination file could not be created. Nothing was written.
    #[error("Failed to create {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing to an already-created destination failed.
    #[error("Failed to write: {0}")]
    Write(#[source] std::io::Error),

    /// The device ran out of space mid-write.
    #[error("Insufficient storage space")]
    DiskFull,

    /// The incoming byte stream failed before it was fully copied.
    #[error("Upload stream failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Storage error: {0}")]
    Other(String),
}
