//! Persistence errors.

use thiserror::Error;

/// Errors that can occur during persistence operations.
///
/// Any of these is a persistence failure: fatal to the call that triggered
/// it, while in-memory state is left as it was.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored value could not be encoded or decoded.
    #[error("stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The file layout could not be brought up to date.
    #[error("kv layout: {0}")]
    Migration(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
