//! Error types for the engine facade.

use ledgerline_core::CoreError;
use ledgerline_store::StoreError;
use ledgerline_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Invalid record or collection name.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A collection was opened outside a Tokio runtime.
    #[error("no tokio runtime available to run the sync worker")]
    NoRuntime,

    /// The collection's background worker is gone.
    #[error("sync worker stopped")]
    WorkerStopped,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
