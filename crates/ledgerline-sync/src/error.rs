//! Error types for the sync module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by a remote store.
///
/// The controller never propagates these: the affected operation stays
/// queued and is retried on the next trigger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The remote refused the operation (validation, constraint, auth).
    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request did not complete; the remote may or may not have
    /// applied it.
    #[error("network error: {0}")]
    Network(String),

    /// The remote is not reachable at all.
    #[error("remote unavailable")]
    Unavailable,
}

/// Result type for remote calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Why a pull or flush was skipped without touching the remote.
///
/// Not an error: the work is simply deferred to a later trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deferred {
    /// No signed-in session.
    IdentityMissing,
    /// The device reports it is offline.
    ConnectivityUnavailable,
}

/// Errors that escape the sync controller.
///
/// Only local persistence problems do; remote and connectivity failures are
/// turned into outcomes.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Snapshot or outbox persistence failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] ledgerline_store::StoreError),

    /// Invalid core value.
    #[error("core error: {0}")]
    Core(#[from] ledgerline_core::CoreError),

    /// A lock guarding visible state was poisoned.
    #[error("visible state lock poisoned")]
    Poisoned,
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
