//! # Ledgerline Sync
//!
//! Pull/flush controller that converges a collection's local state with a
//! remote authoritative store.
//!
//! ## Overview
//!
//! Every local mutation is applied to visible state and queued durably
//! first. The [`SyncController`] later replays the queue against a
//! [`RemoteStore`] and pulls fresh state once everything went through. Both
//! passes are gated on a signed-in identity and on connectivity; when either
//! is missing the pass is deferred, not failed.
//!
//! ## Key Properties
//!
//! - **Optimistic**: visible state changes before any remote round trip
//! - **Durable intent**: queued operations survive restarts until applied
//! - **Retry, never surface**: remote failures keep the operation queued
//! - **Replay-safe inserts**: each queued insert carries its own
//!   idempotency key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ledgerline_core::{CollectionName, SchemaRegistry};
//! use ledgerline_store::{KeyLayout, MemoryKv, Outbox, SnapshotStore};
//! use ledgerline_sync::{
//!     CollectionSpec, ConnectivitySignal, Gates, Identity, MemoryRemote, SessionIdentity,
//!     SyncConfig, SyncController,
//! };
//!
//! async fn example() {
//!     let kv = Arc::new(MemoryKv::new());
//!     let layout = KeyLayout::default();
//!     let gates = Gates::new(
//!         SessionIdentity::signed_in(Identity::new("user-1")),
//!         ConnectivitySignal::new(true),
//!     );
//!
//!     let controller = SyncController::new(
//!         CollectionSpec::new(CollectionName::new("transactions").unwrap()),
//!         MemoryRemote::new(),
//!         SnapshotStore::new(kv.clone(), &layout),
//!         Arc::new(Outbox::new(kv, &layout)),
//!         gates,
//!         Arc::new(SchemaRegistry::financial()),
//!         SyncConfig::default(),
//!     );
//!
//!     let report = controller.flush().await.unwrap();
//!     println!("applied {} operations", report.applied);
//! }
//! ```
//!
//! ## Flush Flow
//!
//! ```text
//! Outbox          Controller               Remote
//!   |<--- drain ------|                       |
//!   |                 |---- insert/update --->|   (in order, failures kept)
//!   |<--- commit -----|                       |
//!   |                 |---- select ---------->|   (only if nothing kept)
//!   |                 |---- seed insert ----->|   (first pull, seeded kinds)
//! ```

pub mod controller;
pub mod error;
pub mod gate;
pub mod remote;
pub mod seeder;

pub use controller::{
    Activity, CollectionSpec, FlushReport, PullOutcome, PullPolicy, PullSummary, SyncConfig,
    SyncController, SyncPhase,
};
pub use error::{Deferred, RemoteError, RemoteResult, Result, SyncError};
pub use gate::{Connectivity, ConnectivitySignal, Gates, Identity, IdentityProvider, SessionIdentity};
pub use remote::{memory::MemoryRemote, memory::RemoteCall, OrderBy, RemoteStore};
pub use seeder::{SeedOutcome, Seeder, SeedingState};
