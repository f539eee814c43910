//! # Ledgerline
//!
//! Offline-first sync engine for collections of financial records.
//!
//! ## Overview
//!
//! Each collection (transactions, categories, goals, ...) keeps:
//!
//! - **Visible state**: the in-memory list callers read, updated
//!   optimistically on every mutation
//! - **Snapshot**: a durable mirror of visible state, so the app opens
//!   offline with the last known data
//! - **Outbox**: a durable FIFO of mutations the remote has not confirmed
//!
//! A background worker per collection flushes the outbox whenever there is
//! something to send, connectivity comes back, or a session starts, and
//! pulls a fresh copy from the remote once the outbox is clear.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ledgerline::{CollectionSpec, Engine, EngineConfig};
//! use ledgerline::core::{CollectionName, Record};
//! use ledgerline::store::MemoryKv;
//! use ledgerline::sync::{ConnectivitySignal, Identity, MemoryRemote, SessionIdentity};
//! use serde_json::json;
//!
//! async fn example() -> ledgerline::Result<()> {
//!     let engine = Engine::new(
//!         Arc::new(MemoryKv::new()),
//!         MemoryRemote::new(),
//!         SessionIdentity::signed_in(Identity::new("user-1")),
//!         ConnectivitySignal::new(true),
//!         EngineConfig::default(),
//!     );
//!
//!     let transactions =
//!         engine.collection(CollectionSpec::new(CollectionName::new("transactions")?))?;
//!
//!     // Visible immediately; sent to the remote in the background.
//!     let record = transactions.add_json(json!({ "amount": -42.5, "categoryId": "food" }))?;
//!     assert!(transactions.get(record.id.clone())?.is_some());
//!
//!     transactions.settled().await?;
//!     println!("{} pending", transactions.pending()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `ledgerline::core` - Records, operations, schema aliases
//! - `ledgerline::store` - Persistence, snapshots and the outbox
//! - `ledgerline::sync` - Remote store contract, gates, controller

pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
mod worker;

// Re-export component crates
pub use ledgerline_core as core;
pub use ledgerline_store as store;
pub use ledgerline_sync as sync;

// Re-export main types for convenience
pub use collection::Collection;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{LedgerError, Result};

// Re-export commonly used types
pub use ledgerline_core::{CollectionName, Patch, Record, RecordId};
pub use ledgerline_sync::{
    Activity, CollectionSpec, FlushReport, PullOutcome, PullPolicy, SyncConfig, SyncPhase,
};
