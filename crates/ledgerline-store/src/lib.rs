//! # Ledgerline Store
//!
//! Durable local persistence for the Ledgerline sync engine.
//!
//! ## Overview
//!
//! Everything is built on a tiny synchronous key→string contract,
//! [`KvStore`], so the engine works over SQLite on a device and over a plain
//! map in tests. On top of it sit the two per-collection structures the sync
//! controller needs:
//!
//! - [`SnapshotStore`] - last-known visible state of each collection
//! - [`Outbox`] - FIFO log of mutations not yet confirmed by the remote
//!
//! ## Key Types
//!
//! - [`KvStore`] - The persistence trait
//! - [`SqliteKv`] - SQLite-backed implementation
//! - [`MemoryKv`] - In-memory implementation for tests
//! - [`KeyLayout`] - Key prefixes for snapshots and outboxes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ledgerline_core::CollectionName;
//! use ledgerline_store::{KeyLayout, Outbox, SnapshotStore, SqliteKv};
//!
//! let kv = Arc::new(SqliteKv::open("ledgerline.db").unwrap());
//! let layout = KeyLayout::default();
//! let snapshots = SnapshotStore::new(kv.clone(), &layout);
//! let outbox = Outbox::new(kv, &layout);
//!
//! let categories = CollectionName::new("categories").unwrap();
//! let visible = snapshots.load(&categories, &[]);
//! let pending = outbox.drain(&categories).unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **Synchronous**: persistence never suspends; only remote calls do
//! - **No cross-key transactions**: a snapshot and an outbox are written
//!   independently
//! - **Mid-flush safety**: [`Outbox::commit`] merges by operation token, so an
//!   operation enqueued while a flush is running survives the commit

pub mod error;
pub mod memory;
pub mod migration;
pub mod outbox;
pub mod snapshot;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryKv;
pub use outbox::Outbox;
pub use snapshot::SnapshotStore;
pub use sqlite::SqliteKv;
pub use traits::{KeyLayout, KvStore};
