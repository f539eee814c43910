//! # Ledgerline Core
//!
//! Pure primitives for the Ledgerline sync engine: records, collections,
//! queued operations and the field-alias schema registry.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Record`] - A domain entity with an id, an owner and free-form fields
//! - [`CollectionName`] - Validated name of an independently synced collection
//! - [`Operation`] / [`QueuedOperation`] - Pending mutations held in the outbox
//! - [`SchemaRegistry`] - Versioned legacy-field renames keyed by collection
//! - [`SnapshotDigest`] - Deterministic hash of a visible state
//!
//! ## Wire Shape
//!
//! Records serialize as flat JSON objects (`id`, `user_id`, `created_at`
//! plus every other field), which is also the shape persisted in snapshots.

pub mod digest;
pub mod error;
pub mod operation;
pub mod record;
pub mod schema;
pub mod types;

pub use digest::{snapshot_digest, SnapshotDigest};
pub use error::{CoreError, Result};
pub use operation::{Operation, QueuedOperation};
pub use record::{sort_newest_first, Patch, Record};
pub use schema::{SchemaMigration, SchemaRegistry};
pub use types::{CollectionName, OpId, RecordId};
