//! KvStore trait: the abstract interface for durable local persistence.
//!
//! One key per collection snapshot and one per collection outbox. Values are
//! JSON strings. Implementations include SQLite (primary) and in-memory (for
//! tests).

use serde::{Deserialize, Serialize};

use ledgerline_core::CollectionName;

use crate::error::Result;

/// Durable key→string store.
///
/// Calls are synchronous and expected to be fast. No atomicity is assumed
/// across different keys.
pub trait KvStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Key prefixes used for each collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyLayout {
    pub snapshot_prefix: String,
    pub outbox_prefix: String,
}

impl KeyLayout {
    pub fn snapshot_key(&self, collection: &CollectionName) -> String {
        format!("{}{}", self.snapshot_prefix, collection)
    }

    pub fn outbox_key(&self, collection: &CollectionName) -> String {
        format!("{}{}", self.outbox_prefix, collection)
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self {
            snapshot_prefix: "offline_".into(),
            outbox_prefix: "sync_queue_".into(),
        }
    }
}
