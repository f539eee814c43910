//! Local snapshot store: the durable mirror of each collection's visible
//! state.

use std::sync::Arc;

use tracing::{debug, warn};

use ledgerline_core::{CollectionName, Record};

use crate::error::Result;
use crate::traits::{KeyLayout, KvStore};

/// Persists whole visible states, one key per collection.
#[derive(Clone)]
pub struct SnapshotStore {
    kv: Arc<dyn KvStore>,
    layout: KeyLayout,
}

impl SnapshotStore {
    pub fn new(kv: Arc<dyn KvStore>, layout: &KeyLayout) -> Self {
        Self {
            kv,
            layout: layout.clone(),
        }
    }

    /// Load the last persisted state, or `defaults` if there is none.
    ///
    /// Never fails: an unreadable or corrupt snapshot is logged and treated
    /// as missing.
    pub fn load(&self, collection: &CollectionName, defaults: &[Record]) -> Vec<Record> {
        let key = self.layout.snapshot_key(collection);

        let raw = match self.kv.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return defaults.to_vec(),
            Err(e) => {
                warn!(collection = %collection, error = %e, "snapshot unreadable, using defaults");
                return defaults.to_vec();
            }
        };

        match serde_json::from_str::<Vec<Record>>(&raw) {
            Ok(records) => {
                debug!(collection = %collection, count = records.len(), "loaded snapshot");
                records
            }
            Err(e) => {
                warn!(collection = %collection, error = %e, "snapshot corrupt, using defaults");
                defaults.to_vec()
            }
        }
    }

    /// Overwrite the stored snapshot.
    pub fn save(&self, collection: &CollectionName, records: &[Record]) -> Result<()> {
        let encoded = serde_json::to_string(records)?;
        self.kv.set(&self.layout.snapshot_key(collection), &encoded)?;
        debug!(collection = %collection, count = records.len(), "saved snapshot");
        Ok(())
    }

    /// Drop the cached snapshot; the next load returns defaults.
    pub fn clear(&self, collection: &CollectionName) -> Result<()> {
        self.kv.remove(&self.layout.snapshot_key(collection))
    }
}
