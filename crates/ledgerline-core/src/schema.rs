//! Versioned field-alias normalization.
//!
//! Older clients queued payloads with camelCase keys (`categoryId`,
//! `targetAmount`) that the remote schema does not accept. Each collection
//! kind owns an ordered list of migrations; a migration at version `N`
//! renames legacy keys to canonical ones. An operation normalized under
//! version `v` only needs the migrations with version greater than `v`.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::operation::Operation;
use crate::types::CollectionName;

/// One versioned step: a set of `legacy -> canonical` key renames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMigration {
    pub version: u32,
    pub renames: Vec<(String, String)>,
}

/// Migrations keyed by collection kind.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, Vec<SchemaMigration>>,
}

impl SchemaRegistry {
    /// A registry with no migrations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The aliases shipped with the finance app.
    pub fn financial() -> Self {
        Self::empty()
            .with_rename("transactions", 1, "categoryId", "category_id")
            .with_rename("goals", 1, "targetAmount", "target_amount")
            .with_rename("goals", 1, "currentAmount", "current_amount")
    }

    /// Register a rename at a given version.
    ///
    /// Renames sharing a version are grouped into one migration.
    pub fn with_rename(mut self, collection: &str, version: u32, legacy: &str, canonical: &str) -> Self {
        let migrations = self.tables.entry(collection.to_string()).or_default();
        match migrations.iter_mut().find(|m| m.version == version) {
            Some(m) => m.renames.push((legacy.to_string(), canonical.to_string())),
            None => {
                migrations.push(SchemaMigration {
                    version,
                    renames: vec![(legacy.to_string(), canonical.to_string())],
                });
                migrations.sort_by_key(|m| m.version);
            }
        }
        self
    }

    /// Latest schema version for a collection (0 when it has no migrations).
    pub fn current_version(&self, collection: &CollectionName) -> u32 {
        self.tables
            .get(collection.as_str())
            .and_then(|m| m.last())
            .map(|m| m.version)
            .unwrap_or(0)
    }

    /// Rewrite legacy keys in an operation's payload.
    ///
    /// Applies every migration newer than `from_version` and returns the
    /// version the operation is now normalized under. When both the legacy
    /// and the canonical key are present the legacy value replaces the
    /// canonical one: callers spread a stored row and then set the legacy
    /// key to the newly picked value.
    pub fn normalize(&self, collection: &CollectionName, operation: &mut Operation, from_version: u32) -> u32 {
        let current = self.current_version(collection);
        if from_version >= current {
            return from_version;
        }

        let Some(migrations) = self.tables.get(collection.as_str()) else {
            return from_version;
        };

        for migration in migrations.iter().filter(|m| m.version > from_version) {
            match operation {
                Operation::Insert(record) => rename_keys(&mut record.fields, &migration.renames),
                Operation::Update { patch, .. } => rename_keys(&mut patch.0, &migration.renames),
                Operation::Delete(_) => {}
            }
        }

        current
    }

    /// Rewrite legacy keys in a bare field map, from version 0.
    pub fn normalize_fields(&self, collection: &CollectionName, fields: &mut Map<String, Value>) -> u32 {
        let Some(migrations) = self.tables.get(collection.as_str()) else {
            return 0;
        };
        for migration in migrations {
            rename_keys(fields, &migration.renames);
        }
        self.current_version(collection)
    }
}

fn rename_keys(map: &mut Map<String, Value>, renames: &[(String, String)]) {
    for (legacy, canonical) in renames {
        if let Some(value) = map.remove(legacy) {
            map.insert(canonical.clone(), value);
        }
    }
}
