//! Records: the entities held by a collection.
//!
//! A record is a flat JSON object. Three keys are lifted into typed fields
//! because the engine relies on them:
//!
//! - `id` - stable unique identifier
//! - `user_id` - owner / workspace identifier
//! - `created_at` - creation time, used for newest-first ordering
//!
//! Everything else lives in [`Record::fields`] untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::types::RecordId;

const ID_KEY: &str = "id";
const OWNER_KEY: &str = "user_id";
const CREATED_AT_KEY: &str = "created_at";

/// A domain entity in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,

    #[serde(rename = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record with a freshly generated id.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self::with_id(RecordId::generate(), fields)
    }

    /// Create a record with a given id.
    pub fn with_id(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        let mut record = Self {
            id: id.into(),
            owner_id: None,
            created_at: None,
            fields: Map::new(),
        };
        record.apply_patch(&Patch(fields));
        record
    }

    /// Build a record from an arbitrary JSON object.
    ///
    /// A missing `id` is replaced by a freshly generated one; anything that
    /// is not an object is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut object = match value {
            Value::Object(map) => map,
            other => {
                return Err(CoreError::MalformedRecord(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        let id = match object.remove(ID_KEY) {
            Some(Value::String(s)) if !s.is_empty() => RecordId::new(s),
            Some(Value::Number(n)) => RecordId::new(n.to_string()),
            None | Some(Value::Null) => RecordId::generate(),
            Some(other) => {
                return Err(CoreError::MalformedRecord(format!(
                    "unsupported id value {}",
                    other
                )))
            }
        };

        Ok(Self::with_id(id, object))
    }

    /// Convert into a flat JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// The `name` field, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Read an arbitrary field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Builder-style field setter.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.apply_patch(&Patch::single(key, value));
        self
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner_id = Some(owner.into());
        self
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Shallow-merge a patch into this record.
    ///
    /// `id` is never changed by a patch. `user_id` and `created_at` update
    /// the typed fields; an unparseable timestamp clears `created_at`.
    pub fn apply_patch(&mut self, patch: &Patch) {
        for (key, value) in patch.iter() {
            match key.as_str() {
                ID_KEY => {}
                OWNER_KEY => self.owner_id = value.as_str().map(str::to_string),
                CREATED_AT_KEY => {
                    self.created_at = value
                        .as_str()
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                        .map(|dt| dt.with_timezone(&Utc));
                }
                _ => {
                    self.fields.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// A set of field updates merged into a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(pub Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn single(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().with(key, value)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Sort records by `created_at`, newest first.
///
/// Records without a timestamp sort last; ties keep their relative order.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
