//! Pending mutations held in a collection's outbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{Patch, Record};
use crate::types::{OpId, RecordId};

/// A mutation to replay against the remote store.
///
/// Serialized adjacently tagged, e.g.
/// `{"type":"DELETE","payload":"c1"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "UPPERCASE")]
pub enum Operation {
    Insert(Record),
    Update { id: RecordId, patch: Patch },
    Delete(RecordId),
}

impl Operation {
    /// The record this operation targets.
    pub fn record_id(&self) -> &RecordId {
        match self {
            Operation::Insert(record) => &record.id,
            Operation::Update { id, .. } => id,
            Operation::Delete(id) => id,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Insert(_) => "insert",
            Operation::Update { .. } => "update",
            Operation::Delete(_) => "delete",
        }
    }

    /// Apply this operation to an in-memory visible state.
    ///
    /// Inserts are prepended (newest first); an insert whose id is already
    /// present replaces the existing record in place.
    pub fn apply_to(&self, records: &mut Vec<Record>) {
        match self {
            Operation::Insert(record) => {
                if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
                    *existing = record.clone();
                } else {
                    records.insert(0, record.clone());
                }
            }
            Operation::Update { id, patch } => {
                if let Some(existing) = records.iter_mut().find(|r| &r.id == id) {
                    existing.apply_patch(patch);
                }
            }
            Operation::Delete(id) => records.retain(|r| &r.id != id),
        }
    }
}

/// An operation as persisted in the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Token for this entry; also the idempotency key for insert replays.
    pub op_id: OpId,

    pub enqueued_at: DateTime<Utc>,

    /// Schema version the payload was normalized under.
    #[serde(default)]
    pub schema_version: u32,

    pub operation: Operation,
}

impl QueuedOperation {
    /// Wrap an operation with a fresh token.
    pub fn new(operation: Operation, schema_version: u32) -> Self {
        Self {
            op_id: OpId::generate(),
            enqueued_at: Utc::now(),
            schema_version,
            operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn rec(id: &str) -> Record {
        Record::with_id(id, Map::new())
    }

    #[test]
    fn test_operation_wire_shape() {
        let op = Operation::Delete(RecordId::from("c1"));
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"type": "DELETE", "payload": "c1"})
        );

        let op = Operation::Update {
            id: RecordId::from("c1"),
            patch: Patch::single("name", "Food"),
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"type": "UPDATE", "payload": {"id": "c1", "patch": {"name": "Food"}}})
        );
    }

    #[test]
    fn test_queued_operation_roundtrip_keeps_token() {
        let queued = QueuedOperation::new(Operation::Insert(rec("a").set("amount", 10)), 1);
        let json = serde_json::to_string(&queued).unwrap();
        let back: QueuedOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, queued);
    }

    #[test]
    fn test_apply_insert_prepends() {
        let mut records = vec![rec("a")];
        Operation::Insert(rec("b")).apply_to(&mut records);
        assert_eq!(records[0].id.as_str(), "b");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_apply_insert_existing_replaces() {
        let mut records = vec![rec("a"), rec("b")];
        Operation::Insert(rec("b").set("x", 1)).apply_to(&mut records);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_apply_update_and_delete() {
        let mut records = vec![rec("a"), rec("b")];
        Operation::Update {
            id: RecordId::from("a"),
            patch: Patch::single("amount", 5),
        }
        .apply_to(&mut records);
        assert_eq!(records[0].get("amount"), Some(&json!(5)));

        Operation::Update {
            id: RecordId::from("missing"),
            patch: Patch::single("amount", 5),
        }
        .apply_to(&mut records);
        assert_eq!(records.len(), 2);

        Operation::Delete(RecordId::from("b")).apply_to(&mut records);
        assert_eq!(records.len(), 1);
    }
}
