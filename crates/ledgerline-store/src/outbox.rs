//! Outbox queue: the durable FIFO of mutations awaiting remote confirmation.
//!
//! A flush pass works in three steps: [`Outbox::drain`] reads the current
//! queue, the caller replays each entry remotely, then [`Outbox::commit`]
//! writes back what failed. Commit does not blindly overwrite the queue:
//! entries appended after the drain are kept behind the retained ones.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use ledgerline_core::{CollectionName, OpId, QueuedOperation};

use crate::error::{Result, StoreError};
use crate::migration::now_millis;
use crate::traits::{KeyLayout, KvStore};

/// Persistent per-collection operation queue.
pub struct Outbox {
    kv: Arc<dyn KvStore>,
    layout: KeyLayout,
    /// Serializes read-modify-write cycles on queue keys.
    lock: Mutex<()>,
}

impl Outbox {
    pub fn new(kv: Arc<dyn KvStore>, layout: &KeyLayout) -> Self {
        Self {
            kv,
            layout: layout.clone(),
            lock: Mutex::new(()),
        }
    }

    /// Append an operation and persist the queue.
    pub fn enqueue(&self, collection: &CollectionName, op: QueuedOperation) -> Result<()> {
        let _guard = self.guard()?;
        let mut queue = self.read(collection)?;
        debug!(
            collection = %collection,
            op_id = %op.op_id,
            kind = op.operation.kind(),
            position = queue.len(),
            "enqueued operation"
        );
        queue.push(op);
        self.write(collection, &queue)
    }

    /// Current queue, oldest first. The queue itself is left untouched.
    pub fn drain(&self, collection: &CollectionName) -> Result<Vec<QueuedOperation>> {
        let _guard = self.guard()?;
        self.read(collection)
    }

    /// Persist the outcome of a flush pass.
    ///
    /// `drained` is what the matching [`drain`](Self::drain) returned and
    /// `remaining` the subset that failed. The new queue is `remaining`
    /// followed by every stored entry that was not part of `drained`.
    pub fn commit(
        &self,
        collection: &CollectionName,
        drained: &[QueuedOperation],
        remaining: Vec<QueuedOperation>,
    ) -> Result<()> {
        let _guard = self.guard()?;

        let drained_ids: HashSet<OpId> = drained.iter().map(|op| op.op_id).collect();
        let arrived: Vec<QueuedOperation> = self
            .read(collection)?
            .into_iter()
            .filter(|op| !drained_ids.contains(&op.op_id))
            .collect();

        debug!(
            collection = %collection,
            discarded = drained.len() - remaining.len().min(drained.len()),
            retained = remaining.len(),
            arrived = arrived.len(),
            "committed outbox"
        );

        let mut queue = remaining;
        queue.extend(arrived);
        self.write(collection, &queue)
    }

    /// Number of pending operations.
    pub fn len(&self, collection: &CollectionName) -> Result<usize> {
        let _guard = self.guard()?;
        Ok(self.read(collection)?.len())
    }

    pub fn is_empty(&self, collection: &CollectionName) -> Result<bool> {
        Ok(self.len(collection)? == 0)
    }

    /// Discard every pending operation.
    pub fn clear(&self, collection: &CollectionName) -> Result<()> {
        let _guard = self.guard()?;
        self.kv.remove(&self.layout.outbox_key(collection))
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("outbox: {}", e)))
    }

    /// A stored queue that no longer parses is moved to a side key and
    /// treated as empty, so later enqueues keep working.
    fn read(&self, collection: &CollectionName) -> Result<Vec<QueuedOperation>> {
        let key = self.layout.outbox_key(collection);
        let Some(raw) = self.kv.get(&key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(queue) => Ok(queue),
            Err(e) => {
                let aside = corrupt_key(&key);
                self.kv.set(&aside, &raw)?;
                self.kv.remove(&key)?;
                warn!(
                    collection = %collection,
                    error = %e,
                    moved_to = %aside,
                    "outbox corrupt, starting an empty queue"
                );
                Ok(Vec::new())
            }
        }
    }

    fn write(&self, collection: &CollectionName, queue: &[QueuedOperation]) -> Result<()> {
        let encoded = serde_json::to_string(queue)?;
        self.kv.set(&self.layout.outbox_key(collection), &encoded)
    }
}

/// Where an unreadable queue is kept for inspection.
fn corrupt_key(outbox_key: &str) -> String {
    format!("{}.corrupt.{}", outbox_key, now_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKv;
    use ledgerline_core::{Operation, Patch, Record, RecordId};
    use serde_json::Map;

    fn setup() -> (Arc<MemoryKv>, Outbox, CollectionName) {
        let kv = Arc::new(MemoryKv::new());
        let outbox = Outbox::new(kv.clone(), &KeyLayout::default());
        (kv, outbox, CollectionName::new("transactions").unwrap())
    }

    fn insert(id: &str) -> QueuedOperation {
        QueuedOperation::new(Operation::Insert(Record::with_id(id, Map::new())), 0)
    }

    fn ids(queue: &[QueuedOperation]) -> Vec<String> {
        queue
            .iter()
            .map(|op| op.operation.record_id().to_string())
            .collect()
    }

    #[test]
    fn test_enqueue_preserves_fifo() {
        let (_, outbox, tx) = setup();
        outbox.enqueue(&tx, insert("a")).unwrap();
        outbox
            .enqueue(
                &tx,
                QueuedOperation::new(
                    Operation::Update {
                        id: RecordId::from("a"),
                        patch: Patch::single("amount", 3),
                    },
                    0,
                ),
            )
            .unwrap();
        outbox
            .enqueue(&tx, QueuedOperation::new(Operation::Delete(RecordId::from("a")), 0))
            .unwrap();

        let kinds: Vec<_> = outbox
            .drain(&tx)
            .unwrap()
            .iter()
            .map(|op| op.operation.kind())
            .collect();
        assert_eq!(kinds, vec!["insert", "update", "delete"]);
    }

    #[test]
    fn test_drain_is_non_destructive() {
        let (_, outbox, tx) = setup();
        outbox.enqueue(&tx, insert("a")).unwrap();
        assert_eq!(outbox.drain(&tx).unwrap().len(), 1);
        assert_eq!(outbox.len(&tx).unwrap(), 1);
    }

    #[test]
    fn test_queue_survives_new_instance() {
        let (kv, outbox, tx) = setup();
        let op = insert("a");
        outbox.enqueue(&tx, op.clone()).unwrap();
        drop(outbox);

        let reopened = Outbox::new(kv, &KeyLayout::default());
        assert_eq!(reopened.drain(&tx).unwrap(), vec![op]);
    }

    #[test]
    fn test_commit_keeps_only_failures() {
        let (_, outbox, tx) = setup();
        for id in ["a", "b", "c"] {
            outbox.enqueue(&tx, insert(id)).unwrap();
        }
        let drained = outbox.drain(&tx).unwrap();
        outbox
            .commit(&tx, &drained, vec![drained[1].clone()])
            .unwrap();

        assert_eq!(ids(&outbox.drain(&tx).unwrap()), vec!["b"]);
    }

    #[test]
    fn test_commit_keeps_operations_enqueued_mid_flush() {
        let (_, outbox, tx) = setup();
        outbox.enqueue(&tx, insert("a")).unwrap();
        outbox.enqueue(&tx, insert("b")).unwrap();
        let drained = outbox.drain(&tx).unwrap();

        // arrives while the flush is talking to the remote
        outbox.enqueue(&tx, insert("late")).unwrap();

        outbox
            .commit(&tx, &drained, vec![drained[0].clone()])
            .unwrap();
        assert_eq!(ids(&outbox.drain(&tx).unwrap()), vec!["a", "late"]);
    }

    #[test]
    fn test_collections_are_isolated() {
        let (_, outbox, tx) = setup();
        let goals = CollectionName::new("goals").unwrap();
        outbox.enqueue(&tx, insert("a")).unwrap();
        assert!(outbox.is_empty(&goals).unwrap());
    }

    #[test]
    fn test_clear() {
        let (_, outbox, tx) = setup();
        outbox.enqueue(&tx, insert("a")).unwrap();
        outbox.clear(&tx).unwrap();
        assert!(outbox.is_empty(&tx).unwrap());
    }

    #[test]
    fn test_corrupt_queue_is_set_aside() {
        let (kv, outbox, tx) = setup();
        kv.set("sync_queue_transactions", "[{").unwrap();

        assert!(outbox.drain(&tx).unwrap().is_empty());
        assert_eq!(kv.get("sync_queue_transactions").unwrap(), None);
        let aside: Vec<String> = kv
            .keys()
            .into_iter()
            .filter(|k| k.starts_with("sync_queue_transactions.corrupt."))
            .collect();
        assert_eq!(aside.len(), 1);
        assert_eq!(kv.get(&aside[0]).unwrap().as_deref(), Some("[{"));
    }

    #[test]
    fn test_enqueue_after_corrupt_queue() {
        let (kv, outbox, tx) = setup();
        kv.set("sync_queue_transactions", "not a queue").unwrap();

        outbox.enqueue(&tx, insert("a")).unwrap();
        outbox.enqueue(&tx, insert("b")).unwrap();
        assert_eq!(ids(&outbox.drain(&tx).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_enqueue_fails_when_read_only() {
        let (kv, outbox, tx) = setup();
        kv.set_read_only(true);
        assert!(outbox.enqueue(&tx, insert("a")).is_err());
        kv.set_read_only(false);
        assert!(outbox.is_empty(&tx).unwrap());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn commit_never_loses_late_arrivals(
                total in 0usize..8,
                failed_mask in any::<u8>(),
                late in 0usize..4,
            ) {
                let (_, outbox, tx) = setup();
                for i in 0..total {
                    outbox.enqueue(&tx, insert(&format!("op{}", i))).unwrap();
                }
                let drained = outbox.drain(&tx).unwrap();
                for i in 0..late {
                    outbox.enqueue(&tx, insert(&format!("late{}", i))).unwrap();
                }

                let remaining: Vec<_> = drained
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| failed_mask & (1 << i) != 0)
                    .map(|(_, op)| op.clone())
                    .collect();
                let expected = remaining.len() + late;
                outbox.commit(&tx, &drained, remaining).unwrap();

                prop_assert_eq!(outbox.len(&tx).unwrap(), expected);
            }
        }
    }
}
