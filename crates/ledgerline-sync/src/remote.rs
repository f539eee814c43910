//! Remote store abstraction.
//!
//! The remote is the authoritative table service. Its wire protocol is
//! opaque here: implementations may wrap a REST client, a database driver or
//! anything else. All calls are implicitly scoped to the signed-in identity.

use std::sync::Arc;

use async_trait::async_trait;

use ledgerline_core::{CollectionName, OpId, Patch, Record, RecordId};

use crate::error::RemoteResult;

/// Ordering requested from `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    /// `created_at` descending, newest first.
    #[default]
    CreatedDesc,
}

/// Remote store trait.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the whole collection.
    async fn select(&self, collection: &CollectionName, order: OrderBy) -> RemoteResult<Vec<Record>>;

    /// Insert one or more records.
    ///
    /// `idempotency_key` is set when replaying a queued insert; a remote that
    /// has already accepted the same key should succeed without inserting
    /// again.
    async fn insert(
        &self,
        collection: &CollectionName,
        records: &[Record],
        idempotency_key: Option<OpId>,
    ) -> RemoteResult<()>;

    /// Merge a patch into the record with the given id.
    async fn update(&self, collection: &CollectionName, id: &RecordId, patch: &Patch) -> RemoteResult<()>;

    /// Delete the record with the given id.
    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> RemoteResult<()>;
}

#[async_trait]
impl<R: RemoteStore + ?Sized> RemoteStore for Arc<R> {
    async fn select(&self, collection: &CollectionName, order: OrderBy) -> RemoteResult<Vec<Record>> {
        (**self).select(collection, order).await
    }

    async fn insert(
        &self,
        collection: &CollectionName,
        records: &[Record],
        idempotency_key: Option<OpId>,
    ) -> RemoteResult<()> {
        (**self).insert(collection, records, idempotency_key).await
    }

    async fn update(&self, collection: &CollectionName, id: &RecordId, patch: &Patch) -> RemoteResult<()> {
        (**self).update(collection, id, patch).await
    }

    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> RemoteResult<()> {
        (**self).delete(collection, id).await
    }
}

/// An in-memory remote store for testing.
///
/// Behaves like a table service with a primary key on `id`, and can inject
/// faults: transient network errors, rejections of specific records,
/// "accepted but the response was lost" failures, and a pause gate that
/// holds calls until released.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use chrono::Utc;
    use tokio::sync::watch;

    use crate::error::RemoteError;

    /// A call observed by the memory remote.
    #[derive(Debug, Clone, PartialEq)]
    pub enum RemoteCall {
        Select(CollectionName),
        Insert(CollectionName, Vec<RecordId>),
        Update(CollectionName, RecordId),
        Delete(CollectionName, RecordId),
    }

    #[derive(Default)]
    struct Inner {
        tables: HashMap<CollectionName, Vec<Record>>,
        seen_keys: HashSet<OpId>,
        calls: Vec<RemoteCall>,
        fail_next: usize,
        lose_response_next: usize,
        rejected_ids: HashSet<RecordId>,
        unavailable: bool,
    }

    /// In-memory remote store implementation.
    pub struct MemoryRemote {
        inner: Mutex<Inner>,
        /// `true` while calls may proceed.
        gate: watch::Sender<bool>,
        /// Number of calls currently parked at the gate.
        parked: watch::Sender<usize>,
    }

    impl MemoryRemote {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Put rows directly into a table, bypassing fault injection.
        pub fn seed(&self, collection: &CollectionName, records: Vec<Record>) {
            let mut inner = self.lock();
            inner
                .tables
                .entry(collection.clone())
                .or_default()
                .extend(records);
        }

        /// Raw rows of a table, in insertion order.
        pub fn rows(&self, collection: &CollectionName) -> Vec<Record> {
            self.lock()
                .tables
                .get(collection)
                .cloned()
                .unwrap_or_default()
        }

        /// Every call received so far, including failed ones.
        pub fn calls(&self) -> Vec<RemoteCall> {
            self.lock().calls.clone()
        }

        /// Number of insert calls received for a collection.
        pub fn insert_calls(&self, collection: &CollectionName) -> usize {
            self.lock()
                .calls
                .iter()
                .filter(|c| matches!(c, RemoteCall::Insert(name, _) if name == collection))
                .count()
        }

        /// Fail the next `n` calls with a network error, applying nothing.
        pub fn fail_next(&self, n: usize) {
            self.lock().fail_next = n;
        }

        /// Apply the next `n` writes, then report a network error anyway.
        pub fn lose_response_next(&self, n: usize) {
            self.lock().lose_response_next = n;
        }

        /// Reject every write touching `id` until [`clear_faults`](Self::clear_faults).
        pub fn reject_record(&self, id: impl Into<RecordId>) {
            self.lock().rejected_ids.insert(id.into());
        }

        /// Make every call fail with [`RemoteError::Unavailable`].
        pub fn set_unavailable(&self, unavailable: bool) {
            self.lock().unavailable = unavailable;
        }

        pub fn clear_faults(&self) {
            let mut inner = self.lock();
            inner.fail_next = 0;
            inner.lose_response_next = 0;
            inner.rejected_ids.clear();
            inner.unavailable = false;
        }

        /// Hold every subsequent call until [`resume`](Self::resume).
        pub fn pause(&self) {
            self.gate.send_replace(false);
        }

        pub fn resume(&self) {
            self.gate.send_replace(true);
        }

        /// Wait until at least `n` calls are parked behind [`pause`](Self::pause).
        pub async fn wait_for_parked(&self, n: usize) {
            let mut rx = self.parked.subscribe();
            let _ = rx.wait_for(|parked| *parked >= n).await;
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
            // A panic while holding this lock only happens inside a failing
            // test; keep serving the data regardless.
            self.inner.lock().unwrap_or_else(|e| e.into_inner())
        }

        async fn pass_gate(&self) {
            let mut rx = self.gate.subscribe();
            let open = *rx.borrow();
            if open {
                return;
            }
            self.parked.send_modify(|n| *n += 1);
            let _ = rx.wait_for(|open| *open).await;
            self.parked.send_modify(|n| *n -= 1);
        }

        /// Record the call and decide whether it fails before being applied.
        fn admit(&self, inner: &mut Inner, call: RemoteCall) -> RemoteResult<()> {
            inner.calls.push(call);
            if inner.unavailable {
                return Err(RemoteError::Unavailable);
            }
            if inner.fail_next > 0 {
                inner.fail_next -= 1;
                return Err(RemoteError::Network("injected failure".into()));
            }
            Ok(())
        }

        fn check_rejected(inner: &Inner, id: &RecordId) -> RemoteResult<()> {
            if inner.rejected_ids.contains(id) {
                return Err(RemoteError::Rejected {
                    status: 400,
                    message: format!("record {} rejected", id),
                });
            }
            Ok(())
        }

        /// After a write has been applied, maybe lose the response.
        fn respond(inner: &mut Inner) -> RemoteResult<()> {
            if inner.lose_response_next > 0 {
                inner.lose_response_next -= 1;
                return Err(RemoteError::Network("response lost".into()));
            }
            Ok(())
        }
    }

    impl Default for MemoryRemote {
        fn default() -> Self {
            Self {
                inner: Mutex::new(Inner::default()),
                gate: watch::channel(true).0,
                parked: watch::channel(0).0,
            }
        }
    }

    #[async_trait]
    impl RemoteStore for MemoryRemote {
        async fn select(&self, collection: &CollectionName, _order: OrderBy) -> RemoteResult<Vec<Record>> {
            self.pass_gate().await;
            let mut inner = self.lock();
            self.admit(&mut inner, RemoteCall::Select(collection.clone()))?;

            let mut rows = inner.tables.get(collection).cloned().unwrap_or_default();
            ledgerline_core::sort_newest_first(&mut rows);
            Ok(rows)
        }

        async fn insert(
            &self,
            collection: &CollectionName,
            records: &[Record],
            idempotency_key: Option<OpId>,
        ) -> RemoteResult<()> {
            self.pass_gate().await;
            let mut inner = self.lock();
            let ids = records.iter().map(|r| r.id.clone()).collect();
            self.admit(&mut inner, RemoteCall::Insert(collection.clone(), ids))?;

            if let Some(key) = idempotency_key {
                if inner.seen_keys.contains(&key) {
                    return Ok(());
                }
            }

            let table = inner.tables.get(collection);
            for record in records {
                Self::check_rejected(&inner, &record.id)?;
                if table.is_some_and(|rows| rows.iter().any(|r| r.id == record.id)) {
                    return Err(RemoteError::Rejected {
                        status: 409,
                        message: format!("duplicate key value violates unique constraint: {}", record.id),
                    });
                }
            }

            let now = Utc::now();
            let table = inner.tables.entry(collection.clone()).or_default();
            for record in records {
                let mut row = record.clone();
                row.created_at.get_or_insert(now);
                table.push(row);
            }
            if let Some(key) = idempotency_key {
                inner.seen_keys.insert(key);
            }

            Self::respond(&mut inner)
        }

        async fn update(&self, collection: &CollectionName, id: &RecordId, patch: &Patch) -> RemoteResult<()> {
            self.pass_gate().await;
            let mut inner = self.lock();
            self.admit(&mut inner, RemoteCall::Update(collection.clone(), id.clone()))?;
            Self::check_rejected(&inner, id)?;

            if let Some(row) = inner
                .tables
                .get_mut(collection)
                .and_then(|rows| rows.iter_mut().find(|r| &r.id == id))
            {
                row.apply_patch(patch);
            }

            Self::respond(&mut inner)
        }

        async fn delete(&self, collection: &CollectionName, id: &RecordId) -> RemoteResult<()> {
            self.pass_gate().await;
            let mut inner = self.lock();
            self.admit(&mut inner, RemoteCall::Delete(collection.clone(), id.clone()))?;
            Self::check_rejected(&inner, id)?;

            if let Some(rows) = inner.tables.get_mut(collection) {
                rows.retain(|r| &r.id != id);
            }

            Self::respond(&mut inner)
        }
    }
}
