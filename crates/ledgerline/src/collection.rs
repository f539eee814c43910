//! The collection handle: what application code talks to.
//!
//! Reads come straight from visible state. Mutations update visible state,
//! persist the snapshot and the outbox, and then hand the remote side to the
//! collection's background worker. Remote failures never come back through
//! this API; watch [`Collection::syncing`] or [`Collection::pending`]
//! instead.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use ledgerline_core::{CollectionName, Operation, Patch, Record, RecordId};
use ledgerline_sync::{Activity, FlushReport, PullOutcome, SyncController, SyncPhase};

use crate::error::{LedgerError, Result};
use crate::worker::SyncCommand;

/// Handle to one open collection. Clones share the same state and worker.
#[derive(Clone)]
pub struct Collection {
    controller: Arc<SyncController>,
    commands: mpsc::UnboundedSender<SyncCommand>,
}

impl Collection {
    pub(crate) fn new(
        controller: Arc<SyncController>,
        commands: mpsc::UnboundedSender<SyncCommand>,
    ) -> Self {
        Self {
            controller,
            commands,
        }
    }

    pub fn name(&self) -> &CollectionName {
        self.controller.name()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a record.
    ///
    /// The signed-in user is stamped as owner unless the record already
    /// names one, and `created_at` is set when missing. Returns the record
    /// as stored.
    pub fn add(&self, record: Record) -> Result<Record> {
        let mut record = record;
        if record.owner_id.is_none() {
            record.owner_id = self
                .controller
                .gates()
                .identity
                .current()
                .map(|identity| identity.user_id);
        }
        record.created_at.get_or_insert_with(Utc::now);

        let stored = self.controller.insert_local(record)?;
        self.after_mutation();
        Ok(stored)
    }

    /// Add a record given as a JSON object; a missing `id` is generated.
    pub fn add_json(&self, value: Value) -> Result<Record> {
        self.add(Record::from_value(value)?)
    }

    /// Merge `patch` into the record with this id.
    ///
    /// The update is queued even when the record is not visible locally.
    pub fn update(&self, id: impl Into<RecordId>, patch: Patch) -> Result<()> {
        let id = id.into();
        self.controller.apply_local(Operation::Update { id, patch })?;
        self.after_mutation();
        Ok(())
    }

    /// Remove the record with this id.
    pub fn remove(&self, id: impl Into<RecordId>) -> Result<()> {
        self.controller.apply_local(Operation::Delete(id.into()))?;
        self.after_mutation();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────

    /// Pull now, bypassing the worker queue.
    pub async fn refresh(&self) -> Result<PullOutcome> {
        Ok(self.controller.pull().await?)
    }

    /// Flush now, bypassing the worker queue.
    pub async fn flush(&self) -> Result<FlushReport> {
        Ok(self.controller.flush().await?)
    }

    /// Ask the worker to pull.
    pub fn request_pull(&self) -> Result<()> {
        self.send(SyncCommand::Pull)
    }

    /// Ask the worker to flush.
    pub fn request_flush(&self) -> Result<()> {
        self.send(SyncCommand::Flush)
    }

    /// Wait until the worker has processed everything requested so far.
    pub async fn settled(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SyncCommand::Barrier(tx))?;
        rx.await.map_err(|_| LedgerError::WorkerStopped)
    }

    /// Whether a pull or flush is in flight. Advisory only.
    pub fn syncing(&self) -> bool {
        self.controller.syncing()
    }

    pub fn subscribe_syncing(&self) -> watch::Receiver<Activity> {
        self.controller.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        self.controller.phase()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Visible state, newest first.
    pub fn records(&self) -> Result<Vec<Record>> {
        Ok(self.controller.records()?)
    }

    pub fn get(&self, id: impl Into<RecordId>) -> Result<Option<Record>> {
        Ok(self.controller.get(&id.into())?)
    }

    /// Operations not yet confirmed by the remote.
    pub fn pending(&self) -> Result<usize> {
        Ok(self.controller.pending()?)
    }

    pub fn seeding_done(&self) -> bool {
        self.controller.seeding_done()
    }

    /// The underlying controller, for callers that drive sync themselves.
    pub fn controller(&self) -> &Arc<SyncController> {
        &self.controller
    }

    fn after_mutation(&self) {
        if !self.controller.config().flush_on_mutation {
            return;
        }
        if self.send(SyncCommand::Flush).is_err() {
            debug!(collection = %self.name(), "worker gone, flush left for the next trigger");
        }
    }

    fn send(&self, command: SyncCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| LedgerError::WorkerStopped)
    }
}
