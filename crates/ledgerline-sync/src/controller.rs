//! Per-collection sync controller.
//!
//! Owns a collection's visible state and drives the two remote passes:
//!
//! - **pull**: fetch the whole collection, replace visible state and the
//!   snapshot, then run the seeding pass for seed-eligible collections
//! - **flush**: replay the outbox against the remote in order, keep what
//!   failed, and pull once everything has been applied
//!
//! Remote and gate failures never escape as errors; they become outcomes and
//! the affected operations stay queued. Only local persistence errors are
//! returned.

use std::slice;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use ledgerline_core::{
    snapshot_digest, CollectionName, Operation, QueuedOperation, Record, RecordId,
    SchemaRegistry, SnapshotDigest,
};
use ledgerline_store::{Outbox, SnapshotStore};

use crate::error::{Deferred, RemoteError, RemoteResult, Result, SyncError};
use crate::gate::Gates;
use crate::remote::{OrderBy, RemoteStore};
use crate::seeder::{SeedOutcome, Seeder};

/// What to do with still-pending local operations when a pull lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullPolicy {
    /// The remote snapshot replaces visible state as-is. Unflushed local
    /// writes disappear from view until their flush succeeds.
    #[default]
    Replace,
    /// Queued operations are re-applied on top of the remote snapshot.
    ReapplyPending,
}

/// Configuration for sync behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub pull_policy: PullPolicy,
    /// Pull and flush when a collection is opened.
    pub sync_on_open: bool,
    /// Flush after every local mutation.
    pub flush_on_mutation: bool,
    /// Flush when connectivity comes back.
    pub sync_on_reconnect: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pull_policy: PullPolicy::Replace,
            sync_on_open: true,
            flush_on_mutation: true,
            sync_on_reconnect: true,
        }
    }
}

/// Static description of a collection.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub name: CollectionName,
    /// Visible state used when nothing has been persisted yet, and the
    /// baseline inserted by the seeding pass when `seed` is set.
    pub defaults: Vec<Record>,
    pub seed: bool,
}

impl CollectionSpec {
    pub fn new(name: CollectionName) -> Self {
        Self {
            name,
            defaults: Vec::new(),
            seed: false,
        }
    }

    pub fn with_defaults(mut self, defaults: Vec<Record>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Insert missing defaults remotely after the first pull.
    pub fn seeded(mut self) -> Self {
        self.seed = true;
        self
    }
}

/// Conceptual controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Pulling,
    Flushing,
}

/// Number of passes currently in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Activity {
    pub pulling: usize,
    pub flushing: usize,
}

impl Activity {
    pub fn is_syncing(&self) -> bool {
        self.pulling > 0 || self.flushing > 0
    }

    /// Flushing wins over pulling when both are running.
    pub fn phase(&self) -> SyncPhase {
        if self.flushing > 0 {
            SyncPhase::Flushing
        } else if self.pulling > 0 {
            SyncPhase::Pulling
        } else {
            SyncPhase::Idle
        }
    }
}

/// Counts a pass as in flight until dropped.
struct ActivityGuard<'a> {
    tx: &'a watch::Sender<Activity>,
    phase: SyncPhase,
}

impl<'a> ActivityGuard<'a> {
    fn begin(tx: &'a watch::Sender<Activity>, phase: SyncPhase) -> Self {
        tx.send_modify(|a| match phase {
            SyncPhase::Pulling => a.pulling += 1,
            SyncPhase::Flushing => a.flushing += 1,
            SyncPhase::Idle => {}
        });
        Self { tx, phase }
    }
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        let phase = self.phase;
        self.tx.send_modify(|a| match phase {
            SyncPhase::Pulling => a.pulling = a.pulling.saturating_sub(1),
            SyncPhase::Flushing => a.flushing = a.flushing.saturating_sub(1),
            SyncPhase::Idle => {}
        });
    }
}

/// Summary of a pull that reached the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct PullSummary {
    /// Records in visible state afterwards.
    pub records: usize,
    /// Records inserted by the seeding pass.
    pub seeded: usize,
    pub digest: SnapshotDigest,
    /// Whether visible state differs from before the pull.
    pub changed: bool,
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    Deferred(Deferred),
    /// The select failed; visible state is untouched.
    RemoteFailed(RemoteError),
    Pulled(PullSummary),
}

impl PullOutcome {
    pub fn summary(&self) -> Option<&PullSummary> {
        match self {
            PullOutcome::Pulled(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Result of a flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Set when the flush did not run.
    pub deferred: Option<Deferred>,
    /// Operations read from the outbox.
    pub drained: usize,
    /// Operations the remote accepted.
    pub applied: usize,
    /// Operations left queued for the next trigger.
    pub retained: usize,
    /// The follow-up pull, when every drained operation was applied.
    pub pull: Option<PullOutcome>,
}

impl FlushReport {
    fn deferred(reason: Deferred) -> Self {
        Self {
            deferred: Some(reason),
            ..Self::default()
        }
    }

    pub fn pulled(&self) -> bool {
        matches!(self.pull, Some(PullOutcome::Pulled(_)))
    }
}

/// Drives pull and flush for one collection.
pub struct SyncController {
    name: CollectionName,
    remote: Arc<dyn RemoteStore>,
    snapshots: SnapshotStore,
    outbox: Arc<Outbox>,
    gates: Gates,
    schema: Arc<SchemaRegistry>,
    config: SyncConfig,
    seeder: Option<Seeder>,
    visible: RwLock<Vec<Record>>,
    /// One flush at a time per collection.
    flush_lock: Mutex<()>,
    activity: watch::Sender<Activity>,
}

impl SyncController {
    /// Build a controller and load its visible state from the snapshot store.
    pub fn new(
        spec: CollectionSpec,
        remote: Arc<dyn RemoteStore>,
        snapshots: SnapshotStore,
        outbox: Arc<Outbox>,
        gates: Gates,
        schema: Arc<SchemaRegistry>,
        config: SyncConfig,
    ) -> Self {
        let visible = snapshots.load(&spec.name, &spec.defaults);
        let seeder = spec.seed.then(|| Seeder::new(spec.defaults));

        Self {
            name: spec.name,
            remote,
            snapshots,
            outbox,
            gates,
            schema,
            config,
            seeder,
            visible: RwLock::new(visible),
            flush_lock: Mutex::new(()),
            activity: watch::channel(Activity::default()).0,
        }
    }

    pub fn name(&self) -> &CollectionName {
        &self.name
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn gates(&self) -> &Gates {
        &self.gates
    }

    /// Apply a local mutation: update visible state, save the snapshot and
    /// enqueue the operation.
    ///
    /// The visible change stands even when persistence fails; the first
    /// persistence error is returned.
    pub fn apply_local(&self, operation: Operation) -> Result<QueuedOperation> {
        let mut operation = operation;
        let version = self.schema.normalize(&self.name, &mut operation, 0);
        let queued = QueuedOperation::new(operation, version);
        self.stage(&queued)?;
        Ok(queued)
    }

    /// [`apply_local`](Self::apply_local) for an insert; returns the record
    /// as staged.
    pub fn insert_local(&self, record: Record) -> Result<Record> {
        let mut record = record;
        let version = self.schema.normalize_fields(&self.name, &mut record.fields);
        self.stage(&QueuedOperation::new(Operation::Insert(record.clone()), version))?;
        Ok(record)
    }

    /// Fetch the remote collection and replace visible state with it.
    pub async fn pull(&self) -> Result<PullOutcome> {
        let identity = match self.gates.check() {
            Ok(identity) => identity,
            Err(reason) => {
                debug!(collection = %self.name, ?reason, "pull deferred");
                return Ok(PullOutcome::Deferred(reason));
            }
        };

        let _activity = ActivityGuard::begin(&self.activity, SyncPhase::Pulling);

        let remote_rows = match self.remote.select(&self.name, OrderBy::CreatedDesc).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(collection = %self.name, error = %e, "pull failed");
                return Ok(PullOutcome::RemoteFailed(e));
            }
        };

        let mut fresh = remote_rows.clone();
        if self.config.pull_policy == PullPolicy::ReapplyPending {
            for queued in self.outbox.drain(&self.name)? {
                queued.operation.apply_to(&mut fresh);
            }
        }
        let changed = self.replace_visible(fresh)?;

        let seeded = match &self.seeder {
            Some(seeder) => {
                let outcome = seeder
                    .reconcile(&self.name, self.remote.as_ref(), &identity, &remote_rows)
                    .await;
                self.absorb_seeded(&outcome)?
            }
            None => 0,
        };

        let (records, digest) = {
            let visible = self.read_visible()?;
            (visible.len(), snapshot_digest(&visible))
        };

        info!(
            collection = %self.name,
            records,
            seeded,
            changed,
            digest = %digest,
            "pulled collection"
        );

        Ok(PullOutcome::Pulled(PullSummary {
            records,
            seeded,
            digest,
            changed: changed || seeded > 0,
        }))
    }

    /// Replay the outbox against the remote.
    pub async fn flush(&self) -> Result<FlushReport> {
        if let Err(reason) = self.gates.check() {
            debug!(collection = %self.name, ?reason, "flush deferred");
            return Ok(FlushReport::deferred(reason));
        }

        let _serial = self.flush_lock.lock().await;
        let activity = ActivityGuard::begin(&self.activity, SyncPhase::Flushing);

        let drained = self.outbox.drain(&self.name)?;
        let mut report = FlushReport {
            drained: drained.len(),
            ..FlushReport::default()
        };
        if drained.is_empty() {
            return Ok(report);
        }

        let current = self.schema.current_version(&self.name);
        let mut remaining = Vec::new();
        for queued in &drained {
            let mut queued = queued.clone();
            if queued.schema_version < current {
                queued.schema_version =
                    self.schema
                        .normalize(&self.name, &mut queued.operation, queued.schema_version);
            }

            match self.replay(&queued).await {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!(
                        collection = %self.name,
                        op_id = %queued.op_id,
                        kind = queued.operation.kind(),
                        error = %e,
                        "operation failed, keeping it queued"
                    );
                    remaining.push(queued);
                }
            }
        }

        report.retained = remaining.len();
        self.outbox.commit(&self.name, &drained, remaining)?;

        info!(
            collection = %self.name,
            drained = report.drained,
            applied = report.applied,
            retained = report.retained,
            "flushed outbox"
        );

        drop(activity);
        if report.retained == 0 {
            report.pull = Some(self.pull().await?);
        }

        Ok(report)
    }

    /// Run the seeding pass against `snapshot`.
    ///
    /// A no-op once seeding has run in this process, and for collections
    /// that are not seed-eligible.
    pub async fn reconcile(&self, snapshot: &[Record]) -> Result<SeedOutcome> {
        let Some(seeder) = &self.seeder else {
            return Ok(SeedOutcome::NothingMissing);
        };
        let identity = match self.gates.check() {
            Ok(identity) => identity,
            Err(reason) => return Ok(SeedOutcome::Deferred(reason)),
        };

        let outcome = seeder
            .reconcile(&self.name, self.remote.as_ref(), &identity, snapshot)
            .await;
        self.absorb_seeded(&outcome)?;
        Ok(outcome)
    }

    /// Whether this process has already run the seeding pass.
    pub fn seeding_done(&self) -> bool {
        self.seeder.as_ref().is_some_and(|s| s.state().is_done())
    }

    /// Visible state, newest first.
    pub fn records(&self) -> Result<Vec<Record>> {
        Ok(self.read_visible()?.clone())
    }

    pub fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        Ok(self.read_visible()?.iter().find(|r| &r.id == id).cloned())
    }

    /// Number of operations waiting in the outbox.
    pub fn pending(&self) -> Result<usize> {
        Ok(self.outbox.len(&self.name)?)
    }

    pub fn syncing(&self) -> bool {
        self.activity.borrow().is_syncing()
    }

    pub fn phase(&self) -> SyncPhase {
        self.activity.borrow().phase()
    }

    pub fn subscribe(&self) -> watch::Receiver<Activity> {
        self.activity.subscribe()
    }

    fn stage(&self, queued: &QueuedOperation) -> Result<()> {
        let saved = {
            let mut visible = self.write_visible()?;
            queued.operation.apply_to(&mut visible);
            self.snapshots.save(&self.name, &visible)
        };
        let enqueued = self.outbox.enqueue(&self.name, queued.clone());

        saved?;
        enqueued?;
        Ok(())
    }

    async fn replay(&self, queued: &QueuedOperation) -> RemoteResult<()> {
        match &queued.operation {
            Operation::Insert(record) => {
                self.remote
                    .insert(&self.name, slice::from_ref(record), Some(queued.op_id))
                    .await
            }
            Operation::Update { id, patch } => self.remote.update(&self.name, id, patch).await,
            Operation::Delete(id) => self.remote.delete(&self.name, id).await,
        }
    }

    /// Returns whether the visible state changed.
    fn replace_visible(&self, records: Vec<Record>) -> Result<bool> {
        let mut visible = self.write_visible()?;
        let changed = snapshot_digest(&visible) != snapshot_digest(&records);
        *visible = records;
        self.snapshots.save(&self.name, &visible)?;
        Ok(changed)
    }

    /// Append seeded records to visible state; returns how many.
    fn absorb_seeded(&self, outcome: &SeedOutcome) -> Result<usize> {
        let inserted = outcome.inserted();
        if inserted.is_empty() {
            return Ok(0);
        }
        let mut visible = self.write_visible()?;
        visible.extend(inserted.iter().cloned());
        self.snapshots.save(&self.name, &visible)?;
        Ok(inserted.len())
    }

    fn read_visible(&self) -> Result<RwLockReadGuard<'_, Vec<Record>>> {
        self.visible.read().map_err(|_| SyncError::Poisoned)
    }

    fn write_visible(&self) -> Result<RwLockWriteGuard<'_, Vec<Record>>> {
        self.visible.write().map_err(|_| SyncError::Poisoned)
    }
}
