//! The Engine: shared collaborators for one session.
//!
//! An engine owns what every collection needs (durable storage, the remote
//! store, the identity and connectivity gates, the schema registry and the
//! configuration) and opens collections on top of them.

use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::info;

use ledgerline_core::{CollectionName, SchemaRegistry};
use ledgerline_store::{KvStore, Outbox, SnapshotStore, SqliteKv};
use ledgerline_sync::{
    CollectionSpec, Connectivity, Gates, IdentityProvider, RemoteStore, SyncController,
};

use crate::collection::Collection;
use crate::config::EngineConfig;
use crate::error::{LedgerError, Result};
use crate::worker::{self, SyncCommand};

/// The main Engine struct.
pub struct Engine {
    kv: Arc<dyn KvStore>,
    remote: Arc<dyn RemoteStore>,
    gates: Gates,
    schema: Arc<SchemaRegistry>,
    config: EngineConfig,
    snapshots: SnapshotStore,
    outbox: Arc<Outbox>,
}

impl Engine {
    /// Create an engine over existing collaborators.
    ///
    /// Uses the built-in financial alias table; see
    /// [`with_schema`](Self::with_schema) to replace it.
    pub fn new(
        kv: Arc<dyn KvStore>,
        remote: Arc<dyn RemoteStore>,
        identity: Arc<dyn IdentityProvider>,
        connectivity: Arc<dyn Connectivity>,
        config: EngineConfig,
    ) -> Self {
        let snapshots = SnapshotStore::new(kv.clone(), &config.keys);
        let outbox = Arc::new(Outbox::new(kv.clone(), &config.keys));

        Self {
            kv,
            remote,
            gates: Gates::new(identity, connectivity),
            schema: Arc::new(SchemaRegistry::financial()),
            config,
            snapshots,
            outbox,
        }
    }

    /// Create an engine persisting to a SQLite database at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        remote: Arc<dyn RemoteStore>,
        identity: Arc<dyn IdentityProvider>,
        connectivity: Arc<dyn Connectivity>,
        config: EngineConfig,
    ) -> Result<Self> {
        let kv = Arc::new(SqliteKv::open(path)?);
        Ok(Self::new(kv, remote, identity, connectivity, config))
    }

    pub fn with_schema(mut self, schema: SchemaRegistry) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Open a collection and start its sync worker.
    ///
    /// Visible state is loaded from the last snapshot (or the collection's
    /// defaults). Must be called from within a Tokio runtime.
    pub fn collection(&self, spec: CollectionSpec) -> Result<Collection> {
        let runtime = Handle::try_current().map_err(|_| LedgerError::NoRuntime)?;

        let controller = Arc::new(SyncController::new(
            spec,
            self.remote.clone(),
            self.snapshots.clone(),
            self.outbox.clone(),
            self.gates.clone(),
            self.schema.clone(),
            self.config.sync.clone(),
        ));
        let commands = worker::spawn(controller.clone(), &runtime);

        info!(
            collection = %controller.name(),
            records = controller.records()?.len(),
            pending = controller.pending()?,
            "opened collection"
        );

        if self.config.sync.sync_on_open {
            commands
                .send(SyncCommand::Sync)
                .map_err(|_| LedgerError::WorkerStopped)?;
        }

        Ok(Collection::new(controller, commands))
    }

    /// Drop a collection's cached snapshot and pending operations.
    ///
    /// Meant for maintenance while the collection is closed; an open handle
    /// keeps its in-memory visible state.
    pub fn clear_collection(&self, name: &CollectionName) -> Result<()> {
        self.snapshots.clear(name)?;
        self.outbox.clear(name)?;
        info!(collection = %name, "cleared local collection data");
        Ok(())
    }
}
