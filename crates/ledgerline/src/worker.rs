//! Background sync worker, one per open collection.
//!
//! Mutations do their local work synchronously and then post a command
//! here; the worker runs the remote side. It also flushes when connectivity
//! comes back and syncs when a session appears. The worker exits once every
//! handle to its collection has been dropped.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use ledgerline_sync::SyncController;

/// Work posted to a collection's worker.
#[derive(Debug)]
pub(crate) enum SyncCommand {
    Pull,
    Flush,
    /// Flush, then pull if the outbox was already empty.
    Sync,
    /// Answered once every earlier command has been processed.
    Barrier(oneshot::Sender<()>),
}

pub(crate) fn spawn(
    controller: Arc<SyncController>,
    runtime: &Handle,
) -> mpsc::UnboundedSender<SyncCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    runtime.spawn(run(controller, rx));
    tx
}

async fn run(controller: Arc<SyncController>, mut commands: mpsc::UnboundedReceiver<SyncCommand>) {
    let mut online = controller.gates().connectivity.subscribe();
    let mut identity = controller.gates().identity.subscribe();
    let mut watch_online = true;
    let mut watch_identity = true;

    loop {
        tokio::select! {
            biased;

            changed = online.changed(), if watch_online => {
                if changed.is_err() {
                    watch_online = false;
                    continue;
                }
                let now_online = *online.borrow_and_update();
                if now_online && controller.config().sync_on_reconnect {
                    debug!(collection = %controller.name(), "connectivity restored");
                    flush(&controller).await;
                }
            }

            changed = identity.changed(), if watch_identity => {
                if changed.is_err() {
                    watch_identity = false;
                    continue;
                }
                let signed_in = identity.borrow_and_update().is_some();
                if signed_in {
                    debug!(collection = %controller.name(), "session changed");
                    sync(&controller).await;
                }
            }

            command = commands.recv() => match command {
                Some(SyncCommand::Pull) => pull(&controller).await,
                Some(SyncCommand::Flush) => flush(&controller).await,
                Some(SyncCommand::Sync) => sync(&controller).await,
                Some(SyncCommand::Barrier(done)) => {
                    let _ = done.send(());
                }
                None => break,
            },
        }
    }

    debug!(collection = %controller.name(), "sync worker stopped");
}

async fn pull(controller: &SyncController) {
    if let Err(e) = controller.pull().await {
        warn!(collection = %controller.name(), error = %e, "background pull failed");
    }
}

async fn flush(controller: &SyncController) {
    if let Err(e) = controller.flush().await {
        warn!(collection = %controller.name(), error = %e, "background flush failed");
    }
}

/// A flush that kept operations must not be followed by a pull: under
/// `PullPolicy::Replace` it would hide the writes still queued.
async fn sync(controller: &SyncController) {
    match controller.flush().await {
        Ok(report) if report.deferred.is_none() && report.drained == 0 => pull(controller).await,
        Ok(_) => {}
        Err(e) => warn!(collection = %controller.name(), error = %e, "background flush failed"),
    }
}
