//! StaleCleaner - best-effort registry removal of stale recipients

use std::sync::Arc;

use contracts::{CleanupMode, ConnectionRegistry, RecipientId};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, warn};

use crate::metrics::DispatchMetrics;

/// Issues one registry delete per stale outcome
///
/// A failed delete is logged and counted; it never changes the recipient's
/// outcome and never fails the broadcast.
pub struct StaleCleaner<R> {
    mode: CleanupMode,
    registry: Arc<R>,
    metrics: Arc<DispatchMetrics>,
    /// Every delete in flight, whichever mode spawned it
    tracker: TaskTracker,
    /// Held across one close/wait/reopen cycle of `drain`
    drain_lock: Arc<Mutex<()>>,
}

impl<R> Clone for StaleCleaner<R> {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            registry: Arc::clone(&self.registry),
            metrics: Arc::clone(&self.metrics),
            tracker: self.tracker.clone(),
            drain_lock: Arc::clone(&self.drain_lock),
        }
    }
}

impl<R: ConnectionRegistry + 'static> StaleCleaner<R> {
    pub fn new(mode: CleanupMode, registry: Arc<R>, metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            mode,
            registry,
            metrics,
            tracker: TaskTracker::new(),
            drain_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn mode(&self) -> CleanupMode {
        self.mode
    }

    /// Handle one stale recipient according to the configured mode
    ///
    /// The delete runs as a tracked task so an aborted broadcast cannot cut
    /// it short. `Sync` mode hands back the handle for the caller to await.
    pub fn on_stale(&self, id: &RecipientId) -> Option<JoinHandle<()>> {
        if let CleanupMode::Disabled = self.mode {
            debug!(connection = %id, "Stale connection left in registry (cleanup disabled)");
            return None;
        }

        let registry = Arc::clone(&self.registry);
        let metrics = Arc::clone(&self.metrics);
        let id = id.clone();
        let handle = self.tracker.spawn(async move {
            remove(&*registry, &id, &metrics).await;
        });

        match self.mode {
            CleanupMode::Sync => Some(handle),
            _ => None,
        }
    }

    /// Deletes not yet finished
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every delete spawned so far
    ///
    /// Concurrent callers take turns; each waits on a closed tracker.
    pub async fn drain(&self) {
        let _turn = self.drain_lock.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[instrument(name = "stale_cleanup", skip(registry, metrics), fields(connection = %id))]
async fn remove<R: ConnectionRegistry>(registry: &R, id: &RecipientId, metrics: &DispatchMetrics) {
    match registry.delete(id).await {
        Ok(()) => {
            metrics.record_cleanup(true);
            observability::record_cleanup(true);
            debug!("Stale connection removed");
        }
        Err(e) => {
            metrics.record_cleanup(false);
            observability::record_cleanup(false);
            warn!(error = %e, "Failed to remove stale connection");
        }
    }
}
