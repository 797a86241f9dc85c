//! FanoutDispatcher - bounded-parallel delivery of one message to a snapshot

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{self, JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    BroadcastResult, CleanupMode, ConnectionRegistry, DeliveryOutcome, DeliveryStatus,
    DispatcherSettings, Message, MessageTransport, RecipientId, RegistrySnapshot, TransportError,
};

use crate::cleanup::StaleCleaner;
use crate::error::DispatcherError;
use crate::metrics::DispatchMetrics;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum sends in flight per broadcast
    pub max_concurrency: usize,
    /// What to do with stale recipients
    pub cleanup: CleanupMode,
    /// Per-send deadline; expiry is a transient failure
    pub send_timeout: Option<Duration>,
    /// Whole-broadcast deadline; expiry returns a partial result
    pub broadcast_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from(&DispatcherSettings::default())
    }
}

impl From<&DispatcherSettings> for DispatcherConfig {
    fn from(settings: &DispatcherSettings) -> Self {
        Self {
            max_concurrency: settings.max_concurrency,
            cleanup: settings.cleanup,
            send_timeout: settings.send_timeout(),
            broadcast_timeout: settings.broadcast_timeout(),
        }
    }
}

/// Fans one message out to every recipient of a snapshot except the sender.
///
/// Each recipient gets its own task; a semaphore caps how many sends run at
/// once. Tasks share nothing mutable: each returns a tagged outcome that is
/// collected when the task is joined.
pub struct FanoutDispatcher<R, T> {
    config: DispatcherConfig,
    transport: Arc<T>,
    cleaner: StaleCleaner<R>,
    metrics: Arc<DispatchMetrics>,
}

impl<R, T> FanoutDispatcher<R, T>
where
    R: ConnectionRegistry + 'static,
    T: MessageTransport + 'static,
{
    /// Create a dispatcher over injected registry and transport handles
    ///
    /// # Errors
    /// `InvalidConfig` if `max_concurrency` is zero
    pub fn new(
        config: DispatcherConfig,
        registry: Arc<R>,
        transport: Arc<T>,
    ) -> Result<Self, DispatcherError> {
        if config.max_concurrency == 0 {
            return Err(DispatcherError::invalid_config(
                "max_concurrency",
                "must be >= 1",
            ));
        }

        let metrics = Arc::new(DispatchMetrics::new());
        let cleaner = StaleCleaner::new(config.cleanup, registry, Arc::clone(&metrics));

        Ok(Self {
            config,
            transport,
            cleaner,
            metrics,
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Wait for background stale cleanups spawned so far
    pub async fn drain_cleanup(&self) {
        self.cleaner.drain().await;
    }

    /// Deliver `message` to `snapshot` minus its sender
    ///
    /// Never fails: per-recipient errors are outcomes. Returns after every
    /// attempt reached a terminal state, or with a partial result if the
    /// configured broadcast timeout expires.
    pub async fn broadcast(&self, message: &Message, snapshot: &RegistrySnapshot) -> BroadcastResult {
        self.broadcast_with_cancel(message, snapshot, CancellationToken::new())
            .await
    }

    /// Same as [`broadcast`](Self::broadcast), stopping early when `cancel` fires
    ///
    /// On cancellation in-flight sends are aborted and unscheduled recipients
    /// are skipped. The result holds only finished attempts; stale cleanup for
    /// those keeps running in the background.
    #[instrument(
        name = "dispatcher_broadcast",
        skip_all,
        fields(sender = %message.sender(), snapshot = snapshot.len())
    )]
    pub async fn broadcast_with_cancel(
        &self,
        message: &Message,
        snapshot: &RegistrySnapshot,
        cancel: CancellationToken,
    ) -> BroadcastResult {
        let recipients = snapshot.delivery_set(message.sender());
        if recipients.is_empty() {
            debug!("No recipients besides the sender");
            return BroadcastResult::empty();
        }

        let started = Instant::now();
        let total = recipients.len();
        self.metrics.inc_broadcasts();

        let stop = stop_signal(cancel, self.config.broadcast_timeout);
        tokio::pin!(stop);

        let permits = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<task::Id, RecipientId> = HashMap::with_capacity(total);
        let mut outcomes = Vec::with_capacity(total);
        let mut deletes = Vec::new();
        let mut stopped = false;

        for recipient in recipients {
            let permit = tokio::select! {
                biased;
                _ = &mut stop => {
                    stopped = true;
                    break;
                }
                acquired = Arc::clone(&permits).acquire_owned() => match acquired {
                    Ok(permit) => permit,
                    Err(_) => {
                        error!("Delivery semaphore closed");
                        break;
                    }
                },
            };

            let attempt = self.attempt(recipient.clone(), message.clone(), permit);
            let handle = tasks.spawn(attempt);
            pending.insert(handle.id(), recipient);
        }

        if !stopped {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop => {
                        stopped = true;
                        break;
                    }
                    joined = tasks.join_next_with_id() => match joined {
                        Some(joined) => self.collect(joined, &mut pending, &mut outcomes, &mut deletes),
                        None => break,
                    },
                }
            }
        }

        let result = if stopped {
            // Aborted tasks resolve immediately; finished ones still count
            tasks.abort_all();
            while let Some(joined) = tasks.join_next_with_id().await {
                self.collect(joined, &mut pending, &mut outcomes, &mut deletes);
            }
            let abandoned = total - outcomes.len();
            warn!(
                completed = outcomes.len(),
                abandoned, "Broadcast stopped before all attempts finished"
            );
            BroadcastResult::cancelled(outcomes, abandoned)
        } else {
            // Sync cleanup finishes before return unless the deadline or the
            // caller cuts in; unfinished deletes stay on the cleaner's tracker.
            for delete in deletes {
                tokio::select! {
                    biased;
                    _ = &mut stop => {
                        warn!("Broadcast stopped while waiting on stale cleanup");
                        break;
                    }
                    joined = delete => {
                        if let Err(e) = joined {
                            error!(error = %e, "Stale cleanup task failed");
                        }
                    }
                }
            }
            BroadcastResult::completed(outcomes)
        };

        let elapsed = started.elapsed();
        observability::record_broadcast(&result, elapsed);
        info!(
            recipients = total,
            delivered = result.delivered(),
            transient = result.transient_failures(),
            stale = result.stale(),
            cancelled = result.is_cancelled(),
            elapsed_ms = millis(elapsed),
            "Broadcast dispatched"
        );

        result
    }

    /// Build one delivery task; the permit is held for the duration of the send
    fn attempt(
        &self,
        recipient: RecipientId,
        message: Message,
        permit: OwnedSemaphorePermit,
    ) -> impl std::future::Future<Output = DeliveryOutcome> + Send + 'static {
        let transport = Arc::clone(&self.transport);
        let metrics = Arc::clone(&self.metrics);
        let send_timeout = self.config.send_timeout;

        async move {
            let sent = {
                let _in_flight = metrics.track_send();
                let send = transport.send(&recipient, &message);
                match send_timeout {
                    Some(limit) => tokio::time::timeout(limit, send).await.unwrap_or_else(|_| {
                        Err(TransportError::Timeout {
                            recipient: recipient.clone(),
                            after_ms: millis(limit),
                        })
                    }),
                    None => send.await,
                }
            };
            drop(permit);
            classify(recipient, sent)
        }
    }

    /// Turn a joined task into an outcome; a panicked task counts as transient.
    /// A stale outcome starts its cleanup here, after it is safely collected.
    fn collect(
        &self,
        joined: Result<(task::Id, DeliveryOutcome), JoinError>,
        pending: &mut HashMap<task::Id, RecipientId>,
        outcomes: &mut Vec<DeliveryOutcome>,
        deletes: &mut Vec<JoinHandle<()>>,
    ) {
        let outcome = match joined {
            Ok((id, outcome)) => {
                pending.remove(&id);
                outcome
            }
            Err(err) => {
                let Some(recipient) = pending.remove(&err.id()) else {
                    error!(error = %err, "Joined a delivery task with no recipient");
                    return;
                };
                if err.is_cancelled() {
                    debug!(connection = %recipient, "Delivery attempt abandoned");
                    return;
                }
                error!(connection = %recipient, error = %err, "Delivery task panicked");
                DeliveryOutcome::transient(recipient, "delivery task panicked")
            }
        };

        self.metrics.record_outcome(outcome.status);
        observability::record_delivery(outcome.status);
        if outcome.status == DeliveryStatus::StaleRecipient {
            deletes.extend(self.cleaner.on_stale(&outcome.recipient));
        }
        outcomes.push(outcome);
    }
}

/// Map a transport result onto the three terminal states
fn classify(recipient: RecipientId, sent: Result<(), TransportError>) -> DeliveryOutcome {
    match sent {
        Ok(()) => DeliveryOutcome::delivered(recipient),
        Err(e) if e.is_gone() => {
            debug!(connection = %recipient, "Recipient gone");
            DeliveryOutcome::stale(recipient, e.to_string())
        }
        Err(e) => {
            warn!(connection = %recipient, error = %e, "Delivery failed");
            DeliveryOutcome::transient(recipient, e.to_string())
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Resolves when the caller cancels or the broadcast deadline passes
async fn stop_signal(cancel: CancellationToken, timeout: Option<Duration>) {
    match timeout {
        Some(limit) => {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(limit) => {}
            }
        }
        None => cancel.cancelled().await,
    }
}
