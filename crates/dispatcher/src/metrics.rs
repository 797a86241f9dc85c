//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::DeliveryStatus;

/// Counters shared by every broadcast of one dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Broadcasts that reached dispatch
    broadcasts: AtomicU64,
    /// Outcomes per class
    delivered: AtomicU64,
    transient_failures: AtomicU64,
    stale: AtomicU64,
    /// Registry deletes issued for stale recipients
    cleanup_ok: AtomicU64,
    cleanup_failed: AtomicU64,
    /// Sends currently running
    in_flight: AtomicUsize,
    /// Highest `in_flight` ever observed
    peak_in_flight: AtomicUsize,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_broadcasts(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one classified outcome
    pub fn record_outcome(&self, status: DeliveryStatus) {
        let counter = match status {
            DeliveryStatus::Delivered => &self.delivered,
            DeliveryStatus::TransientFailure => &self.transient_failures,
            DeliveryStatus::StaleRecipient => &self.stale,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleanup(&self, ok: bool) {
        if ok {
            self.cleanup_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cleanup_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Mark one send as running until the guard drops
    pub fn track_send(self: &Arc<Self>) -> InFlightGuard {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            metrics: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            transient_failures: self.transient_failures.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            cleanup_ok: self.cleanup_ok.load(Ordering::Relaxed),
            cleanup_failed: self.cleanup_failed.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
            peak_in_flight: self.peak_in_flight(),
        }
    }
}

/// Decrements the in-flight count on drop, including when the send is aborted
#[derive(Debug)]
pub struct InFlightGuard {
    metrics: Arc<DispatchMetrics>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.metrics.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub broadcasts: u64,
    pub delivered: u64,
    pub transient_failures: u64,
    pub stale: u64,
    pub cleanup_ok: u64,
    pub cleanup_failed: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_tracks_peak() {
        let metrics = Arc::new(DispatchMetrics::new());
        let a = metrics.track_send();
        let b = metrics.track_send();
        assert_eq!(metrics.in_flight(), 2);
        drop(a);
        drop(b);
        let _c = metrics.track_send();

        let snap = metrics.snapshot();
        assert_eq!(snap.in_flight, 1);
        assert_eq!(snap.peak_in_flight, 2);
    }

    #[test]
    fn test_outcome_counters() {
        let metrics = DispatchMetrics::new();
        metrics.record_outcome(DeliveryStatus::Delivered);
        metrics.record_outcome(DeliveryStatus::StaleRecipient);
        metrics.record_cleanup(false);

        let snap = metrics.snapshot();
        assert_eq!(snap.delivered, 1);
        assert_eq!(snap.stale, 1);
        assert_eq!(snap.cleanup_failed, 1);
        assert_eq!(snap.cleanup_ok, 0);
    }
}
