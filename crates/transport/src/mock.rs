//! Mock transport
//!
//! Scripted per-recipient outcomes, optional latency, and in-flight
//! accounting so tests can observe the dispatcher's concurrency bound.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use contracts::{Message, MessageTransport, RecipientId, TransportError};
use tracing::instrument;

/// Mock transport configuration
#[derive(Debug, Default, Clone)]
pub struct MockTransportConfig {
    /// Recipients reported as gone
    pub gone: Vec<String>,
    /// Recipients that fail transiently
    pub failing: Vec<String>,
    /// Recipients whose send panics
    pub panic_on: Vec<String>,
    /// Recipients whose send never completes
    pub hang_on: Vec<String>,
    /// Latency added to every send
    pub delay: Option<Duration>,
}

/// Mock transport
pub struct MockTransport {
    config: MockTransportConfig,
    sends: Mutex<Vec<(RecipientId, Bytes)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight counter even when the send future is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    /// Transport that delivers everything
    pub fn new() -> Self {
        Self::with_config(MockTransportConfig::default())
    }

    pub fn with_config(config: MockTransportConfig) -> Self {
        Self {
            config,
            sends: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every send attempt in call order
    pub fn sends(&self) -> Vec<(RecipientId, Bytes)> {
        self.sends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn send_count(&self) -> usize {
        self.sends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether `id` was ever sent to
    pub fn was_sent_to(&self, id: &str) -> bool {
        self.sends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(r, _)| r == id)
    }

    /// Highest number of sends observed running at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn listed(list: &[String], id: &RecipientId) -> bool {
        list.iter().any(|entry| id == entry)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageTransport for MockTransport {
    #[instrument(name = "mock_transport_send", skip(self, message), fields(connection = %recipient))]
    async fn send(&self, recipient: &RecipientId, message: &Message) -> Result<(), TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        self.sends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((recipient.clone(), message.payload().clone()));

        if let Some(delay) = self.config.delay {
            tokio::time::sleep(delay).await;
        }

        if Self::listed(&self.config.hang_on, recipient) {
            std::future::pending::<()>().await;
        }
        if Self::listed(&self.config.panic_on, recipient) {
            panic!("mock transport panic for '{recipient}'");
        }
        if Self::listed(&self.config.gone, recipient) {
            return Err(TransportError::gone(recipient));
        }
        if Self::listed(&self.config.failing, recipient) {
            return Err(TransportError::other(recipient, "mock transient failure"));
        }
        Ok(())
    }
}
