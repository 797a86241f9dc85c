//! Delivery outcomes - Dispatcher output
//!
//! One `DeliveryOutcome` per recipient, aggregated into a `BroadcastResult`.

use serde::{Deserialize, Serialize};

use crate::RecipientId;

/// Terminal state of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Transport accepted the message
    Delivered,
    /// Send failed for a reason that may go away; not retried here
    TransientFailure,
    /// Transport reports the connection no longer exists
    StaleRecipient,
}

impl DeliveryStatus {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::TransientFailure => "transient_failure",
            Self::StaleRecipient => "stale_recipient",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of sending to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub recipient: RecipientId,
    pub status: DeliveryStatus,
    /// Failure description, `None` when delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(recipient: RecipientId) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Delivered,
            detail: None,
        }
    }

    pub fn transient(recipient: RecipientId, detail: impl Into<String>) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::TransientFailure,
            detail: Some(detail.into()),
        }
    }

    pub fn stale(recipient: RecipientId, detail: impl Into<String>) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::StaleRecipient,
            detail: Some(detail.into()),
        }
    }
}

/// Aggregate of one broadcast invocation.
///
/// Outcomes are in completion order. A completed broadcast holds exactly one
/// outcome per recipient of the delivery set. A cancelled one holds only the
/// attempts that reached a terminal state; `abandoned` counts the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    outcomes: Vec<DeliveryOutcome>,
    cancelled: bool,
    abandoned: usize,
}

impl BroadcastResult {
    /// Result for an empty delivery set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every attempt reached a terminal state
    pub fn completed(outcomes: Vec<DeliveryOutcome>) -> Self {
        Self {
            outcomes,
            cancelled: false,
            abandoned: 0,
        }
    }

    /// Broadcast stopped early; `abandoned` attempts have no outcome
    pub fn cancelled(outcomes: Vec<DeliveryOutcome>, abandoned: usize) -> Self {
        Self {
            outcomes,
            cancelled: true,
            abandoned,
        }
    }

    pub fn outcomes(&self) -> &[DeliveryOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<DeliveryOutcome> {
        self.outcomes
    }

    /// Number of recorded outcomes
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned
    }

    /// Outcome recorded for `recipient`, if any
    pub fn get(&self, recipient: &str) -> Option<&DeliveryOutcome> {
        self.outcomes.iter().find(|o| o.recipient == recipient)
    }

    pub fn count(&self, status: DeliveryStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn delivered(&self) -> usize {
        self.count(DeliveryStatus::Delivered)
    }

    pub fn transient_failures(&self) -> usize {
        self.count(DeliveryStatus::TransientFailure)
    }

    pub fn stale(&self) -> usize {
        self.count(DeliveryStatus::StaleRecipient)
    }

    /// Recipients classified as stale
    pub fn stale_recipients(&self) -> impl Iterator<Item = &RecipientId> {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::StaleRecipient)
            .map(|o| &o.recipient)
    }

    pub fn summary(&self) -> BroadcastSummary {
        BroadcastSummary {
            recipients: self.len() + self.abandoned,
            delivered: self.delivered(),
            transient_failures: self.transient_failures(),
            stale: self.stale(),
            cancelled: self.cancelled,
            abandoned: self.abandoned,
        }
    }
}

/// Counts returned to the caller in the response body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastSummary {
    /// Size of the delivery set
    pub recipients: usize,
    pub delivered: usize,
    pub transient_failures: usize,
    pub stale: usize,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub abandoned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BroadcastResult {
        BroadcastResult::completed(vec![
            DeliveryOutcome::delivered("b".into()),
            DeliveryOutcome::stale("c".into(), "gone"),
            DeliveryOutcome::transient("d".into(), "queue full"),
            DeliveryOutcome::delivered("e".into()),
        ])
    }

    #[test]
    fn test_counts() {
        let result = sample();
        assert_eq!(result.len(), 4);
        assert_eq!(result.delivered(), 2);
        assert_eq!(result.stale(), 1);
        assert_eq!(result.transient_failures(), 1);
        assert_eq!(result.stale_recipients().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(
            result.get("d").map(|o| o.status),
            Some(DeliveryStatus::TransientFailure)
        );
    }

    #[test]
    fn test_summary_includes_abandoned() {
        let result =
            BroadcastResult::cancelled(vec![DeliveryOutcome::delivered("b".into())], 3);
        let summary = result.summary();
        assert_eq!(summary.recipients, 4);
        assert_eq!(summary.delivered, 1);
        assert!(summary.cancelled);
        assert_eq!(summary.abandoned, 3);
    }

    #[test]
    fn test_status_serde_labels() {
        let json = serde_json::to_string(&DeliveryStatus::StaleRecipient).unwrap();
        assert_eq!(json, "\"stale_recipient\"");
        assert_eq!(DeliveryStatus::TransientFailure.to_string(), "transient_failure");
    }

    #[test]
    fn test_empty_result() {
        let result = BroadcastResult::empty();
        assert!(result.is_empty());
        assert!(!result.is_cancelled());
        assert_eq!(result.summary(), BroadcastSummary::default());
    }
}
