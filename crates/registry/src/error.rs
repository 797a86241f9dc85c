//! Snapshot error types

use contracts::RegistryError;
use thiserror::Error;

/// Snapshot read failure; aborts the broadcast before any send
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Registry unreachable or returned a malformed response
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(#[source] RegistryError),
}
