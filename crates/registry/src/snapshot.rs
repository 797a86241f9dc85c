//! SnapshotReader - captures the recipient set for one broadcast

use std::sync::Arc;

use contracts::{ConnectionRegistry, RegistrySnapshot};
use tracing::{debug, error, instrument, warn};

use crate::error::SnapshotError;

/// Reads the current recipient set from a registry
///
/// Every registry failure (unreachable, malformed) maps to
/// `RegistryUnavailable`; a partial list is never returned.
pub struct SnapshotReader<R> {
    registry: Arc<R>,
}

impl<R> Clone for SnapshotReader<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R: ConnectionRegistry> SnapshotReader<R> {
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Capture one snapshot. No side effects on the registry.
    #[instrument(name = "registry_snapshot", skip(self))]
    pub async fn snapshot(&self) -> Result<RegistrySnapshot, SnapshotError> {
        let ids = self.registry.list().await.map_err(|e| {
            error!(error = %e, "Registry list failed");
            SnapshotError::RegistryUnavailable(e)
        })?;

        let listed = ids.len();
        let snapshot: RegistrySnapshot = ids.into_iter().collect();

        if snapshot.len() < listed {
            warn!(
                listed,
                unique = snapshot.len(),
                "Registry returned duplicate connection ids"
            );
        }
        debug!(recipients = snapshot.len(), "Snapshot captured");

        Ok(snapshot)
    }
}
