//! MemoryRegistry - in-process connection store

use std::collections::HashMap;

use contracts::{ConnectionRecord, ConnectionRegistry, RecipientId, RegistryError};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Registry held in a `HashMap` behind an async `RwLock`
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    connections: RwLock<HashMap<RecipientId, ConnectionRecord>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with bare connection records
    pub fn with_seed<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RecipientId>,
    {
        let connections = ids
            .into_iter()
            .map(|id| {
                let record = ConnectionRecord::new(id);
                (record.connection_id.clone(), record)
            })
            .collect();
        Self {
            connections: RwLock::new(connections),
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.connections.read().await.contains_key(id)
    }
}

impl ConnectionRegistry for MemoryRegistry {
    async fn list(&self) -> Result<Vec<RecipientId>, RegistryError> {
        Ok(self.connections.read().await.keys().cloned().collect())
    }

    #[instrument(name = "memory_registry_put", skip(self, record), fields(connection = %record.connection_id))]
    async fn put(&self, record: ConnectionRecord) -> Result<(), RegistryError> {
        RegistryError::check_record(&record)?;
        let mut connections = self.connections.write().await;
        connections.insert(record.connection_id.clone(), record);
        debug!(total = connections.len(), "Connection registered");
        Ok(())
    }

    #[instrument(name = "memory_registry_delete", skip(self), fields(connection = %id))]
    async fn delete(&self, id: &RecipientId) -> Result<(), RegistryError> {
        let removed = self.connections.write().await.remove(id.as_str()).is_some();
        debug!(removed, "Connection delete");
        Ok(())
    }
}
