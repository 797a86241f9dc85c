//! ConnectionRegistry trait - store of live connection ids
//!
//! Abstracts the external registry so the dispatcher never depends on a
//! concrete store.

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{RecipientId, RegistryError};

/// Stored attributes of one connection.
///
/// `connectionId` is the only attribute the broadcast path reads; everything
/// else is kept verbatim for other consumers of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    #[serde(rename = "connectionId")]
    pub connection_id: RecipientId,

    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ConnectionRecord {
    pub fn new(connection_id: impl Into<RecipientId>) -> Self {
        Self {
            connection_id: connection_id.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// Connection registry
///
/// Implementations must tolerate concurrent calls from many delivery tasks.
pub trait ConnectionRegistry: Send + Sync {
    /// List registered connection ids
    ///
    /// Returns only the identifier projection, never full records.
    ///
    /// # Errors
    /// `Unavailable` / `Malformed` when the store cannot produce a clean list
    fn list(&self) -> impl Future<Output = Result<Vec<RecipientId>, RegistryError>> + Send;

    /// Register a connection (called on connect)
    fn put(&self, record: ConnectionRecord)
        -> impl Future<Output = Result<(), RegistryError>> + Send;

    /// Remove a connection
    ///
    /// Idempotent: removing an unknown id returns Ok
    fn delete(&self, id: &RecipientId) -> impl Future<Output = Result<(), RegistryError>> + Send;
}
