//! FileRegistry - connection records persisted as a JSON array
//!
//! File layout: `[{"connectionId": "...", ...any other attributes}]`.
//! A missing file is an empty registry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use contracts::{ConnectionRecord, ConnectionRegistry, RecipientId, RegistryError};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

const ID_FIELD: &str = "connectionId";

/// Registry backed by one JSON file
pub struct FileRegistry {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_raw(&self) -> Result<Vec<Value>, RegistryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistryError::Io(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| RegistryError::malformed(format!("{}: {e}", self.path.display())))
    }

    async fn read_records(&self) -> Result<Vec<ConnectionRecord>, RegistryError> {
        self.read_raw()
            .await?
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                serde_json::from_value(item)
                    .map_err(|e| RegistryError::malformed(format!("record {idx}: {e}")))
            })
            .collect()
    }

    async fn write_records(&self, records: &[ConnectionRecord]) -> Result<(), RegistryError> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| RegistryError::malformed(format!("serialize: {e}")))?;

        // Write-then-rename keeps readers from seeing a half-written file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Pull only the id out of one raw record
fn project_id(idx: usize, item: &Value) -> Result<RecipientId, RegistryError> {
    let id = item
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| RegistryError::malformed(format!("record {idx} has no string {ID_FIELD}")))?;

    let id = RecipientId::from(id);
    if id.is_blank() {
        return Err(RegistryError::malformed(format!("record {idx} has a blank {ID_FIELD}")));
    }
    Ok(id)
}

impl ConnectionRegistry for FileRegistry {
    #[instrument(name = "file_registry_list", skip(self), fields(path = %self.path.display()))]
    async fn list(&self) -> Result<Vec<RecipientId>, RegistryError> {
        let raw = self.read_raw().await?;
        raw.iter()
            .enumerate()
            .map(|(idx, item)| project_id(idx, item))
            .collect()
    }

    #[instrument(name = "file_registry_put", skip(self, record), fields(connection = %record.connection_id))]
    async fn put(&self, record: ConnectionRecord) -> Result<(), RegistryError> {
        RegistryError::check_record(&record)?;
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_records().await?;
        records.retain(|r| r.connection_id != record.connection_id);
        records.push(record);
        self.write_records(&records).await?;
        debug!(total = records.len(), "Connection registered");
        Ok(())
    }

    #[instrument(name = "file_registry_delete", skip(self), fields(connection = %id))]
    async fn delete(&self, id: &RecipientId) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_records().await?;
        let before = records.len();
        records.retain(|r| &r.connection_id != id);

        if records.len() == before {
            debug!("Connection already absent");
            return Ok(());
        }
        self.write_records(&records).await
    }
}
