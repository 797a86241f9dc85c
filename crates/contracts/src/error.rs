//! Layered error definitions
//!
//! Categorized by source: config / registry / transport

use thiserror::Error;

use crate::{ConnectionRecord, RecipientId};

/// Unified error type for configuration and general failures
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors reported by a connection registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Store could not be reached
    #[error("registry unavailable: {message}")]
    Unavailable { message: String },

    /// Store answered with something that is not a list of connections
    #[error("malformed registry response: {message}")]
    Malformed { message: String },

    /// Record refused before it reached the store
    #[error("invalid connection record: {message}")]
    InvalidRecord { message: String },

    /// IO error from a file backed store
    #[error("registry io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Create unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Refuse a record whose id every later `list` would reject
    pub fn check_record(record: &ConnectionRecord) -> Result<(), Self> {
        if record.connection_id.is_blank() {
            return Err(Self::InvalidRecord {
                message: "blank connectionId".to_string(),
            });
        }
        Ok(())
    }
}

/// Errors reported by a message transport for a single recipient
///
/// Only [`TransportError::Gone`] is permanent; every other variant is
/// transient from the dispatcher's point of view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Recipient no longer exists at the transport layer
    #[error("connection '{recipient}' is gone")]
    Gone { recipient: RecipientId },

    /// Recipient queue is full
    #[error("queue full for connection '{recipient}'")]
    QueueFull { recipient: RecipientId },

    /// Send did not finish in time
    #[error("send to '{recipient}' timed out after {after_ms}ms")]
    Timeout { recipient: RecipientId, after_ms: u64 },

    /// Any other transport failure
    #[error("send to '{recipient}' failed: {message}")]
    Other {
        recipient: RecipientId,
        message: String,
    },
}

impl TransportError {
    /// Create gone error
    pub fn gone(recipient: impl Into<RecipientId>) -> Self {
        Self::Gone {
            recipient: recipient.into(),
        }
    }

    /// Create generic transport error
    pub fn other(recipient: impl Into<RecipientId>, message: impl Into<String>) -> Self {
        Self::Other {
            recipient: recipient.into(),
            message: message.into(),
        }
    }

    /// Whether the recipient is permanently gone
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone { .. })
    }
}
