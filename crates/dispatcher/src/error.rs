//! Dispatcher error types
//!
//! Only construction can fail. Once a broadcast starts, every per-recipient
//! failure becomes an outcome instead of an error.

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Configuration rejected at construction
    #[error("invalid dispatcher config '{field}': {message}")]
    InvalidConfig { field: String, message: String },
}

impl DispatcherError {
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}
