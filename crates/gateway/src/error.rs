//! Gateway error types

use contracts::RegistryError;
use registry::SnapshotError;
use thiserror::Error;

use crate::response::StatusCode;

/// Failures that end a request before or instead of a broadcast
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Client sent an unusable payload
    #[error("invalid message: {reason}")]
    InvalidMessage { reason: String },

    /// `$connect` carried no usable connection id
    #[error("blank connectionId")]
    BlankConnectionId,

    /// Snapshot could not be read; nothing was sent
    #[error(transparent)]
    RegistryUnavailable(#[from] SnapshotError),

    /// Connect/disconnect bookkeeping failed
    #[error("registry update failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("unsupported route '{route}'")]
    UnknownRoute { route: String },

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn invalid_message(reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            reason: reason.into(),
        }
    }

    /// Status code reported to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidMessage { .. } | Self::BlankConnectionId | Self::UnknownRoute { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::RegistryUnavailable(_) | Self::Registry(_) | Self::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::invalid_message("no body").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::from(SnapshotError::RegistryUnavailable(RegistryError::unavailable(
                "down"
            )))
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(GatewayError::UnknownRoute {
            route: "$default".into()
        }
        .is_client_error());
    }
}
