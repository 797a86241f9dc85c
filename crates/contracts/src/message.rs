//! Message - one inbound payload to fan out

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::RecipientId;

/// Opaque payload plus the connection that sent it.
///
/// No schema is imposed on `payload`. The sender is excluded from delivery.
/// Cloning only bumps reference counts, so every delivery attempt can hold
/// its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender: RecipientId,
    payload: Bytes,
}

impl Message {
    pub fn new(sender: impl Into<RecipientId>, payload: impl Into<Bytes>) -> Self {
        Self {
            sender: sender.into(),
            payload: payload.into(),
        }
    }

    /// Originating connection
    pub fn sender(&self) -> &RecipientId {
        &self.sender
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
