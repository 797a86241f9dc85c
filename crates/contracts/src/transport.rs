//! MessageTransport trait - per-connection delivery
//!
//! The dispatcher calls `send` once per recipient and classifies the error.

use std::future::Future;

use crate::{Message, RecipientId, TransportError};

/// Sends bytes to one connection
///
/// Retry policy, if any, lives behind this trait. Implementations must
/// report a vanished connection as [`TransportError::Gone`] so the
/// dispatcher can prune it from the registry.
pub trait MessageTransport: Send + Sync {
    fn send(
        &self,
        recipient: &RecipientId,
        message: &Message,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
