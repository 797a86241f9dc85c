//! ChannelTransport - per-connection bounded queues
//!
//! Each attached connection gets an `mpsc` receiver. A full queue is a
//! transient failure; a dropped receiver or unknown id means the connection
//! is gone.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use contracts::{Message, MessageTransport, RecipientId, TransportError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// In-process transport for locally held connections
pub struct ChannelTransport {
    queue_capacity: usize,
    senders: RwLock<HashMap<RecipientId, mpsc::Sender<Message>>>,
}

impl ChannelTransport {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            senders: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a connection and return its receiving end
    ///
    /// Re-attaching an id replaces the previous queue.
    pub fn attach(&self, id: impl Into<RecipientId>) -> mpsc::Receiver<Message> {
        let id = id.into();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), tx);
        debug!(connection = %id, "Connection attached");
        rx
    }

    /// Detach a connection; returns false if it was not attached
    pub fn detach(&self, id: &str) -> bool {
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn sender_for(&self, id: &RecipientId) -> Option<mpsc::Sender<Message>> {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.as_str())
            .cloned()
    }
}

impl MessageTransport for ChannelTransport {
    async fn send(&self, recipient: &RecipientId, message: &Message) -> Result<(), TransportError> {
        let Some(tx) = self.sender_for(recipient) else {
            return Err(TransportError::gone(recipient));
        };

        match tx.try_send(message.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(connection = %recipient, "Queue full, message not delivered");
                Err(TransportError::QueueFull {
                    recipient: recipient.clone(),
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.detach(recipient);
                Err(TransportError::gone(recipient))
            }
        }
    }
}
