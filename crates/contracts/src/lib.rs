//! # Contracts
//!
//! Frozen interface contracts shared by every gateway crate: identifiers,
//! messages, delivery outcomes, collaborator traits and the configuration
//! blueprint. Business crates depend only on this crate, never on each other
//! in reverse.
//!
//! ## Request model
//! - One inbound message produces one `RegistrySnapshot` and one `BroadcastResult`
//! - Nothing here outlives a single broadcast invocation except configuration

mod config;
mod error;
mod message;
mod outcome;
mod recipient_id;
mod registry;
mod snapshot;
mod transport;

pub use config::*;
pub use error::*;
pub use message::Message;
pub use outcome::*;
pub use recipient_id::RecipientId;
pub use registry::{ConnectionRecord, ConnectionRegistry};
pub use snapshot::RegistrySnapshot;
pub use transport::MessageTransport;
