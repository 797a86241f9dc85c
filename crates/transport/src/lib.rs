//! # Transport
//!
//! Per-connection message delivery.
//!
//! - `ChannelTransport`: one bounded in-process queue per connection
//! - `MockTransport`: scripted outcomes with in-flight tracking, for tests

pub mod channel;
pub mod mock;

pub use channel::ChannelTransport;
pub use contracts::{MessageTransport, TransportError};
pub use mock::{MockTransport, MockTransportConfig};
