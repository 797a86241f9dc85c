//! Inbound gateway events

use bytes::Bytes;
use contracts::{Message, RecipientId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// One event delivered by the WebSocket front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub request_context: RequestContext,
    /// Raw client frame, a JSON document for `sendmessage`
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub connection_id: RecipientId,
    pub route_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl InboundEvent {
    pub fn new(connection_id: impl Into<RecipientId>, route_key: impl Into<String>) -> Self {
        Self {
            request_context: RequestContext {
                connection_id: connection_id.into(),
                route_key: route_key.into(),
                domain_name: None,
                stage: None,
            },
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// `sendmessage` event carrying `{"message": <payload>}`
    pub fn send_message(connection_id: impl Into<RecipientId>, payload: Value) -> Self {
        let body = serde_json::json!({ "action": "sendmessage", "message": payload });
        Self::new(connection_id, Route::SEND_MESSAGE).with_body(body.to_string())
    }

    pub fn connection_id(&self) -> &RecipientId {
        &self.request_context.connection_id
    }

    pub fn route(&self) -> Route {
        Route::from_key(&self.request_context.route_key)
    }
}

/// Routes the gateway understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Connect,
    Disconnect,
    SendMessage,
    Other(String),
}

impl Route {
    pub const CONNECT: &'static str = "$connect";
    pub const DISCONNECT: &'static str = "$disconnect";
    pub const SEND_MESSAGE: &'static str = "sendmessage";

    pub fn from_key(key: &str) -> Self {
        match key {
            Self::CONNECT => Self::Connect,
            Self::DISCONNECT => Self::Disconnect,
            Self::SEND_MESSAGE => Self::SendMessage,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Extract the broadcast message from a `sendmessage` event
///
/// The body must be a JSON object with a non-null `message` key. A string
/// payload is sent as its UTF-8 bytes; any other JSON value is sent as its
/// compact JSON text.
///
/// # Errors
/// `InvalidMessage` for a missing body, malformed JSON, or a missing payload
pub fn decode_message(event: &InboundEvent) -> Result<Message, GatewayError> {
    let body = event
        .body
        .as_deref()
        .ok_or_else(|| GatewayError::invalid_message("missing body"))?;

    let mut doc: Value = serde_json::from_str(body)
        .map_err(|e| GatewayError::invalid_message(format!("body is not JSON: {e}")))?;

    let payload = doc
        .as_object_mut()
        .ok_or_else(|| GatewayError::invalid_message("body is not a JSON object"))?
        .remove("message")
        .filter(|v| !v.is_null())
        .ok_or_else(|| GatewayError::invalid_message("missing 'message' key"))?;

    let bytes = match payload {
        Value::String(text) => Bytes::from(text),
        other => Bytes::from(other.to_string()),
    };

    Ok(Message::new(event.connection_id().clone(), bytes))
}
