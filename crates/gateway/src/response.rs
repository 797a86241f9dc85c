//! Gateway response

use serde::{Deserialize, Serialize};

/// HTTP-style status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: Self = Self(200);
    pub const BAD_REQUEST: Self = Self(400);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);

    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.0)
    }

    pub fn is_server_error(self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the gateway returns for one inbound event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl GatewayResponse {
    pub fn ok() -> Self {
        Self {
            status_code: StatusCode::OK,
            body: None,
        }
    }

    pub fn with_body(status_code: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: Some(body.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }
}

impl From<&crate::GatewayError> for GatewayResponse {
    fn from(err: &crate::GatewayError) -> Self {
        Self::with_body(err.status_code(), err.to_string())
    }
}
