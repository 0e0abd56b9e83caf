//! Wire envelopes.
//!
//! Every frame is one JSON object with a `type` discriminator. Clients send
//! `auth` and `rpc`; the server sends `hello`, `auth_result`, `rpc_result`,
//! `event`, and `error`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use gateway_core::protocol::{PROTOCOL_COMPAT, PROTOCOL_VERSION};

use crate::errors::ProtocolError;

/// Authentication request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    /// Shared secret. Missing counts as a mismatch.
    #[serde(default)]
    pub token: Option<String>,
    /// Caller-chosen identity. Generated when absent or empty.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Advisory role label.
    #[serde(default)]
    pub role: Option<String>,
}

/// Method invocation request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Opaque correlation id, echoed verbatim.
    #[serde(default)]
    pub id: Value,
    /// Method name.
    #[serde(default)]
    pub method: String,
    /// Parameters. Missing or `null` becomes `{}`.
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Build a request, mostly for tests and embedders.
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Split into `(id, method, params)`, with `null` params replaced by
    /// an empty object.
    pub fn into_parts(self) -> (Value, String, Value) {
        let params = if self.params.is_null() {
            Value::Object(Map::new())
        } else {
            self.params
        };
        (self.id, self.method, params)
    }
}

/// Parsed inbound frame.
#[derive(Clone, Debug)]
pub enum ClientMessage {
    /// `{"type":"auth", ...}`
    Auth(AuthRequest),
    /// `{"type":"auth", ...}` whose fields have the wrong types. Handled as
    /// a failed auth, carrying the decode error.
    MalformedAuth(String),
    /// `{"type":"rpc", ...}`
    Rpc(RpcRequest),
    /// Any other `type` value.
    Other(String),
}

impl ClientMessage {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Err(ProtocolError::InvalidMessage(
                "missing string field `type`".into(),
            ));
        };
        match kind {
            "auth" => Ok(serde_json::from_value(value)
                .map_or_else(|e| Self::MalformedAuth(e.to_string()), Self::Auth)),
            "rpc" => serde_json::from_value(value)
                .map(Self::Rpc)
                .map_err(|e| ProtocolError::InvalidMessage(e.to_string())),
            other => Ok(Self::Other(other.to_owned())),
        }
    }
}

/// Result of one rpc.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Echoed request identifier.
    pub id: Value,
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload (present when `success == true`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure message (present when `success == false`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable failure code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl RpcResponse {
    /// Build a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
            code: None,
        }
    }

    /// Build an error response.
    pub fn error(id: Value, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(message.into()),
            code: Some(code.into()),
        }
    }
}

/// Server-to-client envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// First frame on every connection.
    Hello {
        /// Protocol version spoken.
        protocol_version: u32,
        /// Versions understood.
        protocol_compat: Vec<u32>,
        /// Always `true`.
        requires_auth: bool,
    },
    /// Reply to `auth`.
    AuthResult {
        /// Whether the token matched.
        success: bool,
        /// Assigned client id on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        /// Failure reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Reply to `rpc`.
    RpcResult(RpcResponse),
    /// Published event.
    Event {
        /// Event name.
        event: String,
        /// Event payload.
        payload: Value,
    },
    /// Protocol error. The connection stays open.
    Error {
        /// Description.
        error: String,
    },
}

impl ServerMessage {
    /// The greeting sent on accept.
    pub fn hello() -> Self {
        Self::Hello {
            protocol_version: PROTOCOL_VERSION,
            protocol_compat: PROTOCOL_COMPAT.to_vec(),
            requires_auth: true,
        }
    }

    /// Successful auth reply.
    pub fn auth_ok(client_id: impl Into<String>) -> Self {
        Self::AuthResult {
            success: true,
            client_id: Some(client_id.into()),
            error: None,
        }
    }

    /// Failed auth reply.
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthResult {
            success: false,
            client_id: None,
            error: Some(reason.into()),
        }
    }

    /// Event envelope.
    pub fn event(event: impl Into<String>, payload: Value) -> Self {
        Self::Event {
            event: event.into(),
            payload,
        }
    }

    /// Protocol error envelope.
    pub fn protocol_error(err: &ProtocolError) -> Self {
        Self::Error {
            error: err.to_string(),
        }
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
