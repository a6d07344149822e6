//! The JSON envelope exchanged over the WebSocket transport.
//!
//! One request names one tool and carries one structured parameter object.
//! The response echoes the caller's id so concurrent requests on a single
//! connection can be matched up.  Asynchronous notifications use a separate
//! [`EventFrame`] shape so a client can tell replies and events apart by the
//! presence of the `event` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::errors::{ErrorObject, RpcError};

/// Upper bound on the tool-name field.  Anything longer is rejected as
/// `INVALID_REQUEST` before lookup.
pub const MAX_TOOL_NAME_LEN: usize = 256;

/// One tool invocation as sent by a client.
///
/// `params` defaults to JSON `null` when absent; handlers treat `null` the
/// same as an empty object (every field lookup misses).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    /// Caller-chosen request id, echoed back in the response.
    pub id: u64,
    /// Tool name, e.g. `"keyboard.key_press"`.
    pub name: String,
    /// Structured parameter payload.
    #[serde(default)]
    pub params: Value,
}

/// The reply to one [`WireRequest`].
///
/// Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    /// Echo of the request id.  `None` when the request was so malformed
    /// that no id could be recovered (parse errors).
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl WireResponse {
    /// Builds a success response for the given request id.
    pub fn ok(id: u64, result: Value) -> Self {
        WireResponse {
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.  `id` is `None` for parse errors.
    pub fn err(id: Option<u64>, error: &RpcError) -> Self {
        WireResponse {
            id,
            result: None,
            error: Some(ErrorObject::from(error)),
        }
    }
}

/// One asynchronous notification, fanned out to every subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    /// Event type, e.g. `"machine_activity"`.
    pub event: String,
    /// Structured event payload.
    pub data: Value,
}

/// Validates the tool-name field of a request.
///
/// The name must be non-empty and at most [`MAX_TOOL_NAME_LEN`] characters.
/// This check runs before any handler lookup, so a malformed name never
/// reaches a handler.
pub fn validate_tool_name(name: &str) -> Result<(), RpcError> {
    if name.is_empty() {
        return Err(RpcError::InvalidRequest("tool name is empty".into()));
    }
    // Counted in characters, not bytes, so the bound is encoding-neutral.
    if name.chars().count() > MAX_TOOL_NAME_LEN {
        return Err(RpcError::InvalidRequest(format!(
            "tool name exceeds {MAX_TOOL_NAME_LEN} characters"
        )));
    }
    Ok(())
}
