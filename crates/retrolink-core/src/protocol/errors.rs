//! The error taxonomy for tool invocations.
//!
//! Every failure that can reach a caller is one of six categories, each with
//! a stable numeric code:
//!
//! | Variant            | Code   | Meaning                                        |
//! |--------------------|--------|------------------------------------------------|
//! | `ParseError`       | -32700 | The request was not valid JSON                 |
//! | `InvalidRequest`   | -32600 | Request shape is wrong (bad/missing tool name) |
//! | `MethodNotFound`   | -32601 | No tool registered under that name             |
//! | `InvalidParams`    | -32602 | A required field is missing or mistyped        |
//! | `Internal`         | -32603 | An unexpected fault on the host thread         |
//! | `ServerBusy`       | -32000 | Request queue full, retriable                  |
//!
//! `ServerBusy` is the backpressure signal: the cross-thread request queue is
//! bounded, and a full queue rejects rather than growing without limit.  A
//! caller may retry after a frame or two; all other codes are not retriable.
//!
//! Three rules the handlers uphold:
//!
//! - `InvalidParams` always carries a field-specific message and implies
//!   zero side effects (the handler validates before touching the machine).
//! - `Internal` is a conversion, not a crash: no fault is allowed to take
//!   down the host thread.
//! - Release-slot exhaustion is *not* an error at this level.  The causing
//!   action still succeeds; the auto-release is simply skipped and a warning
//!   is logged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed tool invocation, as seen by the caller.
///
/// Construct the parameter/lookup variants with a message describing the
/// offending field, e.g. `RpcError::invalid_params("'key' must be string or
/// number")`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The request body was not parseable JSON.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The request envelope itself is malformed (empty or oversized name).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No tool is registered under the requested name.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// A handler rejected its parameters before performing any side effect.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// An unexpected fault occurred while executing on the host thread.
    #[error("internal error: {0}")]
    Internal(String),

    /// The cross-thread request queue is full.  Retriable.
    #[error("server busy: request queue full")]
    ServerBusy,
}

impl RpcError {
    /// The stable numeric code for this error category.
    pub fn code(&self) -> i32 {
        match self {
            RpcError::ParseError(_) => -32700,
            RpcError::InvalidRequest(_) => -32600,
            RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams(_) => -32602,
            RpcError::Internal(_) => -32603,
            RpcError::ServerBusy => -32000,
        }
    }

    /// Shorthand for the most common construction in handler code.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        RpcError::InvalidParams(msg.into())
    }

    /// Shorthand for host-thread fault conversion.
    pub fn internal(msg: impl Into<String>) -> Self {
        RpcError::Internal(msg.into())
    }
}

/// The `{code, message}` object that travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
}

impl From<&RpcError> for ErrorObject {
    fn from(err: &RpcError) -> Self {
        ErrorObject {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<RpcError> for ErrorObject {
    fn from(err: RpcError) -> Self {
        ErrorObject::from(&err)
    }
}
