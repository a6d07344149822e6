//! Control-protocol types shared by the host runtime and the server.
//!
//! The wire format is deliberately minimal: a JSON envelope carrying a tool
//! name, a structured parameter object, and a caller-chosen request id.  The
//! error taxonomy uses the conventional JSON-RPC numeric codes so existing
//! client tooling maps onto it without translation tables.

pub mod errors;
pub mod messages;

pub use errors::{ErrorObject, RpcError};
pub use messages::{validate_tool_name, EventFrame, WireRequest, WireResponse, MAX_TOOL_NAME_LEN};
