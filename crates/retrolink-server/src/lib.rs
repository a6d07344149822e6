//! # retrolink-server
//!
//! The network-facing half of Retrolink.  Accepts WebSocket connections,
//! speaks the JSON control envelope, forwards tool invocations across the
//! request bridge to the host loop, and fans machine events out to
//! subscribed sessions.
//!
//! # Layer responsibilities
//!
//! - **`domain`** – Configuration types and the TOML file schema.
//! - **`application`** – Per-session request handling: envelope parsing,
//!   the locally-served subscription tools, and bridge forwarding.  No
//!   sockets; fully testable in-process.
//! - **`infrastructure`** – The WebSocket accept loop, the event
//!   broadcaster, and the host-loop thread that owns the machine.

pub mod application;
pub mod domain;
pub mod infrastructure;
