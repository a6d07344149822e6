//! Application layer: per-session request handling.

pub mod session;

pub use session::Session;
