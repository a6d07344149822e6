//! Infrastructure layer: sockets, event fan-out, and the host-loop thread.

pub mod broadcast;
pub mod host_loop;
pub mod ws_server;

pub use broadcast::EventBroadcaster;
pub use host_loop::{spawn_host_loop, DemoMachine};
pub use ws_server::{run_server, serve};
