//! Retrolink control server entry point.
//!
//! This binary accepts WebSocket connections from remote-control clients and
//! bridges their JSON tool invocations into a frame-synchronous host loop.
//! Transport tasks run on the Tokio runtime; the machine runs on a dedicated
//! OS thread at the configured frame cadence, and the two sides only meet at
//! the bounded request queue.
//!
//! # Usage
//!
//! ```text
//! retrolink-server [OPTIONS]
//!
//! Options:
//!   --bind  <ADDR>          Bind address [default: 127.0.0.1]
//!   --port  <PORT>          WebSocket listener port [default: 6510]
//!   --queue-capacity <N>    Request queue capacity [default: 64]
//!   --frame-interval-ms <MS> Host frame cadence [default: 20]
//!   --config <PATH>         TOML config file
//! ```
//!
//! # Configuration precedence
//!
//! CLI arguments override the config file, which overrides built-in
//! defaults.  Each CLI option also reads an environment variable
//! (`RETROLINK_BIND`, `RETROLINK_PORT`, ...) when the flag is absent.
//!
//! # Architecture overview
//!
//! ```text
//! Control client  (JSON over WebSocket)
//!       ↕
//! retrolink-server  ← this process
//!   application/    Session: envelope, subscriptions, bridge forwarding
//!   infrastructure/
//!     ws_server/    Accept loop + per-session tasks
//!     broadcast/    Event fan-out to subscribers
//!     host_loop/    Frame-cadenced thread owning the machine
//!       ↕  bounded queue + oneshot replies
//! retrolink-host  (tool dispatch, deferred releases)
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use retrolink_host::bridge::bridge_channel;
use retrolink_server::domain::{FileConfig, ServerConfig};
use retrolink_server::infrastructure::{run_server, spawn_host_loop, EventBroadcaster};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote-control server for a C64-style emulator.
///
/// Accepts WebSocket connections and executes keyboard, joystick, and
/// display tools against the machine, one frame at a time.
#[derive(Debug, Parser)]
#[command(
    name = "retrolink-server",
    about = "WebSocket control server for Retrolink",
    version
)]
struct Cli {
    /// IP address to bind the WebSocket listener to.
    ///
    /// `127.0.0.1` accepts only local connections; `0.0.0.0` accepts from
    /// any interface.
    #[arg(long, env = "RETROLINK_BIND")]
    bind: Option<String>,

    /// TCP port for the WebSocket listener.
    #[arg(long, env = "RETROLINK_PORT")]
    port: Option<u16>,

    /// Capacity of the bounded request queue into the host loop.
    ///
    /// A full queue rejects submissions with a retriable busy error rather
    /// than queueing without limit.
    #[arg(long, env = "RETROLINK_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// Host-loop frame cadence in milliseconds.  20 ms matches PAL vsync.
    #[arg(long, env = "RETROLINK_FRAME_INTERVAL_MS")]
    frame_interval_ms: Option<u64>,

    /// Path to a TOML config file.  Missing file is not an error; defaults
    /// apply.
    #[arg(long, env = "RETROLINK_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Resolves the effective configuration: CLI over file over defaults.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => FileConfig::default(),
        };
        let mut config = file.into_server_config()?;

        if let Some(bind) = self.bind {
            let port = self.port.unwrap_or(config.bind_addr.port());
            config.bind_addr = format!("{bind}:{port}")
                .parse()
                .with_context(|| format!("invalid bind address: '{bind}:{port}'"))?;
        } else if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(ms) = self.frame_interval_ms {
            config.frame_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log level comes from RUST_LOG, defaulting to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_server_config()?;

    info!(
        "Retrolink server starting: bind={}, queue={}, frame={}ms",
        config.bind_addr,
        config.queue_capacity,
        config.frame_interval.as_millis()
    );

    // Graceful shutdown flag, cleared by Ctrl+C.  Both the accept loop and
    // the host loop poll it.
    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_ctrlc.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let (bridge, request_rx) = bridge_channel(config.queue_capacity);
    let broadcaster = Arc::new(EventBroadcaster::new());

    let host_handle = spawn_host_loop(
        request_rx,
        Arc::clone(&broadcaster),
        config.frame_interval,
        Arc::clone(&running),
    );

    run_server(&config, bridge, broadcaster, Arc::clone(&running)).await?;

    // The accept loop has exited; stop the host thread too.
    running.store(false, Ordering::Relaxed);
    if host_handle.join().is_err() {
        tracing::error!("host loop thread panicked");
    }

    info!("Retrolink server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
