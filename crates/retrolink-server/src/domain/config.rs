//! Server configuration: the runtime struct and the TOML file schema.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup from three layers, highest precedence first:
//! CLI arguments, then an optional TOML file, then defaults.  Keeping it a
//! plain struct with no environment reads inside the domain makes the server
//! easy to embed in tests.
//!
//! # Serde default values
//!
//! Every field of the file schema carries `#[serde(default = "...")]`, so a
//! partial file (or no file at all) always yields a complete configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// All runtime configuration for the control server.
///
/// Build this once at startup and wrap it in an `Arc` for sharing across
/// session tasks.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address and port the WebSocket server binds to.
    ///
    /// `0.0.0.0` accepts connections from any interface; `127.0.0.1`
    /// accepts only local connections.
    pub bind_addr: SocketAddr,

    /// Capacity of the bounded request queue into the host loop.
    ///
    /// When the queue is full, submissions are rejected with `SERVER_BUSY`
    /// instead of waiting, so a flood of requests cannot build unbounded
    /// latency into the control path.
    pub queue_capacity: usize,

    /// Cadence of the host loop's simulated frames.
    ///
    /// 20 ms matches a PAL machine's 50 Hz vertical sync, which the hold
    /// duration conversion assumes.
    pub frame_interval: Duration,
}

impl Default for ServerConfig {
    /// Returns a `ServerConfig` suitable for local development.
    ///
    /// | Field           | Default          |
    /// |-----------------|------------------|
    /// | bind_addr       | `127.0.0.1:6510` |
    /// | queue_capacity  | 64               |
    /// | frame_interval  | 20 ms            |
    fn default() -> Self {
        Self {
            // Compile-time-known valid socket address string.
            bind_addr: "127.0.0.1:6510".parse().unwrap(),
            queue_capacity: 64,
            frame_interval: Duration::from_millis(20),
        }
    }
}

// ── File schema ───────────────────────────────────────────────────────────────

/// On-disk TOML schema, e.g.:
///
/// ```toml
/// [server]
/// bind_address = "0.0.0.0"
/// port = 6510
/// queue_capacity = 64
///
/// [host]
/// frame_interval_ms = 20
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub host: HostSection,
}

/// `[server]` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// IP address to bind the listener to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port for the WebSocket listener.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bounded request-queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// `[host]` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostSection {
    /// Host-loop frame cadence in milliseconds.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    6510
}
fn default_queue_capacity() -> usize {
    64
}
fn default_frame_interval_ms() -> u64 {
    20
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl FileConfig {
    /// Loads the file at `path`, returning defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] for file-system errors other than "not found",
    /// [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<FileConfig, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Converts the file schema into the runtime [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `bind_address` combined with `port` is not a
    /// valid socket address.
    pub fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        use anyhow::Context;
        let bind_addr: SocketAddr = format!("{}:{}", self.server.bind_address, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid bind address: '{}:{}'",
                    self.server.bind_address, self.server.port
                )
            })?;
        Ok(ServerConfig {
            bind_addr,
            queue_capacity: self.server.queue_capacity,
            frame_interval: Duration::from_millis(self.host.frame_interval_ms),
        })
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            host: HostSection::default(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
