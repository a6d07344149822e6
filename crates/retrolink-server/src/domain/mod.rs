//! Domain layer: configuration.

pub mod config;

pub use config::{ConfigError, FileConfig, ServerConfig};
