//! Logger module
//!
//! Provides logging utilities for the proxy:
//! - `tracing` subscriber setup (compact or JSON output)
//! - Server lifecycle logging
//! - Access logging with multiple formats

mod format;

pub use format::AccessLogEntry;

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LoggingConfig};

/// Target used for access log lines, filterable with `RUST_LOG=access=off`
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global `tracing` subscriber
///
/// `RUST_LOG` wins over `logging.level`. Should be called once at
/// application startup.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?,
        _ => registry
            .with(tracing_subscriber::fmt::layer().compact().with_target(true))
            .try_init()?,
    }
    Ok(())
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!(
        listen = %format!("http://{addr}"),
        static_dir = %config.storage.static_dir,
        public_base_url = %config.storage.public_base_url,
        workers = ?config.server.workers,
        max_connections = ?config.performance.max_connections,
        "artifact proxy started"
    );
}

/// Emit one formatted access log line
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}

