//! Tracing setup for catalog binaries.
//!
//! # Usage
//!
//! ```ignore
//! use catalog_common::telemetry::{self, TelemetryConfig};
//!
//! fn main() {
//!     telemetry::init(TelemetryConfig::from_env("catalog-cli"));
//!     tracing::info!("started");
//! }
//! ```

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for labeling (e.g., "catalog-cli")
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// Load config from environment variables.
    ///
    /// - `RUST_LOG`: Standard env filter (optional, overrides console_level)
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }

    /// Use `level` unless `RUST_LOG` says otherwise.
    pub fn with_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }
}

/// Install the console subscriber.
///
/// Call once at startup. Logs go to stderr so command output on stdout stays
/// clean for piping. A second call is a no-op.
pub fn init(config: TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    if tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!(service = %config.service_name, "telemetry initialized");
    }
}
