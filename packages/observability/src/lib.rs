//! # Observability
//!
//! Centralized structured logging for docsession services.
//!
//! Services call [`init_with_config`] once at startup and use the standard
//! `tracing` macros everywhere else. Two outputs are supported:
//!
//! - [`LogFormat::Jsonl`]: structured JSONL appended to
//!   `~/.docsession/logs/dev.jsonl`, one object per line, safe to tail
//!   from other processes (`tail -f ~/.docsession/logs/dev.jsonl | jq`).
//! - [`LogFormat::Compact`]: human-readable lines on stderr.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "docsession".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     })?;
//!     tracing::info!("service started");
//!     Ok(())
//! }
//! ```

mod file_sink;
mod json_layer;

use std::path::PathBuf;
use thiserror::Error;

pub use file_sink::{CentralLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

/// Errors raised while installing the subscriber.
#[derive(Error, Debug)]
pub enum ObservabilityError {
    /// The log file could not be opened
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No home directory to place the default log file in
    #[error("Home directory not found")]
    NoHomeDir,

    /// A global subscriber was already installed
    #[error("Subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Structured JSONL to the central log file.
    #[default]
    Jsonl,
    /// Compact text on stderr only.
    Compact,
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every JSONL line.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.docsession/logs/dev.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr in JSONL mode.
    pub also_stderr: bool,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            format: LogFormat::Jsonl,
        }
    }
}

/// Central log file location for all services.
pub fn default_log_path() -> Result<PathBuf, ObservabilityError> {
    dirs::home_dir()
        .map(|home| home.join(".docsession").join("logs").join("dev.jsonl"))
        .ok_or(ObservabilityError::NoHomeDir)
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) -> Result<(), ObservabilityError> {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    })
}

/// Initialize logging with custom configuration.
pub fn init_with_config(config: LogConfig) -> Result<(), ObservabilityError> {
    match config.format {
        LogFormat::Jsonl => file_sink::init_file_subscriber(&config),
        LogFormat::Compact => {
            use tracing_subscriber::util::SubscriberInitExt;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(&config.default_level))
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact()
                .finish()
                .try_init()
                .map_err(|e| ObservabilityError::AlreadyInitialized(e.to_string()))
        }
    }
}

/// Filter from `RUST_LOG`, or `default_level` when unset or invalid.
pub(crate) fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
