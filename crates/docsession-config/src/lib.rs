//! Configuration, paths, and logging setup shared by docsession binaries.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, OutboxSettings, DEFAULT_LOG_LEVEL, LOG_LEVEL_ENV};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
