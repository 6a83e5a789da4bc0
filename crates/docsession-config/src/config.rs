//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the configured log level.
pub const LOG_LEVEL_ENV: &str = "DOCSESSION_LOG_LEVEL";

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Delivery tuning.
    #[serde(default)]
    pub outbox: OutboxSettings,
}

/// Delivery tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxSettings {
    /// Fallback poll interval of the transport writer, in milliseconds.
    pub writer_poll_interval_ms: u64,
    /// Editing speed measurement window, in milliseconds.
    pub editor_speed_window_ms: u64,
}

impl Default for OutboxSettings {
    fn default() -> Self {
        Self {
            writer_poll_interval_ms: 1000,
            editor_speed_window_ms: 5000,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            outbox: OutboxSettings::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Reject settings the delivery loop cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.outbox.writer_poll_interval_ms == 0 {
            return Err(CoreError::Config(
                "outbox.writer_poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.outbox.editor_speed_window_ms == 0 {
            return Err(CoreError::Config(
                "outbox.editor_speed_window_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Only log_level can be overridden at runtime.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var(LOG_LEVEL_ENV) {
            if !log_level.trim().is_empty() {
                self.log_level = log_level.trim().to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.outbox.writer_poll_interval_ms, 1000);
        assert_eq!(config.outbox.editor_speed_window_ms, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "log_level": "debug",
            "outbox": { "writer_poll_interval_ms": 250 }
        }"#;

        std::fs::write(&config_path, config_json).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.outbox.writer_poll_interval_ms, 250);
        assert_eq!(config.outbox.editor_speed_window_ms, 5000);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "{}").unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.outbox.editor_speed_window_ms = 2000;
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.outbox.editor_speed_window_ms, 2000);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.outbox, OutboxSettings::default());
    }

    #[test]
    fn test_config_invalid_json() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "not json").unwrap();

        let result = Config::load_from_file(&config_path);
        assert!(matches!(result, Err(CoreError::Json(_))));
    }

    #[test]
    fn test_config_rejects_zero_poll_interval() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.outbox.writer_poll_interval_ms = 0;
        config.save(&paths).unwrap();

        let result = Config::load(&paths);
        assert!(matches!(result, Err(CoreError::Config(_))));
    }
}
