//! Logging initialization.
//!
//! Wraps the observability crate. By default every service writes structured
//! JSONL to `~/.docsession/logs/dev.jsonl` and mirrors compact lines to
//! stderr; `DOCSESSION_LOG_FORMAT=compact` switches to stderr only.

use crate::{CoreResult, Paths};
use observability::{LogConfig, LogFormat};

const LOG_FORMAT_ENV: &str = "DOCSESSION_LOG_FORMAT";

/// Initialize the logging system.
///
/// `level` is the default filter; `RUST_LOG` takes precedence when set.
pub fn init_logging(level: &str, paths: &Paths) -> CoreResult<()> {
    let format = log_format_from_env(std::env::var(LOG_FORMAT_ENV).ok().as_deref());

    observability::init_with_config(LogConfig {
        service_name: "docsession".into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr: true,
        format,
    })?;
    Ok(())
}

fn log_format_from_env(raw: Option<&str>) -> LogFormat {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("compact") | Some("text") => LogFormat::Compact,
        _ => LogFormat::Jsonl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_jsonl() {
        assert_eq!(log_format_from_env(None), LogFormat::Jsonl);
        assert_eq!(log_format_from_env(Some("jsonl")), LogFormat::Jsonl);
        assert_eq!(log_format_from_env(Some(" Compact ")), LogFormat::Compact);
    }
}
