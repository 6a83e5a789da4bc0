//! Recorded callback traces.
//!
//! A trace is JSON lines, each one of:
//! `{"kind": "comment", "payload": "..."}` for an engine callback,
//! `{"active": false}` to switch the client's activity, or
//! `{"part": 2}` to move the client's view to another part.

use docsession_outbox::CallbackKind;
use serde::Deserialize;
use std::io::BufRead;
use thiserror::Error;

/// One step of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TraceStep {
    Event {
        kind: CallbackKind,
        #[serde(default)]
        payload: String,
    },
    Active {
        active: bool,
    },
    Part {
        part: i32,
    },
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// Parse a trace, skipping blank lines and `#` comments.
pub fn parse_trace(reader: impl BufRead) -> Result<Vec<TraceStep>, TraceError> {
    let mut steps = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step = serde_json::from_str(trimmed).map_err(|source| TraceError::Parse {
            line: index + 1,
            source,
        })?;
        steps.push(step);
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace() {
        let input = r#"
# a client goes away and comes back
{"active": false}
{"kind": "comment", "payload": "C1"}
{"kind": "invalidate-tiles", "payload": "0, 0, 10, 10, 0"}
{"part": 1}
{"kind": "status-indicator-finish"}
{"active": true}
"#;

        let steps = parse_trace(input.as_bytes()).unwrap();
        assert_eq!(
            steps,
            vec![
                TraceStep::Active { active: false },
                TraceStep::Event {
                    kind: CallbackKind::Comment,
                    payload: "C1".to_string()
                },
                TraceStep::Event {
                    kind: CallbackKind::InvalidateTiles,
                    payload: "0, 0, 10, 10, 0".to_string()
                },
                TraceStep::Part { part: 1 },
                TraceStep::Event {
                    kind: CallbackKind::StatusIndicatorFinish,
                    payload: String::new()
                },
                TraceStep::Active { active: true },
            ]
        );
    }

    #[test]
    fn test_parse_trace_reports_line() {
        let input = "{\"active\": true}\n{\"kind\": \"no-such-kind\"}\n";

        let err = parse_trace(input.as_bytes()).unwrap_err();
        assert!(matches!(err, TraceError::Parse { line: 2, .. }));
    }
}
