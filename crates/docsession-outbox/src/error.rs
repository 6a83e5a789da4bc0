//! Outbox error types.

use thiserror::Error;

/// Outbox error type.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// A payload did not carry the fields a parser needed.
    #[error("Malformed payload for {tag}: {reason}")]
    MalformedPayload { tag: String, reason: String },

    /// Transport write failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session already registered
    #[error("Session already exists: {0}")]
    SessionExists(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OutboxError {
    pub(crate) fn malformed(tag: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;
