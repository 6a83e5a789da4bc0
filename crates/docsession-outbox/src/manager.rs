//! Session manager for coordinating per-client document sessions.

use crate::document::DocumentView;
use crate::session::{DocumentSession, SessionConfig};
use crate::{OutboxError, OutboxResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Session manager owns every session and the process-wide termination token.
pub struct SessionManager {
    termination: CancellationToken,
    sessions: RwLock<HashMap<String, Arc<DocumentSession>>>,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new() -> Self {
        Self::with_termination(CancellationToken::new())
    }

    /// Create a manager whose sessions stop when `termination` is cancelled.
    pub fn with_termination(termination: CancellationToken) -> Self {
        Self {
            termination,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide termination token.
    pub fn termination_token(&self) -> &CancellationToken {
        &self.termination
    }

    /// Register a new session.
    pub fn create_session(
        &self,
        session_id: &str,
        view: Arc<dyn DocumentView>,
        config: SessionConfig,
    ) -> OutboxResult<Arc<DocumentSession>> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(session_id) {
            return Err(OutboxError::SessionExists(session_id.to_string()));
        }

        let session = Arc::new(DocumentSession::new(
            session_id,
            view,
            &self.termination,
            config,
        ));
        sessions.insert(session_id.to_string(), session.clone());
        drop(sessions);

        info!(session_id = %session_id, "Created session");
        Ok(session)
    }

    /// Get a session by ID.
    pub fn get(&self, session_id: &str) -> Option<Arc<DocumentSession>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Switch a session between live delivery and recording.
    pub fn set_active(&self, session_id: &str, active: bool) -> OutboxResult<usize> {
        let session = self
            .get(session_id)
            .ok_or_else(|| OutboxError::SessionNotFound(session_id.to_string()))?;
        Ok(session.set_active(active))
    }

    /// Remove a session and stop its queue.
    pub fn remove(&self, session_id: &str) -> Option<Arc<DocumentSession>> {
        let session = self.sessions.write().remove(session_id)?;
        session.close();
        info!(session_id = %session_id, "Removed session");
        Some(session)
    }

    /// Stop every session queue at once.
    pub fn terminate(&self) {
        if !self.termination.is_cancelled() {
            let count = self.session_count();
            info!(sessions = count, "Terminating all sessions");
        }
        self.termination.cancel();
    }

    pub fn is_terminating(&self) -> bool {
        self.termination.is_cancelled()
    }

    /// Get status for all sessions.
    pub fn status(&self) -> HashMap<String, SessionStatus> {
        let status: HashMap<_, _> = self
            .sessions
            .read()
            .iter()
            .map(|(id, session)| {
                (
                    id.clone(),
                    SessionStatus {
                        queued: session.queue().size(),
                        recorded: session.recorded_count(),
                        active: session.is_active(),
                    },
                )
            })
            .collect();
        debug!(sessions = status.len(), "Collected session status");
        status
    }

    /// Get the number of sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Status of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Number of frames waiting for the transport.
    pub queued: usize,
    /// Number of entries waiting in the recorder.
    pub recorded: usize,
    /// Whether the client is receiving live events.
    pub active: bool,
}
