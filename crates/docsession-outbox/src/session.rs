//! A client's document session: routes engine callbacks to the send queue
//! while the client is active, and to the state recorder while it is not.
//!
//! Lock order is always engine document (inside [`DocumentView`]) first and
//! released, then the routing lock, then the queue lock. The routing lock
//! guards the activity flag together with the recorder, so a callback racing
//! a reactivation is either recorded before the drain or forwarded after the
//! replay, never both and never lost.

use crate::callback::{is_save_notification, state_name, to_frames, CallbackKind, RecordAs};
use crate::document::{DocumentInfo, DocumentView};
use crate::item::{EventItem, ViewId};
use crate::queue::SenderQueue;
use crate::recorder::StateRecorder;
use crate::speed::{EditorSpeed, DEFAULT_SPEED_WINDOW};
use crate::OutboxResult;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whether the client starts out active.
    pub start_active: bool,
    /// Window for the editing speed measurement.
    pub speed_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_active: true,
            speed_window: DEFAULT_SPEED_WINDOW,
        }
    }
}

struct Routing {
    active: bool,
    recorder: StateRecorder,
}

/// One client's view of a shared document.
pub struct DocumentSession {
    session_id: String,
    view: Arc<dyn DocumentView>,
    queue: Arc<SenderQueue>,
    routing: Mutex<Routing>,
    speed: Mutex<EditorSpeed>,
    closing: AtomicBool,
    disconnected: AtomicBool,
}

impl DocumentSession {
    /// Create a session whose queue stops when `termination` is cancelled.
    pub fn new(
        session_id: &str,
        view: Arc<dyn DocumentView>,
        termination: &CancellationToken,
        config: SessionConfig,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            view,
            queue: Arc::new(SenderQueue::new(session_id, termination)),
            routing: Mutex::new(Routing {
                active: config.start_active,
                recorder: StateRecorder::new(),
            }),
            speed: Mutex::new(EditorSpeed::new(config.speed_window)),
            closing: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Get the session ID.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The queue the transport writer drains.
    pub fn queue(&self) -> &Arc<SenderQueue> {
        &self.queue
    }

    pub fn is_active(&self) -> bool {
        self.routing.lock().active
    }

    /// Number of entries waiting in the recorder.
    pub fn recorded_count(&self) -> usize {
        self.routing.lock().recorder.len()
    }

    /// Cursor invalidations inside the speed window.
    pub fn editor_speed(&self) -> usize {
        self.speed.lock().current(Instant::now())
    }

    /// Mark the session as closing; later callbacks are skipped and the
    /// queue stops.
    pub fn close(&self) {
        if !self.closing.swap(true, Ordering::SeqCst) {
            debug!(session_id = %self.session_id, "Closing session");
        }
        self.queue.stop();
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// Engine callback entry point. May be called from any thread.
    pub fn on_event(&self, kind: CallbackKind, payload: &str) {
        trace!(session_id = %self.session_id, kind = ?kind, payload = %payload, "Engine callback");

        if self.is_closing() {
            trace!(session_id = %self.session_id, kind = ?kind, "Skipping callback on closing session");
            return;
        }
        if self.is_disconnected() {
            trace!(session_id = %self.session_id, kind = ?kind, "Skipping callback on disconnected session");
            return;
        }

        // Read engine state before taking any session lock.
        let doc = if kind.needs_document_info() {
            self.view.document_info()
        } else {
            DocumentInfo::default()
        };

        let recorded = {
            let mut routing = self.routing.lock();
            if routing.active {
                None
            } else {
                Some(record(&mut routing.recorder, kind, payload))
            }
        };

        if let Some(recorded) = recorded {
            if let Err(e) = recorded {
                warn!(session_id = %self.session_id, kind = ?kind, error = %e, "Not recording view event without viewId");
            }
            if !is_save_notification(kind, payload) {
                trace!(session_id = %self.session_id, kind = ?kind, "Recorded callback on inactive session");
                return;
            }
        }

        self.deliver(kind, payload, &doc);
    }

    /// Switch between live forwarding and recording.
    ///
    /// Becoming active replays everything recorded since the session went
    /// inactive before any newer callback is forwarded. Returns the number of
    /// replayed callbacks; zero when the session already was active.
    pub fn set_active(&self, active: bool) -> usize {
        if !active {
            let switched = {
                let mut routing = self.routing.lock();
                std::mem::replace(&mut routing.active, false)
            };
            if switched {
                debug!(session_id = %self.session_id, "Session inactive, recording state");
            }
            return 0;
        }

        let doc = self.view.document_info();

        // Replayed frames go straight into the queue under the routing lock so
        // live callbacks cannot overtake them; nothing is logged until unlock.
        let mut routing = self.routing.lock();
        if routing.active {
            return 0;
        }

        let callbacks = routing
            .recorder
            .drain_and_clear()
            .into_callbacks(doc.current_part);

        let mut stats = ReplayStats::default();
        if !doc.is_text {
            let part = format!("part={}", doc.current_part);
            stats.push(&self.queue, EventItem::text("curpart", &part));
            stats.push(&self.queue, EventItem::text("setpart", &part));
        }
        for (kind, payload) in &callbacks {
            if *kind == CallbackKind::InvalidateVisibleCursor {
                self.speed.lock().tick(Instant::now());
            }
            for frame in to_frames(*kind, payload, &doc) {
                stats.push(&self.queue, frame);
            }
        }

        routing.active = true;
        drop(routing);

        for (kind, payload) in &callbacks {
            trace!(session_id = %self.session_id, kind = ?kind, payload = %payload, "Replayed missed event");
        }
        if stats.unkeyed > 0 {
            debug!(session_id = %self.session_id, unkeyed = stats.unkeyed, "Replayed items without dedup key");
        }
        info!(
            session_id = %self.session_id,
            replayed = callbacks.len(),
            frames = stats.frames,
            replaced = stats.replaced,
            dropped = stats.dropped,
            "Finished replaying messages"
        );
        callbacks.len()
    }

    fn deliver(&self, kind: CallbackKind, payload: &str, doc: &DocumentInfo) {
        if kind == CallbackKind::InvalidateVisibleCursor {
            self.speed.lock().tick(Instant::now());
        }

        for frame in to_frames(kind, payload, doc) {
            self.queue.enqueue(frame);
        }
    }
}

/// Counters gathered while replaying under the routing lock.
#[derive(Debug, Default)]
struct ReplayStats {
    frames: usize,
    replaced: usize,
    dropped: usize,
    unkeyed: usize,
}

impl ReplayStats {
    fn push(&mut self, queue: &SenderQueue, frame: EventItem) {
        self.unkeyed += usize::from(frame.missing_dedup_key());
        let pushed = queue.push(frame);
        self.frames += 1;
        self.replaced += usize::from(pushed.replaced);
        self.dropped += usize::from(pushed.dropped);
    }
}

/// Store a callback in its replay bucket. Runs under the routing lock, so it
/// reports rather than logs.
fn record(
    recorder: &mut StateRecorder,
    kind: CallbackKind,
    payload: &str,
) -> OutboxResult<()> {
    match kind.record_as() {
        RecordAs::Invalidate => recorder.record_invalidate(),
        RecordAs::Scalar => recorder.record_event(kind, payload),
        RecordAs::View => {
            let view_id = ViewId::from_json(payload)?;
            recorder.record_view_event(view_id, kind, payload);
        }
        RecordAs::State => {
            if let Some(name) = state_name(payload) {
                recorder.record_state(name, payload);
            }
        }
        RecordAs::Sequence => recorder.record_event_sequence(kind, payload),
        RecordAs::Drop => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StaticDocument;

    fn text_session() -> DocumentSession {
        DocumentSession::new(
            "session-1",
            Arc::new(StaticDocument::default()),
            &CancellationToken::new(),
            SessionConfig::default(),
        )
    }

    fn spreadsheet_session(doc: Arc<StaticDocument>) -> DocumentSession {
        DocumentSession::new(
            "session-1",
            doc,
            &CancellationToken::new(),
            SessionConfig::default(),
        )
    }

    fn drain(session: &DocumentSession) -> Vec<String> {
        std::iter::from_fn(|| session.queue().dequeue())
            .map(|item| String::from_utf8(item.into_data()).unwrap())
            .collect()
    }

    #[test]
    fn test_active_session_forwards() {
        let session = text_session();
        assert!(session.is_active());

        session.on_event(CallbackKind::TextSelection, "1, 2, 3, 4");
        session.on_event(CallbackKind::Comment, "{}");

        assert_eq!(drain(&session), vec!["textselection: 1, 2, 3, 4", "comment: {}"]);
    }

    #[test]
    fn test_inactive_session_records_instead_of_forwarding() {
        let session = text_session();
        session.set_active(false);

        session.on_event(CallbackKind::TextSelection, "1");
        session.on_event(CallbackKind::MousePointer, "text");

        assert!(session.queue().is_empty());
        assert_eq!(session.recorded_count(), 1);
    }

    #[test]
    fn test_save_result_passes_through_while_inactive() {
        let session = text_session();
        session.set_active(false);

        session.on_event(
            CallbackKind::UnoCommandResult,
            r#"{"commandName": ".uno:Save", "success": true}"#,
        );
        session.on_event(CallbackKind::UnoCommandResult, r#"{"commandName": ".uno:Bold"}"#);

        let frames = drain(&session);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains(".uno:Save"));
    }

    #[test]
    fn test_reactivation_replays_then_goes_live() {
        let session = text_session();
        session.set_active(false);

        session.on_event(CallbackKind::Comment, "C1");
        session.on_event(CallbackKind::InvalidateTiles, "0, 0, 10, 10, 0");
        session.on_event(CallbackKind::CellCursor, "old");
        session.on_event(CallbackKind::CellCursor, "new");

        assert_eq!(session.set_active(true), 3);
        session.on_event(CallbackKind::Comment, "C2");

        assert_eq!(
            drain(&session),
            vec![
                "invalidatetiles: part=0 x=0 y=0 width=2147483647 height=2147483647",
                "cellcursor: new",
                "comment: C1",
                "comment: C2",
            ]
        );
        assert_eq!(session.recorded_count(), 0);
    }

    #[test]
    fn test_second_activation_replays_nothing() {
        let session = text_session();
        session.set_active(false);
        session.on_event(CallbackKind::Comment, "C1");

        assert_eq!(session.set_active(true), 1);
        assert_eq!(session.set_active(true), 0);
        assert_eq!(drain(&session), vec!["comment: C1"]);
    }

    #[test]
    fn test_non_text_reactivation_sends_part_first() {
        let doc = Arc::new(StaticDocument::new(DocumentInfo {
            is_text: false,
            current_part: 2,
            part_count: 3,
        }));
        let session = spreadsheet_session(doc.clone());
        session.set_active(false);
        session.on_event(CallbackKind::InvalidateTiles, "0, 0, 10, 10, 1");

        session.set_active(true);

        assert_eq!(
            drain(&session),
            vec![
                "curpart: part=2",
                "setpart: part=2",
                "invalidatetiles: part=2 x=0 y=0 width=2147483647 height=2147483647",
            ]
        );
    }

    #[test]
    fn test_view_event_without_view_id_is_not_recorded() {
        let session = text_session();
        session.set_active(false);

        session.on_event(CallbackKind::InvalidateViewCursor, "not json");
        session.on_event(CallbackKind::ViewLock, r#"{"viewId": 3, "rectangle": "EMPTY"}"#);

        assert_eq!(session.recorded_count(), 1);
    }

    #[test]
    fn test_state_without_name_is_not_recorded() {
        let session = text_session();
        session.set_active(false);

        session.on_event(CallbackKind::StateChanged, "garbage");
        session.on_event(CallbackKind::StateChanged, ".uno:Bold=true");
        session.on_event(CallbackKind::StateChanged, ".uno:Bold=false");

        assert_eq!(session.recorded_count(), 1);
        session.set_active(true);
        assert_eq!(drain(&session), vec!["statechanged: .uno:Bold=false"]);
    }

    #[test]
    fn test_closing_session_skips_callbacks() {
        let session = text_session();
        session.close();
        session.close();

        session.on_event(CallbackKind::Comment, "C1");
        assert!(session.is_closing());
        assert!(session.queue().stopping());
        assert!(session.queue().flush().is_empty());
    }

    #[test]
    fn test_disconnected_session_skips_callbacks() {
        let session = text_session();
        session.set_disconnected(true);
        session.on_event(CallbackKind::Comment, "C1");
        assert!(session.queue().is_empty());

        session.set_disconnected(false);
        session.on_event(CallbackKind::Comment, "C2");
        assert_eq!(drain(&session), vec!["comment: C2"]);
    }

    #[test]
    fn test_cursor_invalidation_ticks_speed() {
        let session = text_session();
        session.on_event(CallbackKind::InvalidateVisibleCursor, "1, 1, 1, 1");
        session.on_event(CallbackKind::InvalidateVisibleCursor, "2, 2, 1, 1");

        assert_eq!(session.editor_speed(), 2);
        assert_eq!(session.queue().size(), 1);
    }

    #[test]
    fn test_logging_never_runs_under_session_locks() {
        let session = Arc::new(text_session());
        let watched = session.clone();
        let (_guard, held) = crate::test_support::capture_lock_state(move || {
            watched.routing.is_locked() || watched.queue().is_locked()
        });

        session.set_active(false);
        session.on_event(CallbackKind::InvalidateViewCursor, "not json");
        session.on_event(CallbackKind::Comment, "C1");
        session.on_event(CallbackKind::InvalidateTiles, "0, 0, 10, 10, 0");
        session.on_event(CallbackKind::InvalidateVisibleCursor, "1, 1, 1, 1");
        assert_eq!(session.set_active(true), 3);
        session.on_event(CallbackKind::Comment, "C2");
        session.on_event(CallbackKind::InvalidateVisibleCursor, "2, 2, 1, 1");
        session.on_event(CallbackKind::InvalidateVisibleCursor, "3, 3, 1, 1");

        let held = held.lock();
        assert!(!held.is_empty());
        assert!(held.iter().all(|locked| !locked), "log written under lock: {held:?}");
    }

    #[test]
    fn test_recording_races_with_reactivation() {
        let session = Arc::new(text_session());
        session.set_active(false);

        let producer = {
            let session = session.clone();
            std::thread::spawn(move || {
                for i in 0..500 {
                    session.on_event(CallbackKind::Comment, &i.to_string());
                }
            })
        };
        session.set_active(true);
        producer.join().unwrap();

        let frames = drain(&session);
        assert_eq!(frames.len(), 500);
        let expected: Vec<String> = (0..500).map(|i| format!("comment: {i}")).collect();
        assert_eq!(frames, expected);
        assert_eq!(session.recorded_count(), 0);
    }
}
