//! State recorder for inactive sessions.
//!
//! While a client is inactive its session does not forward engine events.
//! Instead the recorder keeps the smallest set of events that brings the client
//! back to the current state: one pending full invalidation, the latest value
//! of every piece of per-session and per-view state, and the full history of
//! additive notifications (comments, tracked changes).

use crate::callback::{full_invalidate_payload, CallbackKind};
use crate::item::ViewId;
use std::collections::BTreeMap;

/// An engine event kept for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: CallbackKind,
    pub payload: String,
}

impl RecordedEvent {
    fn new(kind: CallbackKind, payload: &str) -> Self {
        Self {
            kind,
            payload: payload.to_string(),
        }
    }
}

/// Everything recorded since the session went inactive.
#[derive(Debug, Default)]
pub struct StateRecorder {
    invalidate: bool,
    events: BTreeMap<CallbackKind, RecordedEvent>,
    view_events: BTreeMap<(CallbackKind, ViewId), RecordedEvent>,
    states: BTreeMap<String, RecordedEvent>,
    sequence: Vec<RecordedEvent>,
}

impl StateRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_invalidate(&mut self) {
        self.invalidate = true;
    }

    /// Keep the latest event of `kind`.
    pub fn record_event(&mut self, kind: CallbackKind, payload: &str) {
        self.events.insert(kind, RecordedEvent::new(kind, payload));
    }

    /// Keep the latest event of `kind` for one collaborator view.
    pub fn record_view_event(&mut self, view_id: ViewId, kind: CallbackKind, payload: &str) {
        self.view_events
            .insert((kind, view_id), RecordedEvent::new(kind, payload));
    }

    /// Keep the latest transition of the named document state.
    pub fn record_state(&mut self, name: &str, payload: &str) {
        self.states.insert(
            name.to_string(),
            RecordedEvent::new(CallbackKind::StateChanged, payload),
        );
    }

    /// Append an event whose history matters.
    pub fn record_event_sequence(&mut self, kind: CallbackKind, payload: &str) {
        self.sequence.push(RecordedEvent::new(kind, payload));
    }

    pub fn is_invalidate(&self) -> bool {
        self.invalidate
    }

    /// Number of recorded entries, counting a pending invalidation as one.
    pub fn len(&self) -> usize {
        usize::from(self.invalidate)
            + self.events.len()
            + self.view_events.len()
            + self.states.len()
            + self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything recorded, leaving the recorder empty.
    pub fn drain_and_clear(&mut self) -> ReplayBatch {
        let recorder = std::mem::take(self);
        ReplayBatch {
            invalidate: recorder.invalidate,
            view_events: recorder.view_events.into_values().collect(),
            events: recorder.events.into_values().collect(),
            states: recorder.states.into_values().collect(),
            sequence: recorder.sequence,
        }
    }
}

/// A drained recorder, ready to be replayed.
#[derive(Debug, Default)]
pub struct ReplayBatch {
    pub invalidate: bool,
    pub view_events: Vec<RecordedEvent>,
    pub events: Vec<RecordedEvent>,
    pub states: Vec<RecordedEvent>,
    pub sequence: Vec<RecordedEvent>,
}

impl ReplayBatch {
    pub fn is_empty(&self) -> bool {
        !self.invalidate
            && self.view_events.is_empty()
            && self.events.is_empty()
            && self.states.is_empty()
            && self.sequence.is_empty()
    }

    /// The events to feed back through the callback path, in replay order:
    /// invalidation, per-view state, per-session state, named states, then
    /// the history in recording order.
    pub fn into_callbacks(self, current_part: i32) -> Vec<(CallbackKind, String)> {
        let invalidate = self
            .invalidate
            .then(|| (CallbackKind::InvalidateTiles, full_invalidate_payload(current_part)));

        invalidate
            .into_iter()
            .chain(
                self.view_events
                    .into_iter()
                    .chain(self.events)
                    .chain(self.states)
                    .chain(self.sequence)
                    .map(|event| (event.kind, event.payload)),
            )
            .collect()
    }
}
