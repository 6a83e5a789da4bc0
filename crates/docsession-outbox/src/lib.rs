//! Per-session outbound event delivery for shared document editing.
//!
//! This crate provides:
//! - SenderQueue: coalescing FIFO of frames for one client connection
//! - StateRecorder: minimal catch-up state kept while a client is inactive
//! - DocumentSession: routes engine callbacks and replays on reactivation
//! - SessionManager: owns sessions and the process-wide termination token
//! - run_writer: drains a queue into a client transport

mod callback;
mod document;
mod error;
mod item;
mod manager;
mod queue;
mod recorder;
mod session;
mod speed;
mod writer;

#[cfg(test)]
mod test_support;

pub use callback::{
    full_invalidate_payload, is_save_notification, state_name, to_frames, CallbackKind, RecordAs,
    FULL_EXTENT,
};
pub use document::{DocumentInfo, DocumentView, StaticDocument};
pub use error::{OutboxError, OutboxResult};
pub use item::{
    DedupKey, EventItem, TileKey, ViewId, TAG_INVALIDATE_CURSOR, TAG_INVALIDATE_VIEW_CURSOR,
    TAG_STATUS_INDICATOR_SET_VALUE, TAG_TILE,
};
pub use manager::{SessionManager, SessionStatus};
pub use queue::SenderQueue;
pub use recorder::{RecordedEvent, ReplayBatch, StateRecorder};
pub use session::{DocumentSession, SessionConfig};
pub use speed::{EditorSpeed, DEFAULT_SPEED_WINDOW};
pub use writer::{flush_remaining, run_writer, Transport, WriterConfig};
