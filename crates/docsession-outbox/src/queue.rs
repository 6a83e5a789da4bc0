//! Coalescing send queue for a single session.
//!
//! Producers (engine callback threads) push frames with [`SenderQueue::enqueue`];
//! the transport writer pulls them with [`SenderQueue::dequeue`] and parks on
//! [`SenderQueue::ready`] in between. Tiles, cursor rectangles and progress
//! values are state rather than events, so a newer one replaces the queued
//! older one and moves to the tail. Everything else is plain FIFO.

use crate::item::EventItem;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Outcome of a single push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Pushed {
    pub len: usize,
    pub replaced: bool,
    pub dropped: bool,
}

/// A queue of frames to send to one session's transport.
pub struct SenderQueue {
    session_id: String,
    queue: Mutex<VecDeque<EventItem>>,
    /// Child of the process-wide termination token.
    stop: CancellationToken,
    ready: Notify,
}

impl SenderQueue {
    /// Create a queue that also stops when `termination` is cancelled.
    pub fn new(session_id: &str, termination: &CancellationToken) -> Self {
        Self {
            session_id: session_id.to_string(),
            queue: Mutex::new(VecDeque::new()),
            stop: termination.child_token(),
            ready: Notify::new(),
        }
    }

    /// Create a queue that only stops through [`SenderQueue::stop`].
    pub fn standalone(session_id: &str) -> Self {
        Self::new(session_id, &CancellationToken::new())
    }

    /// Get the session ID.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// True once this queue was stopped or the process is terminating.
    pub fn stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Stop accepting and handing out items. Idempotent.
    ///
    /// Queued items stay in memory; use [`SenderQueue::flush`] for a final
    /// delivery attempt.
    pub fn stop(&self) {
        if !self.stop.is_cancelled() {
            debug!(session_id = %self.session_id, "Stopping sender queue");
        }
        self.stop.cancel();
    }

    /// Enqueue an item, replacing any queued item it supersedes.
    ///
    /// Returns the queue length after the call. Items are dropped silently
    /// while stopping.
    pub fn enqueue(&self, item: EventItem) -> usize {
        if item.missing_dedup_key() {
            debug!(session_id = %self.session_id, tag = %item.tag(), "Queueing item without dedup key");
        }
        let tag = item.tag().to_owned();

        let pushed = self.push(item);
        if pushed.dropped {
            trace!(session_id = %self.session_id, tag = %tag, "Dropped item on stopping queue");
        } else if pushed.replaced {
            trace!(session_id = %self.session_id, tag = %tag, "Replaced queued item");
        }
        pushed.len
    }

    /// Enqueue without logging, for callers that hold other locks.
    pub(crate) fn push(&self, item: EventItem) -> Pushed {
        let mut queue = self.queue.lock();

        if self.stopping() {
            return Pushed {
                len: queue.len(),
                replaced: false,
                dropped: true,
            };
        }

        let replaced = match item.dedup_key() {
            Some(key) => match queue.iter().position(|cur| cur.dedup_key() == Some(key)) {
                Some(pos) => {
                    queue.remove(pos);
                    true
                }
                None => false,
            },
            None => false,
        };

        queue.push_back(item);
        let len = queue.len();
        drop(queue);

        self.ready.notify_one();
        Pushed {
            len,
            replaced,
            dropped: false,
        }
    }

    /// Dequeue the head item, if any. Returns `None` when empty or stopping.
    pub fn dequeue(&self) -> Option<EventItem> {
        if self.stopping() {
            trace!(session_id = %self.session_id, "Sender queue stopping");
            return None;
        }

        self.queue.lock().pop_front()
    }

    /// Get the number of queued items.
    pub fn size(&self) -> usize {
        self.queue.lock().len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Take every queued item, even after [`SenderQueue::stop`].
    pub fn flush(&self) -> Vec<EventItem> {
        let mut queue = self.queue.lock();
        queue.drain(..).collect()
    }

    /// Wait until an item was enqueued since the last wake-up, or the queue stops.
    ///
    /// A wake-up fired while nobody was waiting is kept, so a consumer that
    /// polls, finds nothing, and then waits never misses an enqueue.
    pub async fn ready(&self) {
        tokio::select! {
            _ = self.ready.notified() => {}
            _ = self.stop.cancelled() => {}
        }
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.queue.is_locked()
    }
}
