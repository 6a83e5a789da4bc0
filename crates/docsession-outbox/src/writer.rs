//! Transport writer: drains a session's queue into its client connection.

use crate::item::EventItem;
use crate::queue::SenderQueue;
use crate::{OutboxError, OutboxResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A client connection frames are written to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one frame.
    async fn send(&self, frame: &[u8]) -> OutboxResult<()>;
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Fallback poll interval in milliseconds when no wake-up arrives.
    pub poll_interval_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

/// Forward queued frames until the queue stops.
///
/// Returns the number of frames written. A transport error stops the queue
/// and is returned.
pub async fn run_writer(
    queue: Arc<SenderQueue>,
    transport: Arc<dyn Transport>,
    config: WriterConfig,
) -> OutboxResult<usize> {
    let poll = Duration::from_millis(config.poll_interval_ms.max(1));
    let mut sent = 0usize;

    debug!(session_id = %queue.session_id(), "Writer started");

    loop {
        while let Some(item) = queue.dequeue() {
            if let Err(e) = write_item(&queue, transport.as_ref(), &item).await {
                queue.stop();
                return Err(e);
            }
            sent += 1;
        }

        if queue.stopping() {
            break;
        }

        tokio::select! {
            _ = queue.ready() => {}
            _ = tokio::time::sleep(poll) => {}
        }
    }

    info!(session_id = %queue.session_id(), sent, "Writer stopped");
    Ok(sent)
}

/// Write whatever is still queued after the writer stopped, in queue order.
///
/// Returns the number of frames written. Await the writer task first so the
/// remaining frames go out after everything it already sent.
pub async fn flush_remaining(queue: &SenderQueue, transport: &dyn Transport) -> OutboxResult<usize> {
    let remaining = queue.flush();
    let count = remaining.len();
    for item in &remaining {
        write_item(queue, transport, item).await?;
    }
    if count > 0 {
        debug!(session_id = %queue.session_id(), flushed = count, "Flushed remaining frames");
    }
    Ok(count)
}

async fn write_item(
    queue: &SenderQueue,
    transport: &dyn Transport,
    item: &EventItem,
) -> OutboxResult<()> {
    transport.send(item.data()).await.map_err(|e| {
        warn!(
            session_id = %queue.session_id(),
            tag = %item.tag(),
            error = %e,
            "Transport write failed"
        );
        match e {
            OutboxError::Transport(_) => e,
            other => OutboxError::Transport(other.to_string()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        frames: Mutex<Vec<String>>,
    }

    impl RecordingTransport {
        fn frames(&self) -> Vec<String> {
            self.frames.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, frame: &[u8]) -> OutboxResult<()> {
            self.frames
                .lock()
                .push(String::from_utf8_lossy(frame).into_owned());
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn send(&self, _frame: &[u8]) -> OutboxResult<()> {
            Err(OutboxError::Transport("connection reset".to_string()))
        }
    }

    async fn wait_for(transport: &RecordingTransport, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while transport.frames().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_writer_config_default() {
        let config = WriterConfig::default();
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[tokio::test]
    async fn test_writer_forwards_in_order() {
        let queue = Arc::new(SenderQueue::standalone("session-1"));
        let transport = Arc::new(RecordingTransport::default());

        queue.enqueue(EventItem::text("comment", "C1"));
        let handle = tokio::spawn(run_writer(
            queue.clone(),
            transport.clone(),
            WriterConfig::default(),
        ));

        wait_for(&transport, 1).await;
        queue.enqueue(EventItem::text("comment", "C2"));
        queue.enqueue(EventItem::text("comment", "C3"));
        wait_for(&transport, 3).await;

        queue.stop();
        let sent = handle.await.unwrap().unwrap();

        assert_eq!(sent, 3);
        assert_eq!(
            transport.frames(),
            vec!["comment: C1", "comment: C2", "comment: C3"]
        );
    }

    #[tokio::test]
    async fn test_writer_exits_on_stop_while_idle() {
        let queue = Arc::new(SenderQueue::standalone("session-1"));
        let transport = Arc::new(RecordingTransport::default());

        let handle = tokio::spawn(run_writer(
            queue.clone(),
            transport.clone(),
            WriterConfig {
                poll_interval_ms: 60_000,
            },
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.stop();

        let sent = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn test_flush_remaining_after_stop() {
        let queue = Arc::new(SenderQueue::standalone("session-1"));
        let transport = Arc::new(RecordingTransport::default());

        // The writer never got to these before the queue stopped.
        queue.enqueue(EventItem::text("comment", "C1"));
        queue.enqueue(EventItem::text("comment", "C2"));
        queue.stop();

        let sent = run_writer(queue.clone(), transport.clone(), WriterConfig::default())
            .await
            .unwrap();
        assert_eq!(sent, 0);

        let flushed = flush_remaining(&queue, transport.as_ref()).await.unwrap();
        assert_eq!(flushed, 2);
        assert!(queue.is_empty());
        assert_eq!(transport.frames(), vec!["comment: C1", "comment: C2"]);
        assert_eq!(flush_remaining(&queue, transport.as_ref()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_stops_queue() {
        let queue = Arc::new(SenderQueue::standalone("session-1"));
        queue.enqueue(EventItem::text("comment", "C1"));

        let result = run_writer(queue.clone(), Arc::new(FailingTransport), WriterConfig::default()).await;

        assert!(matches!(result, Err(OutboxError::Transport(_))));
        assert!(queue.stopping());
    }
}
