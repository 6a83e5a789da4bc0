//! Transport that prints frames to stdout, one per line.

use async_trait::async_trait;
use docsession_outbox::{OutboxError, OutboxResult, Transport};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

pub struct LineTransport<W> {
    out: Mutex<W>,
}

impl<W> LineTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl LineTransport<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> Transport for LineTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, frame: &[u8]) -> OutboxResult<()> {
        let mut out = self.out.lock().await;
        write_line(&mut *out, frame)
            .await
            .map_err(|e| OutboxError::Transport(e.to_string()))
    }
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, frame: &[u8]) -> std::io::Result<()> {
    out.write_all(frame).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
