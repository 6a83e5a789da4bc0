//! `replay` command: feed a recorded callback trace through one session.

use crate::trace::{parse_trace, TraceStep};
use crate::transport::LineTransport;
use clap::ValueEnum;
use docsession_config::Config;
use docsession_outbox::{
    flush_remaining, run_writer, DocumentInfo, SessionConfig, SessionManager, StaticDocument,
    Transport, WriterConfig,
};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Kind of document the trace was recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentKind {
    Text,
    Spreadsheet,
    Presentation,
}

/// Options of the `replay` command.
#[derive(Debug, Clone)]
pub struct ReplayArgs {
    pub trace: PathBuf,
    pub session_id: Option<String>,
    pub document: DocumentKind,
    pub parts: i32,
}

impl ReplayArgs {
    fn document_info(&self) -> DocumentInfo {
        DocumentInfo {
            is_text: self.document == DocumentKind::Text,
            current_part: 0,
            part_count: self.parts.max(1),
        }
    }
}

/// Replay a trace and print every delivered frame to stdout.
pub async fn run_replay(
    config: &Config,
    args: ReplayArgs,
    termination: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    replay_into(config, args, termination, Arc::new(LineTransport::stdout())).await?;
    Ok(())
}

/// Replay a trace into `transport`, returning the number of frames written.
async fn replay_into(
    config: &Config,
    args: ReplayArgs,
    termination: CancellationToken,
    transport: Arc<dyn Transport>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(&args.trace)?;
    let steps = parse_trace(BufReader::new(file))?;

    let session_id = args
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let document = Arc::new(StaticDocument::new(args.document_info()));

    let manager = SessionManager::with_termination(termination);
    let session = manager.create_session(
        &session_id,
        document.clone(),
        SessionConfig {
            start_active: true,
            speed_window: Duration::from_millis(config.outbox.editor_speed_window_ms),
        },
    )?;

    info!(
        session_id = %session_id,
        trace = %args.trace.display(),
        steps = steps.len(),
        "Replaying trace"
    );

    let writer = tokio::spawn(run_writer(
        session.queue().clone(),
        transport.clone(),
        WriterConfig {
            poll_interval_ms: config.outbox.writer_poll_interval_ms,
        },
    ));

    for step in steps {
        if manager.is_terminating() {
            break;
        }
        match step {
            TraceStep::Event { kind, payload } => session.on_event(kind, &payload),
            TraceStep::Active { active } => {
                session.set_active(active);
            }
            TraceStep::Part { part } => document.set_part(part),
        }
        tokio::task::yield_now().await;
    }

    if !session.is_active() && session.recorded_count() > 0 {
        warn!(
            session_id = %session_id,
            recorded = session.recorded_count(),
            "Trace ended with the session inactive; recorded events were not replayed"
        );
    }

    // Stop the queue, wait for the writer, then deliver what it did not reach.
    let interrupted = manager.is_terminating();
    let status = manager.status();
    manager.terminate();
    let mut sent = writer.await??;
    if !interrupted {
        sent += flush_remaining(session.queue(), transport.as_ref()).await?;
    }

    info!(
        session_id = %session_id,
        sent,
        editor_speed = session.editor_speed(),
        sessions = status.len(),
        "Replay finished"
    );
    Ok(sent)
}
