//! Docsession - drive per-session event delivery from recorded callback traces.

mod app;
mod trace;
mod transport;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docsession_config::{init_logging, Config, Paths};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Docsession command-line interface.
#[derive(Parser)]
#[command(name = "docsession")]
#[command(about = "Per-session event delivery with inactivity replay")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.docsession
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a JSONL callback trace through one session and print delivered frames
    Replay {
        /// Trace file
        trace: PathBuf,
        /// Session ID (random when omitted)
        #[arg(long)]
        session_id: Option<String>,
        /// Kind of document the trace was recorded against
        #[arg(long, value_enum, default_value = "text")]
        document: app::DocumentKind,
        /// Number of parts (sheets, slides) in the document
        #[arg(long, default_value_t = 1)]
        parts: i32,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level, &paths)?;

    match cli.command {
        Commands::Replay {
            trace,
            session_id,
            document,
            parts,
        } => {
            let termination = CancellationToken::new();
            let on_signal = termination.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received shutdown signal, terminating sessions");
                    on_signal.cancel();
                }
            });

            app::run_replay(
                &config,
                app::ReplayArgs {
                    trace,
                    session_id,
                    document,
                    parts,
                },
                termination,
            )
            .await?;
        }
        Commands::Config => {
            app::show_config(&config, &paths)?;
        }
    }

    Ok(())
}
