//! Push command
//!
//! Usage: loglens push <FILE> [--endpoint <URL>] [--config <FILE>]
//!
//! Each non-empty line of FILE is one serialized log entry. Entries go
//! through the same buffer (masking, maxLogs) as in-process logging and are
//! delivered in a single flush.

use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use loglens_core::{FlushOutcome, HttpSink, LogBuffer, LogEntry};

use super::load_config;

#[derive(Debug, Args)]
pub struct PushArgs {
    /// JSON-lines file of log entries
    pub file: PathBuf,

    /// Collector URL (overrides the config's autoFlush.endpoint)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Config file (default: built-in defaults)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Execute push command
pub fn execute(args: PushArgs) -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        config = config.with_endpoint(endpoint);
    }
    // One explicit flush below; no timer.
    config.auto_flush.enabled = false;

    let entries = read_entries(&args.file)?;
    if entries.len() > config.max_logs {
        eprintln!(
            "warning: {} entries exceed maxLogs {}; only the newest are sent",
            entries.len(),
            config.max_logs
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(async {
        let buffer = LogBuffer::with_config(config, Arc::new(HttpSink::from_env()?))?;
        for entry in entries {
            buffer.add_log(entry);
        }
        Ok::<_, loglens_core::LogLensError>(buffer.flush().await)
    })?;

    match outcome {
        FlushOutcome::Delivered(count) => {
            println!("✓ Delivered {} entries", count);
            Ok(())
        }
        FlushOutcome::Empty => {
            println!("Nothing to push");
            Ok(())
        }
        FlushOutcome::Retained { retained, error } => {
            Err(format!("{} entries retained: {}", retained, error).into())
        }
        other => Err(format!("unexpected flush outcome: {:?}", other).into()),
    }
}

fn read_entries(path: &Path) -> Result<Vec<LogEntry>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| -> Result<LogEntry, Box<dyn std::error::Error>> {
            serde_json::from_str(line)
                .map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e).into())
        })
        .collect()
}
