//! Parley console entry point.

use std::sync::Arc;

use parley_console::config::{ConsoleConfig, LogFormat};
use parley_console::demo::{self, ROOT_DIALOG_ID};
use parley_console::error::ConsoleError;
use parley_core::activity::Activity;
use parley_core::settings::settings_from_env;
use parley_dialogs::application::memory_store::MemoryStateStore;
use parley_dialogs::application::runner::DialogRunner;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), ConsoleError> {
    let config = ConsoleConfig::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(conversation_id = %config.conversation_id, "Starting Parley console");

    let settings = settings_from_env();
    let runner = DialogRunner::new(
        demo::dialogs()?,
        ROOT_DIALOG_ID,
        Arc::new(MemoryStateStore::new()),
    )
    .with_settings(settings);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let activity = Activity::message(config.conversation_id.clone(), line);
        let outcome = runner.run_turn(activity).await?;
        for reply in &outcome.replies {
            if let Some(text) = &reply.text {
                stdout.write_all(format!("bot> {text}\n").as_bytes()).await?;
            }
        }
        stdout.flush().await?;
        tracing::debug!(status = ?outcome.status, "turn finished");
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
