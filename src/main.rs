// cchat - streaming chat client for Claude
//
// A terminal client for a chat backend that streams responses over SSE.
//
// Architecture:
// - API client (reqwest + eventsource-stream): registers messages and
//   subscribes to the response stream
// - Frame parser: normalizes heterogeneous stream payloads into a small
//   set of semantic events
// - Session: one task per stream, reporting over an mpsc channel with a
//   generation tag so cancelled streams can never mutate state
// - Conversation log + lifecycle: turns with copy/edit/regenerate/delete
// - TUI (ratatui): paced typewriter reveal with incremental markdown

mod api;
mod cli;
mod config;
mod conversation;
mod demo;
mod frame;
mod lifecycle;
mod logging;
mod reveal;
mod session;
mod tui;

use anyhow::Result;
use clap::Parser;
use config::Config;
use logging::{LogBuffer, TuiLogLayer};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    if cli::handle_command(&args) {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let mut config = Config::load();
    cli::apply_overrides(&args, &mut config);

    let log_buffer = LogBuffer::new();

    // Logs go to the in-memory buffer (stdout would garble the alternate
    // screen) and optionally to rotating JSON files.
    // Precedence: RUST_LOG env var > config file > default "info"
    let default_filter = format!("cchat={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // The guard must stay alive for the program's duration so logs flush
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard> =
        if config.logging.file_enabled {
            match std::fs::create_dir_all(&config.logging.file_dir) {
                Ok(()) => {
                    let file_appender =
                        tracing_appender::rolling::daily(&config.logging.file_dir, "cchat.log");
                    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(TuiLogLayer::new(log_buffer.clone()))
                        .with(
                            tracing_subscriber::fmt::layer()
                                .json()
                                .with_writer(non_blocking),
                        )
                        .init();
                    Some(guard)
                }
                Err(err) => {
                    eprintln!(
                        "Warning: Could not create log directory {:?}: {}",
                        config.logging.file_dir, err
                    );
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(TuiLogLayer::new(log_buffer.clone()))
                        .init();
                    None
                }
            }
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(TuiLogLayer::new(log_buffer.clone()))
                .init();
            None
        };

    tracing::info!(
        "Starting cchat v{} against {}",
        config::VERSION,
        config.server_url
    );
    if config.demo_mode {
        tracing::info!("Demo mode: responses are scripted, no backend used");
    }

    // Stream tasks report into this channel; the TUI event loop drains it
    let (updates_tx, updates_rx) = mpsc::channel(256);

    tui::run_tui(config, log_buffer, updates_tx, updates_rx).await
}
