use std::fs;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use scrollboard::ContestState;
use scrollboard::services::command_runner::run_commands;
use scrollboard::services::config_loader::{LoggingConfig, load_board_config};

fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    // stdout carries the scoreboard protocol
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(true);

    let _ = fs::create_dir_all(&logging.directory);
    let file_appender = tracing_appender::rolling::daily(&logging.directory, &logging.file_prefix);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_target(true);

    let init_result = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = init_result {
        eprintln!("tracing init failed: {err}");
        return None;
    }

    Some(file_guard)
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("config.toml"), PathBuf::from);
    let config = load_board_config(&config_path).map_err(|err| anyhow!(err))?;

    let _log_guard = init_tracing(&config.logging);
    info!("Starting scrollboard with config {}", config_path.display());

    let mut state = ContestState::new(config.penalty_per_wrong);
    let stdin = io::stdin();
    let mut stdout = BufWriter::new(io::stdout().lock());
    let summary = run_commands(stdin.lock(), &mut stdout, &mut state, config.output.format)
        .context("Command processing failed")?;

    info!(
        "Processed {} lines, {} commands, {} malformed",
        summary.lines_read, summary.commands, summary.malformed
    );
    Ok(())
}
