//! AckQueue - reliable FIFO queue with explicit acknowledgement
//!
//! Command-line producer and consumer for AckQueue queues.

mod backend;
mod cli;
mod commands;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ackqueue_config::{BackendKind, Config, ConfigLoader, ConfigValidator};

use crate::cli::{BackendArg, Cli};

fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries consumer output, logs go to stderr
    let console = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let file = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("ackqueue")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)
                .context("creating log file appender")?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer alive for the program duration
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(())
}

/// Load the config file (or defaults) and apply command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(name) = &cli.name {
        config.queue.name = name.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend.kind = match backend {
            BackendArg::Memory => BackendKind::Memory,
            BackendArg::Sqlite => BackendKind::Sqlite,
        };
    }
    if let Some(db) = &cli.db {
        config.backend.path = ConfigLoader::expand_path(&db.to_string_lossy()).into();
        if cli.backend.is_none() {
            config.backend.kind = BackendKind::Sqlite;
        }
    }

    let result = ConfigValidator::validate(&config);
    for warning in &result.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    if let Some(err) = result.into_error() {
        return Err(err).context("invalid configuration");
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_dir.as_deref())?;

    let config = load_config(&cli)?;
    debug!("Queue '{}' on {:?} backend", config.queue.name, config.backend.kind);

    let backend = backend::connect(&config.backend).await?;
    commands::handle_command(cli.command, &config, backend).await
}
