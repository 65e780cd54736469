//! CLI definitions for AckQueue.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// AckQueue CLI.
#[derive(Parser)]
#[command(name = "ackqueue")]
#[command(about = "Reliable FIFO queue with explicit acknowledgement")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "ACKQUEUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Queue name (overrides the config file)
    #[arg(short, long, global = true)]
    pub name: Option<String>,

    /// Backing store (overrides the config file)
    #[arg(long, value_enum, global = true)]
    pub backend: Option<BackendArg>,

    /// SQLite database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum BackendArg {
    Memory,
    Sqlite,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Put every non-empty stdin line on the queue
    Producer,

    /// Print and acknowledge deliveries as `uid payload` lines
    Consumer {
        /// Seconds to wait per get (0 blocks forever, negative never blocks)
        #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
        timeout: f64,

        /// Leave deliveries unresolved so the reclaimer returns them
        #[arg(long)]
        no_ack: bool,
    },

    /// Put two messages and drain them
    Demo,

    /// Show ready, checked-out and stored item counts
    Stats,

    /// Run one reclaim sweep immediately
    Reclaim,
}
