//! Command-line interface definitions using clap.

use clap::Parser;
use std::path::PathBuf;

/// Keeps a flock of worker processes alive.
///
/// Forks a pool of workers that each run a repeating unit of work, revives
/// workers that die, and tears the whole pool down on SIGTERM/SIGINT.
#[derive(Parser, Debug)]
#[command(name = "shepherd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Number of worker instances to start.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub workers: u32,

    /// Number of seconds between jobs (and between health cycles).
    #[arg(short, long, default_value_t = 1)]
    pub sleep: u64,

    /// Path of a settings file (JSON object) handed to each worker.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level: -v for warning, -vv for info, -vvv for debug.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Pool name used in log lines.
    #[arg(short, long, default_value = "sheep")]
    pub name: String,

    /// Run as a pool worker instead of the supervisor.
    #[arg(long, hide = true)]
    pub internal_worker: bool,

    /// Slot index this worker occupies in the pool.
    #[arg(long, hide = true, default_value_t = 0, requires = "internal_worker")]
    pub slot: usize,
}
