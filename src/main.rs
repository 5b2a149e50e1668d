//! shepherd - keeps a flock of worker processes alive.

mod cli;
mod error;
mod logging;
mod settings;
mod signals;
mod supervisor;
mod worker;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use owo_colors::{OwoColorize, Stream::Stderr};

use cli::Cli;
use logging::LogConfig;
use supervisor::{Supervisor, SupervisorConfig};

fn main() {
    let cli = Cli::parse();

    logging::init(LogConfig::for_verbosity(cli.verbose).with_env_overrides());

    if let Err(e) = run(&cli) {
        eprintln!(
            "{}: {}",
            "error"
                .if_supports_color(Stderr, |text| text.red())
                .if_supports_color(Stderr, |text| text.bold()),
            e
        );
        // Print the error chain if there are causes
        for cause in e.chain().skip(1) {
            eprintln!(
                "  {}: {}",
                "caused by".if_supports_color(Stderr, |text| text.yellow()),
                cause
            );
        }
        std::process::exit(1);
    }
}

/// Dispatch between supervisor mode and the hidden worker mode.
fn run(cli: &Cli) -> Result<()> {
    if cli.internal_worker {
        // Never returns: the worker exits via its signal handler
        worker::run_worker_main(
            cli.name.clone(),
            cli.slot,
            Duration::from_secs(cli.sleep),
            cli.config.clone(),
        );
    }

    let config = SupervisorConfig::from(cli);
    Supervisor::new(config).run()?;
    Ok(())
}
