//! Worker subprocess spawning.
//!
//! Workers are fresh processes running this same binary in its hidden
//! `--internal-worker` mode, told which pool slot they occupy via `--slot`.
//! This sidesteps the portability problems of `fork()` without changing the
//! supervision model: the parent still only knows workers by pid.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use super::proc::Proc;
use super::registry::Spawner;
use super::supervisor::SupervisorConfig;
use crate::error::{Result, ShepherdError};

/// Everything a worker needs on its command line.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Seconds each worker sleeps between work iterations.
    pub interval_secs: u64,
    /// Settings file passed through to the worker's loader.
    pub settings_path: Option<PathBuf>,
    /// `-v` count forwarded so workers log at the supervisor's level.
    pub verbosity: u8,
    /// Pool name used in the worker's log lines.
    pub name: String,
}

impl From<&SupervisorConfig> for WorkerOptions {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            interval_secs: config.interval.as_secs(),
            settings_path: config.settings_path.clone(),
            verbosity: config.verbosity,
            name: config.name.clone(),
        }
    }
}

/// Spawn one worker subprocess for a pool slot.
///
/// Returns as soon as the process exists; whether it comes up healthy is the
/// health cycle's concern, not the spawner's.
pub fn spawn_worker(slot: usize, opts: &WorkerOptions) -> Result<Proc> {
    let exe = std::env::current_exe()
        .map_err(|e| ShepherdError::Worker(format!("Failed to get current executable: {}", e)))?;

    let mut cmd = Command::new(&exe);
    cmd.arg("--internal-worker")
        .arg("--slot")
        .arg(slot.to_string())
        .arg("--sleep")
        .arg(opts.interval_secs.to_string())
        .arg("--name")
        .arg(&opts.name);

    if opts.verbosity > 0 {
        cmd.arg(format!("-{}", "v".repeat(opts.verbosity as usize)));
    }

    if let Some(path) = &opts.settings_path {
        cmd.arg("--config").arg(path);
    }

    // Workers share the supervisor's stdout/stderr so the pool logs as one
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let child = cmd
        .spawn()
        .map_err(|e| ShepherdError::Worker(format!("Failed to spawn worker {}: {}", slot, e)))?;

    let proc = Proc::from_child(child);
    debug!(slot, pid = %proc.pid(), "Worker subprocess spawned");
    Ok(proc)
}

/// Build the registry's spawner from the supervisor configuration.
pub fn pool_spawner(config: &SupervisorConfig) -> Spawner {
    let opts = WorkerOptions::from(config);
    Box::new(move |slot| spawn_worker(slot, &opts))
}
