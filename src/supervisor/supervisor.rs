//! The supervision loop and the shutdown protocol.

use std::path::PathBuf;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use nix::sys::signal::Signal;
use nix::unistd::getpid;
use tracing::info;

use super::health::HealthMonitor;
use super::registry::{ProcessRegistry, SlotStatus, Spawner};
use super::spawn;
use crate::cli::Cli;
use crate::error::{Result, ShepherdError};
use crate::signals::SignalWatcher;

/// Configuration for the supervisor. Immutable after construction.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Number of pool slots.
    pub workers: usize,
    /// Interval between supervision cycles, and between worker iterations.
    pub interval: Duration,
    /// Settings file handed to each worker.
    pub settings_path: Option<PathBuf>,
    /// `-v` count forwarded to workers.
    pub verbosity: u8,
    /// Pool name used in log lines.
    pub name: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            interval: Duration::from_secs(1),
            settings_path: None,
            verbosity: 0,
            name: "sheep".to_string(),
        }
    }
}

impl From<&Cli> for SupervisorConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            workers: cli.workers as usize,
            interval: Duration::from_secs(cli.sleep),
            settings_path: cli.config.clone(),
            verbosity: cli.verbose,
            name: cli.name.clone(),
        }
    }
}

/// Keeps the worker pool alive until a termination signal arrives, then
/// tears it down in slot order.
pub struct Supervisor {
    config: SupervisorConfig,
    registry: ProcessRegistry,
    health: HealthMonitor,
    shutting_down: bool,
}

impl Supervisor {
    /// Create a supervisor that spawns real worker subprocesses.
    pub fn new(config: SupervisorConfig) -> Self {
        let spawner = spawn::pool_spawner(&config);
        Self::with_spawner(config, spawner)
    }

    /// Create a supervisor around a custom spawner.
    pub(crate) fn with_spawner(config: SupervisorConfig, spawner: Spawner) -> Self {
        Self {
            config,
            registry: ProcessRegistry::new(spawner),
            health: HealthMonitor::new(),
            shutting_down: false,
        }
    }

    /// Run until a termination signal has been handled.
    ///
    /// Spawns the pool, then alternates between an interruptible wait of one
    /// `interval` and a health pass. A received SIGTERM/SIGINT switches to
    /// the shutdown protocol; the method returns once every worker is reaped.
    pub fn run(&mut self) -> Result<()> {
        // Install the watcher before the pool exists so no signal can slip
        // through with the default disposition.
        let signals = SignalWatcher::install()?;

        info!(
            name = %self.config.name,
            workers = self.config.workers,
            "Forking workers"
        );
        for (slot, pid) in self.registry.spawn(self.config.workers)? {
            info!(slot, pid = %pid, "Worker started");
        }

        loop {
            match signals.wait_timeout(self.config.interval) {
                Ok(signal) => return self.shutdown(signal),
                Err(RecvTimeoutError::Timeout) => {
                    self.health.evaluate(&mut self.registry);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ShepherdError::Supervisor(
                        "Signal watcher terminated unexpectedly".to_string(),
                    ));
                }
            }
        }
    }

    /// Tear the pool down after a termination signal.
    ///
    /// Strictly sequential per slot: signal, block until that pid is reaped,
    /// log, move on. Every forked worker is either signaled and reaped here
    /// or already gone; none is left unreaped. A worker that ignores the
    /// signal blocks the protocol indefinitely; there is no kill escalation.
    fn shutdown(&mut self, cause: Signal) -> Result<()> {
        debug_assert!(!self.shutting_down, "shutdown may only start once");
        self.shutting_down = true;
        info!(
            name = %self.config.name,
            signal = %cause,
            pid = %getpid(),
            revivals = self.health.revivals(),
            "Termination signal received; closing worker pool"
        );

        for index in 0..self.registry.len() {
            let slot = self.registry.slot_mut(index);
            let pid = slot.pid();
            info!(slot = index, pid = %pid, "Stopping worker");

            // Terminate fails only when the occupant is already gone
            let _ = slot.proc_mut().terminate();
            if !slot.proc().is_reaped() {
                let _ = slot.proc_mut().wait();
            }
            slot.set_status(SlotStatus::Terminated);

            info!(slot = index, pid = %pid, "Worker terminated");
        }

        Ok(())
    }
}
