//! Worker subprocess entry point.
//!
//! This module runs when `shepherd --internal-worker` is invoked. The worker
//! loops over its work unit until a termination signal arrives, at which
//! point it logs the signal and exits immediately.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use nix::unistd::{Pid, getpid};
use tracing::{debug, error, info, warn};

use super::work::{IdleWork, Work};
use crate::error::Result;
use crate::settings::{self, Settings};
use crate::signals;

/// Who this worker is, for log lines and the signal handler.
#[derive(Debug, Clone)]
pub struct WorkerIdentity {
    /// Pool name shared with the supervisor.
    pub name: String,
    /// Slot index this worker occupies.
    pub slot: usize,
    /// This worker process's own pid.
    pub pid: Pid,
}

/// Termination handler for a worker process.
///
/// Owns the identity it reports, so nothing about the handler depends on
/// surrounding state. Installed once at process entry; it replaces the
/// default disposition of SIGTERM/SIGINT with log-then-exit, which is what
/// lets the parent equate "signaled" with "soon gone".
struct WorkerSignalHandler {
    identity: WorkerIdentity,
}

impl WorkerSignalHandler {
    fn new(identity: WorkerIdentity) -> Self {
        Self { identity }
    }

    /// Block the termination signals and start the thread that waits for
    /// them. On delivery the worker exits with status 0, immediately.
    fn install(self) -> Result<()> {
        signals::block_termination_signals()?;

        thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                let identity = self.identity;
                match signals::termination_signals().wait() {
                    Ok(signal) => {
                        info!(
                            worker = %identity.name,
                            slot = identity.slot,
                            pid = %identity.pid,
                            signal = %signal,
                            "Terminating on signal"
                        );
                        std::process::exit(0);
                    }
                    Err(err) => {
                        // Without a working handler the worker could never be
                        // stopped gracefully; bail out instead.
                        error!(
                            worker = %identity.name,
                            slot = identity.slot,
                            error = %err,
                            "Signal wait failed"
                        );
                        std::process::exit(1);
                    }
                }
            })?;

        Ok(())
    }
}

/// Repeatedly runs a work unit, isolating its failures.
pub struct WorkerLoop<W: Work> {
    identity: WorkerIdentity,
    interval: Duration,
    work: W,
}

impl<W: Work> WorkerLoop<W> {
    /// Build a loop around a work unit.
    pub fn new(identity: WorkerIdentity, interval: Duration, work: W) -> Self {
        Self {
            identity,
            interval,
            work,
        }
    }

    /// Run until the work unit's continuation predicate turns false.
    ///
    /// A failed iteration is logged with the worker's identity and the error
    /// detail, then the loop sleeps the configured interval and retries; no
    /// work error ever ends the loop. Termination signals bypass the loop
    /// entirely via [`WorkerSignalHandler`].
    pub fn run(&mut self) {
        info!(
            worker = %self.identity.name,
            slot = self.identity.slot,
            pid = %self.identity.pid,
            "Starting to work"
        );

        while self.work.should_continue_working() {
            info!(
                worker = %self.identity.name,
                slot = self.identity.slot,
                "Doing work"
            );
            if let Err(err) = self.work.do_work() {
                error!(
                    worker = %self.identity.name,
                    slot = self.identity.slot,
                    error = %err,
                    "Work iteration failed"
                );
            }
            thread::sleep(self.interval);
        }

        debug!(
            worker = %self.identity.name,
            slot = self.identity.slot,
            "Continuation predicate returned false; leaving the work loop"
        );
    }
}

/// Load the worker's settings, falling back to empty on any failure.
fn load_settings(path: Option<&PathBuf>) -> Settings {
    match path {
        None => Settings::default(),
        Some(path) => settings::load(path).unwrap_or_else(|err| {
            warn!(
                path = %path.display(),
                error = %err,
                "Failed to load settings; continuing with none"
            );
            Settings::default()
        }),
    }
}

/// Run the worker subprocess main function.
///
/// This function never returns normally - the worker exits through its
/// signal handler, or with status 0 if the work unit stops on its own.
pub fn run_worker_main(
    name: String,
    slot: usize,
    interval: Duration,
    settings_path: Option<PathBuf>,
) -> ! {
    // Ignore SIGPIPE so a closed stderr cannot kill the worker mid-write.
    // Safety: replacing the disposition at entry, before any other thread.
    unsafe {
        nix::sys::signal::signal(
            nix::sys::signal::Signal::SIGPIPE,
            nix::sys::signal::SigHandler::SigIgn,
        )
        .ok();
    }

    let identity = WorkerIdentity {
        name,
        slot,
        pid: getpid(),
    };

    if let Err(err) = WorkerSignalHandler::new(identity.clone()).install() {
        error!(
            worker = %identity.name,
            slot = identity.slot,
            error = %err,
            "Failed to install signal handler"
        );
        std::process::exit(1);
    }

    let settings = load_settings(settings_path.as_ref());
    let work = IdleWork::new(settings);

    WorkerLoop::new(identity, interval, work).run();
    std::process::exit(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShepherdError;

    fn test_identity() -> WorkerIdentity {
        WorkerIdentity {
            name: "test-flock".to_string(),
            slot: 0,
            pid: getpid(),
        }
    }

    /// Counts iterations and stops after a fixed number.
    struct CountingWork {
        iterations: usize,
        remaining: usize,
    }

    impl Work for CountingWork {
        fn do_work(&mut self) -> crate::error::Result<()> {
            self.iterations += 1;
            self.remaining -= 1;
            Ok(())
        }

        fn should_continue_working(&self) -> bool {
            self.remaining > 0
        }
    }

    /// Fails every single iteration.
    struct FailingWork {
        attempts: usize,
        limit: usize,
    }

    impl Work for FailingWork {
        fn do_work(&mut self) -> crate::error::Result<()> {
            self.attempts += 1;
            Err(ShepherdError::Worker("always broken".to_string()))
        }

        fn should_continue_working(&self) -> bool {
            self.attempts < self.limit
        }
    }

    #[test]
    fn test_loop_runs_until_predicate_stops_it() {
        let work = CountingWork {
            iterations: 0,
            remaining: 3,
        };
        let mut worker = WorkerLoop::new(test_identity(), Duration::ZERO, work);
        worker.run();
        assert_eq!(worker.work.iterations, 3);
    }

    #[test]
    fn test_loop_survives_failing_work() {
        // Every iteration errors; the loop must keep retrying until the
        // predicate ends it rather than bailing on the first failure.
        let work = FailingWork {
            attempts: 0,
            limit: 5,
        };
        let mut worker = WorkerLoop::new(test_identity(), Duration::ZERO, work);
        worker.run();
        assert_eq!(worker.work.attempts, 5);
    }

    #[test]
    fn test_load_settings_defaults_without_path() {
        assert!(load_settings(None).is_empty());
    }

    #[test]
    fn test_load_settings_absorbs_bad_path() {
        let path = PathBuf::from("/nonexistent/shepherd-settings.json");
        assert!(load_settings(Some(&path)).is_empty());
    }
}
