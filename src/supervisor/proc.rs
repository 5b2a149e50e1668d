//! Process handle for worker subprocesses.
//!
//! Wraps a child pid with the liveness queries and reaping the supervisor
//! needs. Workers take no commands from the parent; the only interactions are
//! signals and process-table queries.

#![allow(dead_code)] // Some queries are for monitoring

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{Id, WaitPidFlag, WaitStatus, waitid, waitpid};
use nix::unistd::Pid;

use crate::error::{Result, ShepherdError};

/// Liveness of a worker process as observed by the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcStatus {
    /// The process is running (any non-zombie state).
    Alive,
    /// The process exited but its status has not been collected yet.
    Zombie,
    /// The process-table query failed; the process vanished.
    Gone,
    /// The exit status was already collected by this handle.
    Reaped,
}

/// Handle to a worker subprocess.
#[derive(Debug)]
pub struct Proc {
    /// Process ID
    pid: Pid,
    /// Whether the process has been reaped
    reaped: bool,
}

impl Proc {
    /// Create a new process handle for a pid.
    pub fn new(pid: Pid) -> Self {
        Self { pid, reaped: false }
    }

    /// Create from a spawned `std::process::Child`.
    ///
    /// The `Child` is dropped; reaping happens through this handle only.
    pub fn from_child(child: std::process::Child) -> Self {
        Self::new(Pid::from_raw(child.id() as i32))
    }

    /// Get the process ID.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Whether the exit status has been collected.
    pub fn is_reaped(&self) -> bool {
        self.reaped
    }

    /// Query the process state without collecting it (non-blocking).
    ///
    /// Uses `waitid` with `WNOWAIT` so a dead child stays a zombie until
    /// [`Proc::reap`] collects it explicitly. A query failure means the
    /// process is no longer ours to inspect and reads as [`ProcStatus::Gone`].
    pub fn status(&self) -> ProcStatus {
        if self.reaped {
            return ProcStatus::Reaped;
        }
        match waitid(
            Id::Pid(self.pid),
            WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT,
        ) {
            Ok(WaitStatus::StillAlive) => ProcStatus::Alive,
            Ok(_) => ProcStatus::Zombie,
            Err(_) => ProcStatus::Gone,
        }
    }

    /// Check if the process is still running (non-blocking).
    pub fn is_running(&self) -> bool {
        self.status() == ProcStatus::Alive
    }

    /// Send SIGTERM to the process.
    pub fn terminate(&self) -> Result<()> {
        if self.reaped {
            return Ok(());
        }
        signal::kill(self.pid, Signal::SIGTERM)
            .map_err(|e| ShepherdError::Worker(format!("Failed to send SIGTERM: {}", e)))
    }

    /// Wait for the process to exit (blocking) and collect its status.
    pub fn wait(&mut self) -> Result<WaitStatus> {
        if self.reaped {
            return Err(ShepherdError::Worker("Process already reaped".into()));
        }
        match waitpid(self.pid, None) {
            Ok(status) => {
                self.reaped = true;
                Ok(status)
            }
            Err(e) => {
                // ECHILD: nothing left to collect for this pid
                self.reaped = true;
                Err(ShepherdError::Worker(format!("waitpid failed: {}", e)))
            }
        }
    }

    /// Try to collect the exit status (non-blocking).
    ///
    /// Returns `None` if the process is still running.
    pub fn try_wait(&mut self) -> Result<Option<WaitStatus>> {
        if self.reaped {
            return Err(ShepherdError::Worker("Process already reaped".into()));
        }
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => Ok(None),
            Ok(status) => {
                self.reaped = true;
                Ok(Some(status))
            }
            Err(e) => {
                self.reaped = true;
                Err(ShepherdError::Worker(format!("waitpid failed: {}", e)))
            }
        }
    }

    /// Reap a dead process: terminate signal, then wait.
    ///
    /// Used when the health check finds a zombie or a vanished process. The
    /// signal is a no-op on a zombie and the wait collects it, so no
    /// process-table entry can linger. Errors are swallowed; once the pid is
    /// known dead there is nothing further to do about them.
    pub fn reap(&mut self) {
        if self.reaped {
            return;
        }
        let _ = signal::kill(self.pid, Signal::SIGTERM);
        let _ = waitpid(self.pid, None);
        self.reaped = true;
    }
}

impl Drop for Proc {
    fn drop(&mut self) {
        if !self.reaped {
            // Try graceful termination
            let _ = self.terminate();
            std::thread::sleep(std::time::Duration::from_millis(10));

            // Check if it exited
            if let Ok(Some(_)) = self.try_wait() {
                return;
            }
            if self.reaped {
                return;
            }

            // Force kill
            let _ = signal::kill(self.pid, Signal::SIGKILL);
            let _ = waitpid(self.pid, None);
            self.reaped = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};
    use std::time::Duration;

    fn spawn_sleeper() -> Proc {
        let child = Command::new("sleep")
            .arg("30")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .expect("Failed to spawn sleep");
        Proc::from_child(child)
    }

    #[test]
    fn test_proc_from_child_is_running() {
        let mut proc = spawn_sleeper();
        assert!(proc.is_running());
        assert_eq!(proc.status(), ProcStatus::Alive);

        proc.terminate().expect("Failed to terminate");
        let status = proc.wait().expect("Failed to wait");
        assert!(matches!(status, WaitStatus::Signaled(_, Signal::SIGTERM, _)));
        assert!(proc.is_reaped());
        assert_eq!(proc.status(), ProcStatus::Reaped);
    }

    #[test]
    fn test_status_reports_zombie_without_collecting() {
        let child = Command::new("true")
            .stdout(Stdio::null())
            .spawn()
            .expect("Failed to spawn true");
        let mut proc = Proc::from_child(child);

        // Give the child a moment to exit
        std::thread::sleep(Duration::from_millis(200));

        assert_eq!(proc.status(), ProcStatus::Zombie);
        // The query did not collect it, so it still reads as a zombie
        assert_eq!(proc.status(), ProcStatus::Zombie);

        proc.reap();
        assert!(proc.is_reaped());
    }

    #[test]
    fn test_status_of_foreign_pid_is_gone() {
        // Pid 1 is never a child of the test process
        let proc = Proc::new(Pid::from_raw(1));
        assert_eq!(proc.status(), ProcStatus::Gone);
        assert!(!proc.is_running());
    }

    #[test]
    fn test_reap_is_idempotent() {
        let child = Command::new("true")
            .stdout(Stdio::null())
            .spawn()
            .expect("Failed to spawn true");
        let mut proc = Proc::from_child(child);

        std::thread::sleep(Duration::from_millis(200));
        proc.reap();
        proc.reap();
        assert!(proc.is_reaped());
        assert!(proc.wait().is_err());
    }

    #[test]
    fn test_try_wait_on_running_process() {
        let mut proc = spawn_sleeper();
        assert!(proc.try_wait().expect("try_wait failed").is_none());

        proc.terminate().expect("Failed to terminate");
        proc.wait().expect("Failed to wait");
    }
}
