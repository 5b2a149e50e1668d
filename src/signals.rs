//! Termination-signal plumbing shared by the supervisor and its workers.
//!
//! Both sides block SIGTERM/SIGINT on every thread and receive them through a
//! dedicated `sigwait` thread instead of an async signal handler. That keeps
//! signal reaction in ordinary thread context, where logging is safe and the
//! delivered signal's identity is known.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use nix::sys::signal::{SigSet, SigmaskHow, Signal, pthread_sigmask};
use tracing::debug;

use crate::error::Result;

/// The signals that request orderly termination of a process.
pub fn termination_signals() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGTERM);
    set.add(Signal::SIGINT);
    set
}

/// Block the termination signals for the calling thread.
///
/// Must run before any other thread is spawned so that every later thread
/// inherits the mask and delivery is funneled to the `sigwait` thread.
pub fn block_termination_signals() -> Result<()> {
    pthread_sigmask(
        SigmaskHow::SIG_BLOCK,
        Some(&termination_signals()),
        None,
    )?;
    Ok(())
}

/// Watches for termination signals on a dedicated thread.
///
/// The supervisor's run loop waits on [`SignalWatcher::wait_timeout`]: a
/// timeout tick drives one health cycle, a received signal starts shutdown.
pub struct SignalWatcher {
    rx: Receiver<Signal>,
}

impl SignalWatcher {
    /// Block the termination signals and start the watcher thread.
    pub fn install() -> Result<Self> {
        block_termination_signals()?;

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("signal-watcher".to_string())
            .spawn(move || {
                let signals = termination_signals();
                loop {
                    match signals.wait() {
                        Ok(signal) => {
                            debug!(signal = %signal, "Termination signal received");
                            if tx.send(signal).is_err() {
                                return;
                            }
                        }
                        Err(_) => return,
                    }
                }
            })?;

        Ok(Self { rx })
    }

    /// Wait up to `timeout` for a termination signal.
    pub fn wait_timeout(&self, timeout: Duration) -> std::result::Result<Signal, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}
