//! The unit-of-work interface a worker runs in its loop.

use crate::error::Result;
use crate::settings::Settings;

/// One repeating unit of work, supplied to the worker loop at construction.
///
/// Implementations decide what a single iteration does and when the loop may
/// stop on its own. Failures are returned, not panicked: the loop logs them
/// and carries on with the next iteration.
pub trait Work {
    /// Perform one unit of work.
    fn do_work(&mut self) -> Result<()>;

    /// Whether the loop should run another iteration.
    fn should_continue_working(&self) -> bool {
        true
    }
}

/// The built-in work unit: does nothing, forever.
///
/// Stands in where no real work unit has been wired up yet; the pool still
/// exercises forking, health checks, and shutdown. Holds the worker's loaded
/// settings so work units layered on top can read them.
pub struct IdleWork {
    #[allow(dead_code)] // read by derived work units, not by the idle one
    settings: Settings,
}

impl IdleWork {
    /// Wrap the worker's settings into an idle work unit.
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl Work for IdleWork {
    fn do_work(&mut self) -> Result<()> {
        Ok(())
    }
}
