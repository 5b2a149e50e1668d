//! The worker subprocess: a loop around a user-supplied unit of work.
//!
//! Each worker repeatedly invokes its [`Work`] unit, sleeps between
//! iterations, and exits immediately when the supervisor signals it. Work
//! failures are logged and retried; they never kill the worker.

mod work;
mod worker_main;

pub use worker_main::run_worker_main;

// Re-export for custom work units
#[allow(unused_imports)]
pub use work::{IdleWork, Work};
#[allow(unused_imports)]
pub use worker_main::{WorkerIdentity, WorkerLoop};
