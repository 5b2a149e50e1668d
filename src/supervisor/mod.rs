//! Parent-side supervision of the worker pool.
//!
//! The supervisor forks a pool of worker subprocesses, polls their liveness
//! once per cycle, revives the dead, and on SIGTERM/SIGINT walks the pool in
//! slot order terminating and reaping every worker before exiting.
//!
//! ```text
//!                  ┌────────────────┐
//!                  │   Supervisor   │
//!                  │ (parent, poll) │
//!                  └───────┬────────┘
//!                          │ signals + waitpid only
//!           ┌──────────────┼──────────────┐
//!           │              │              │
//!     ┌─────▼─────┐  ┌─────▼─────┐  ┌─────▼─────┐
//!     │  slot 0   │  │  slot 1   │  │  slot N   │
//!     │ (process) │  │ (process) │  │ (process) │
//!     └───────────┘  └───────────┘  └───────────┘
//! ```
//!
//! Parent and workers share no memory. The slot table lives in the parent
//! alone; a slot keeps its index for life while its pid changes across
//! revivals.

mod health;
mod proc;
mod registry;
mod spawn;
#[allow(clippy::module_inception)]
mod supervisor;

pub use supervisor::{Supervisor, SupervisorConfig};

// Re-export for embedding the pool outside the shepherd binary
#[allow(unused_imports)]
pub use health::HealthMonitor;
#[allow(unused_imports)]
pub use proc::{Proc, ProcStatus};
#[allow(unused_imports)]
pub use registry::{ProcessRegistry, SlotStatus, Spawner, WorkerSlot};
#[allow(unused_imports)]
pub use spawn::{WorkerOptions, spawn_worker};
