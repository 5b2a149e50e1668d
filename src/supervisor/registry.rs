//! Parent-side table of worker pool slots.
//!
//! A slot is a stable position in the pool; the process occupying it may
//! change across revivals. The registry is only ever touched by the parent,
//! so no locking is involved.

#![allow(dead_code)] // Some accessors are for monitoring

use nix::unistd::Pid;
use tracing::debug;

use super::proc::Proc;
use crate::error::{Result, ShepherdError};

/// How process creation is performed, injected so the table logic can be
/// exercised against plain throwaway subprocesses in tests.
pub type Spawner = Box<dyn FnMut(usize) -> Result<Proc> + Send>;

/// Lifecycle state of a pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// The occupant is believed to be running.
    Running,
    /// The occupant was found dead and awaits replacement.
    Zombie,
    /// The occupant was stopped by the shutdown protocol.
    Terminated,
}

/// One logical position in the worker pool.
#[derive(Debug)]
pub struct WorkerSlot {
    index: usize,
    proc: Proc,
    status: SlotStatus,
}

impl WorkerSlot {
    /// The slot's stable index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Pid of the current occupant.
    pub fn pid(&self) -> Pid {
        self.proc.pid()
    }

    /// Lifecycle state of the slot.
    pub fn status(&self) -> SlotStatus {
        self.status
    }

    pub(crate) fn proc(&self) -> &Proc {
        &self.proc
    }

    pub(crate) fn proc_mut(&mut self) -> &mut Proc {
        &mut self.proc
    }

    pub(crate) fn set_status(&mut self, status: SlotStatus) {
        self.status = status;
    }
}

/// Maps pool slot indexes to the worker processes occupying them.
pub struct ProcessRegistry {
    spawner: Spawner,
    slots: Vec<WorkerSlot>,
}

impl ProcessRegistry {
    /// Create an empty registry around a spawner.
    pub fn new(spawner: Spawner) -> Self {
        Self {
            spawner,
            slots: Vec::new(),
        }
    }

    /// Create `count` workers for slots `0..count`.
    ///
    /// Returns the `(index, pid)` pairs observed by the parent. Construction
    /// is synchronous; the workers' steady-state behavior is not awaited.
    pub fn spawn(&mut self, count: usize) -> Result<Vec<(usize, Pid)>> {
        let mut started = Vec::with_capacity(count);
        for index in self.slots.len()..self.slots.len() + count {
            let proc = (self.spawner)(index)?;
            let pid = proc.pid();
            debug!(slot = index, pid = %pid, "Worker registered");
            self.slots.push(WorkerSlot {
                index,
                proc,
                status: SlotStatus::Running,
            });
            started.push((index, pid));
        }
        Ok(started)
    }

    /// Create one replacement worker for an existing slot.
    ///
    /// The slot keeps its index and gets a new pid. The previous occupant
    /// must already be reaped; its handle is dropped here.
    pub fn replace(&mut self, index: usize) -> Result<(usize, Pid)> {
        if index >= self.slots.len() {
            return Err(ShepherdError::Supervisor(format!(
                "No slot {} in a pool of {}",
                index,
                self.slots.len()
            )));
        }

        let proc = (self.spawner)(index)?;
        let pid = proc.pid();
        let slot = &mut self.slots[index];
        slot.proc = proc;
        slot.status = SlotStatus::Running;
        debug!(slot = index, pid = %pid, "Worker replaced");
        Ok((index, pid))
    }

    /// Number of tracked slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots, in index order.
    pub fn slots(&self) -> &[WorkerSlot] {
        &self.slots
    }

    /// Pids of all current occupants, in slot order.
    pub fn pids(&self) -> Vec<Pid> {
        self.slots.iter().map(|slot| slot.pid()).collect()
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut WorkerSlot {
        &mut self.slots[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    /// Spawner backed by `sleep`, standing in for real workers.
    fn sleeper_spawner() -> Spawner {
        Box::new(|_slot| {
            let child = Command::new("sleep")
                .arg("30")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .spawn()?;
            Ok(Proc::from_child(child))
        })
    }

    #[test]
    fn test_spawn_creates_indexed_slots() {
        let mut registry = ProcessRegistry::new(sleeper_spawner());
        let started = registry.spawn(3).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(started.len(), 3);
        for (i, (index, pid)) in started.iter().enumerate() {
            assert_eq!(*index, i);
            assert_eq!(registry.slots()[i].index(), i);
            assert_eq!(registry.slots()[i].pid(), *pid);
            assert_eq!(registry.slots()[i].status(), SlotStatus::Running);
        }

        // No two slots share a live pid
        let mut pids = registry.pids();
        pids.sort();
        pids.dedup();
        assert_eq!(pids.len(), 3);
    }

    #[test]
    fn test_replace_keeps_index_changes_pid() {
        let mut registry = ProcessRegistry::new(sleeper_spawner());
        registry.spawn(2).unwrap();

        let old_pid = registry.slots()[1].pid();
        registry.slot_mut(1).proc_mut().reap();

        let (index, new_pid) = registry.replace(1).unwrap();
        assert_eq!(index, 1);
        assert_ne!(new_pid, old_pid);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.slots()[1].pid(), new_pid);
        assert_eq!(registry.slots()[1].status(), SlotStatus::Running);
    }

    #[test]
    fn test_replace_unknown_slot_fails() {
        let mut registry = ProcessRegistry::new(sleeper_spawner());
        registry.spawn(1).unwrap();
        assert!(registry.replace(5).is_err());
    }

    #[test]
    fn test_spawn_failure_propagates() {
        let mut registry = ProcessRegistry::new(Box::new(|slot| {
            Err(ShepherdError::Worker(format!("no worker {}", slot)))
        }));
        assert!(registry.spawn(1).is_err());
        assert!(registry.is_empty());
    }
}
