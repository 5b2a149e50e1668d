//! Per-cycle liveness checking and revival of dead workers.

use tracing::{error, info};

use super::proc::ProcStatus;
use super::registry::{ProcessRegistry, SlotStatus};

/// Inspects every pool slot once per supervision cycle and replaces dead
/// occupants in place.
///
/// Worker death is routine here, not an error: a crashed or exited worker is
/// reaped, logged, and revived with a fresh process under the same slot
/// index. Nothing escalates out of the monitor.
#[derive(Debug, Default)]
pub struct HealthMonitor {
    revivals: usize,
}

impl HealthMonitor {
    /// Create a monitor with no revivals on record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of workers revived so far.
    pub fn revivals(&self) -> usize {
        self.revivals
    }

    /// Run one health pass over the registry.
    ///
    /// Slots are evaluated in increasing index order and a replacement never
    /// skips the evaluation of the slots after it. A failed respawn leaves
    /// the slot dead for the next cycle to retry.
    pub fn evaluate(&mut self, registry: &mut ProcessRegistry) {
        for index in 0..registry.len() {
            let slot = registry.slot_mut(index);
            match slot.proc().status() {
                ProcStatus::Alive => continue,
                // A vanished process and an uncollected zombie get the same
                // treatment: reap whatever is left, then revive the slot.
                ProcStatus::Zombie | ProcStatus::Gone | ProcStatus::Reaped => {
                    let old_pid = slot.pid();
                    slot.set_status(SlotStatus::Zombie);
                    slot.proc_mut().reap();
                    info!(slot = index, old_pid = %old_pid, "Reviving dead worker");

                    match registry.replace(index) {
                        Ok((_, new_pid)) => {
                            self.revivals += 1;
                            info!(slot = index, pid = %new_pid, "Worker revived");
                        }
                        Err(err) => {
                            error!(slot = index, error = %err, "Failed to revive worker");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::supervisor::proc::Proc;
    use crate::supervisor::registry::Spawner;
    use std::process::{Command, Stdio};
    use std::time::Duration;

    fn spawn_cmd(cmd: &str, args: &[&str]) -> Result<Proc> {
        let child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()?;
        Ok(Proc::from_child(child))
    }

    /// First `doomed` spawns exit immediately; replacements are sleepers.
    fn doomed_then_sleeper_spawner(doomed: usize) -> Spawner {
        let mut spawned = 0;
        Box::new(move |_slot| {
            spawned += 1;
            if spawned <= doomed {
                spawn_cmd("true", &[])
            } else {
                spawn_cmd("sleep", &["30"])
            }
        })
    }

    #[test]
    fn test_dead_workers_are_revived_in_place() {
        let mut registry = ProcessRegistry::new(doomed_then_sleeper_spawner(2));
        let started = registry.spawn(2).unwrap();
        let old_pids: Vec<_> = started.iter().map(|(_, pid)| *pid).collect();

        // Let both short-lived workers turn into zombies
        std::thread::sleep(Duration::from_millis(300));

        let mut monitor = HealthMonitor::new();
        monitor.evaluate(&mut registry);

        assert_eq!(monitor.revivals(), 2);
        assert_eq!(registry.len(), 2);
        for (index, slot) in registry.slots().iter().enumerate() {
            assert_eq!(slot.index(), index);
            assert_eq!(slot.status(), SlotStatus::Running);
            assert!(!old_pids.contains(&slot.pid()));
            assert!(slot.proc().is_running());
        }
    }

    #[test]
    fn test_healthy_pool_is_left_alone() {
        let mut registry = ProcessRegistry::new(doomed_then_sleeper_spawner(0));
        registry.spawn(3).unwrap();
        let pids_before = registry.pids();

        let mut monitor = HealthMonitor::new();
        monitor.evaluate(&mut registry);
        monitor.evaluate(&mut registry);

        assert_eq!(monitor.revivals(), 0);
        assert_eq!(registry.pids(), pids_before);
    }

    #[test]
    fn test_replacement_does_not_skip_later_slots() {
        // Slot 0 dies, slot 1 stays healthy, slot 2 dies: one pass must
        // revive both dead slots and leave the middle one untouched.
        let mut spawned = 0;
        let spawner: Spawner = Box::new(move |_slot| {
            spawned += 1;
            match spawned {
                1 | 3 => spawn_cmd("true", &[]),
                _ => spawn_cmd("sleep", &["30"]),
            }
        });

        let mut registry = ProcessRegistry::new(spawner);
        registry.spawn(3).unwrap();
        let healthy_pid = registry.slots()[1].pid();

        std::thread::sleep(Duration::from_millis(300));

        let mut monitor = HealthMonitor::new();
        monitor.evaluate(&mut registry);

        assert_eq!(monitor.revivals(), 2);
        assert_eq!(registry.slots()[1].pid(), healthy_pid);
        for slot in registry.slots() {
            assert!(slot.proc().is_running());
        }
    }

    #[test]
    fn test_failed_respawn_is_absorbed() {
        // One short-lived worker, then the spawner starts failing
        let mut spawned = 0;
        let spawner: Spawner = Box::new(move |slot| {
            spawned += 1;
            if spawned == 1 {
                spawn_cmd("true", &[])
            } else {
                Err(crate::error::ShepherdError::Worker(format!(
                    "no replacement for {}",
                    slot
                )))
            }
        });

        let mut registry = ProcessRegistry::new(spawner);
        registry.spawn(1).unwrap();
        std::thread::sleep(Duration::from_millis(300));

        let mut monitor = HealthMonitor::new();
        // Must not panic or propagate the spawn failure
        monitor.evaluate(&mut registry);

        assert_eq!(monitor.revivals(), 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.slots()[0].status(), SlotStatus::Zombie);
    }
}
