//! Periodic tick source.
//!
//! Replaces a busy-wait sampling loop with explicit deadlines on a
//! monotonic millisecond clock.  The scheduler notifies a
//! [`SchedulerDelegate`] when a task comes due; the main loop implements
//! the delegate to push events into the [`EventQueue`](crate::events::EventQueue).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  now_ms ──▶ Scheduler.tick()                                 │
//! │                │                                             │
//! │   ┌────────────┼──────────────┬────────────────┐             │
//! │   ▼            ▼              ▼                │             │
//! │ Sample (3ms) LinkPoll (50ms) StatsReport (60s) │             │
//! │   └────────────┴──────────────┴──▶ SchedulerDelegate         │
//! │                                   (main loop → Event Queue)  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each due task fires once per `tick()`.  When the loop falls behind by
//! more than one period, missed periods are skipped and counted as
//! overruns rather than replayed, so the detector never sees a burst of
//! back-to-back samples.

use crate::app::ports::{SchedulerDelegate, TaskKind};
use crate::config::DoorbellConfig;
use log::{debug, info};

/// Maximum number of periodic tasks (stack-allocated).
const MAX_TASKS: usize = 4;

/// A periodic task entry.
#[derive(Debug, Clone, Copy)]
pub struct Task {
    pub kind: TaskKind,
    pub interval_ms: u64,
    pub enabled: bool,
}

/// Internal bookkeeping for a live task.
#[derive(Debug, Clone, Copy)]
struct TaskEntry {
    task: Task,
    /// Absolute deadline of the next fire.
    next_due_ms: u64,
    fires: u64,
}

/// The scheduler engine.
///
/// Decoupled from the event system: fires go through the delegate only.
pub struct Scheduler {
    tasks: [Option<TaskEntry>; MAX_TASKS],
    overruns: u32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: [None; MAX_TASKS],
            overruns: 0,
        }
    }

    /// Scheduler with the sample, link-poll and stats tasks configured
    /// from `config`, first deadlines relative to `now_ms`.
    pub fn from_config(config: &DoorbellConfig, now_ms: u64) -> Self {
        let t = &config.timing;
        let mut sched = Self::new();
        for (kind, interval_ms) in [
            (TaskKind::Sample, u64::from(t.sample_interval_ms)),
            (TaskKind::LinkPoll, u64::from(t.link_poll_interval_ms)),
            (TaskKind::StatsReport, u64::from(t.stats_interval_secs) * 1000),
        ] {
            sched.add(
                Task {
                    kind,
                    interval_ms,
                    enabled: true,
                },
                now_ms,
            );
        }
        sched
    }

    /// Add a task; it first fires one interval after `now_ms`.
    /// Returns the slot index, or `None` if full or the interval is zero.
    pub fn add(&mut self, task: Task, now_ms: u64) -> Option<usize> {
        if task.interval_ms == 0 {
            return None;
        }
        for (i, slot) in self.tasks.iter_mut().enumerate() {
            if slot.is_none() {
                info!("Scheduler: added {:?} every {}ms at slot {}", task.kind, task.interval_ms, i);
                *slot = Some(TaskEntry {
                    task,
                    next_due_ms: now_ms + task.interval_ms,
                    fires: 0,
                });
                return Some(i);
            }
        }
        None // All slots full.
    }

    /// Enable or disable every task of the given kind.  Re-enabling
    /// restarts the period from `now_ms`.
    pub fn set_enabled(&mut self, kind: TaskKind, enabled: bool, now_ms: u64) {
        for entry in self.tasks.iter_mut().flatten() {
            if entry.task.kind == kind {
                if enabled && !entry.task.enabled {
                    entry.next_due_ms = now_ms + entry.task.interval_ms;
                }
                entry.task.enabled = enabled;
            }
        }
    }

    /// Fire every task whose deadline is at or before `now_ms`.
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        for entry in self.tasks.iter_mut().flatten() {
            if !entry.task.enabled || now_ms < entry.next_due_ms {
                continue;
            }

            delegate.on_task_due(entry.task.kind);
            entry.fires += 1;

            // Advance by whole periods; skip any that were missed entirely.
            let interval = entry.task.interval_ms;
            let behind = (now_ms - entry.next_due_ms) / interval;
            if behind > 0 {
                self.overruns = self.overruns.saturating_add(behind as u32);
                debug!("Scheduler: {:?} overran by {} period(s)", entry.task.kind, behind);
            }
            entry.next_due_ms += (behind + 1) * interval;
        }
    }

    /// Milliseconds until the earliest enabled deadline (0 if overdue).
    pub fn ms_until_next(&self, now_ms: u64) -> Option<u64> {
        self.tasks
            .iter()
            .flatten()
            .filter(|e| e.task.enabled)
            .map(|e| e.next_due_ms.saturating_sub(now_ms))
            .min()
    }

    /// Number of fires of the given task kind since it was added.
    pub fn fires(&self, kind: TaskKind) -> u64 {
        self.tasks
            .iter()
            .flatten()
            .filter(|e| e.task.kind == kind)
            .map(|e| e.fires)
            .sum()
    }

    /// Periods skipped because the loop fell behind.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Number of enabled tasks.
    pub fn active_count(&self) -> usize {
        self.tasks.iter().flatten().filter(|e| e.task.enabled).count()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
