//! Virtual clock and periodic tasks.
//!
//! The simulation never reads a wall clock. Hosts feed time in one of two
//! ways:
//!
//! - [`Scheduler::poll`] takes the current time and fires each due task
//!   once, rescheduling it a full interval after `now`. Late polls do not
//!   catch up.
//! - [`Scheduler::advance`] moves virtual time forward and reports every
//!   boundary crossed, in time order, so tests can run hours of game time
//!   deterministically.

use crate::fixed::Millis;
use serde::{Deserialize, Serialize};

/// What a periodic task drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Crop growth, construction timers and process completion.
    Poll,
    /// Rent and salary settlement.
    EconomicTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicTask {
    pub kind: TaskKind,
    pub interval: Millis,
    pub next_due: Millis,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    now: Millis,
    /// Fired in registration order when due at the same time.
    tasks: Vec<PeriodicTask>,
}

impl Scheduler {
    pub fn new(now: Millis) -> Self {
        Self {
            now,
            tasks: Vec::new(),
        }
    }

    /// Register a task, first due one interval from now. A zero interval is
    /// treated as one millisecond. Registering a kind again replaces it.
    pub fn register(&mut self, kind: TaskKind, interval: Millis) {
        let interval = interval.max(1);
        let task = PeriodicTask {
            kind,
            interval,
            next_due: self.now.saturating_add(interval),
        };
        match self.tasks.iter_mut().find(|t| t.kind == kind) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn tasks(&self) -> &[PeriodicTask] {
        &self.tasks
    }

    /// Absolute time the task next fires.
    pub fn next_due(&self, kind: TaskKind) -> Option<Millis> {
        self.tasks.iter().find(|t| t.kind == kind).map(|t| t.next_due)
    }

    /// Time left until the task fires, zero if overdue.
    pub fn time_until(&self, kind: TaskKind) -> Option<Millis> {
        self.next_due(kind).map(|due| due.saturating_sub(self.now))
    }

    /// Wall-clock step: fire every task due at `now` once.
    ///
    /// Time never runs backwards; an earlier `now` is treated as the
    /// current time.
    pub fn poll(&mut self, now: Millis) -> Vec<TaskKind> {
        self.now = self.now.max(now);
        let now = self.now;
        let mut fired = Vec::new();
        for task in &mut self.tasks {
            if task.next_due <= now {
                fired.push(task.kind);
                task.next_due = now.saturating_add(task.interval);
            }
        }
        fired
    }

    /// Virtual-time step: move forward by `dt` and return every boundary
    /// crossed, earliest first.
    pub fn advance(&mut self, dt: Millis) -> Vec<(Millis, TaskKind)> {
        let target = self.now.saturating_add(dt);
        let mut fired = Vec::new();
        loop {
            // Earliest due task; ties go to the first registered.
            let next = self
                .tasks
                .iter_mut()
                .filter(|t| t.next_due <= target)
                .min_by_key(|t| t.next_due);
            let Some(task) = next else { break };
            let at = task.next_due;
            fired.push((at, task.kind));
            task.next_due = at.saturating_add(task.interval);
            self.now = at;
            if task.next_due == at {
                break;
            }
        }
        self.now = target;
        fired
    }

    /// Restart every task from `now`, as after loading a save.
    pub fn reset(&mut self, now: Millis) {
        self.now = now;
        for task in &mut self.tasks {
            task.next_due = now.saturating_add(task.interval);
        }
    }
}
