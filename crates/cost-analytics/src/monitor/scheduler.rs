//! Named recurring tasks with a last-fired guard
//!
//! The scheduler does not run anything itself. Callers ask which tasks are
//! [`due`](TaskScheduler::due) and then claim each one with
//! [`try_begin`](TaskScheduler::try_begin), which records the firing time
//! atomically. Two overlapping callers therefore cannot both claim the same
//! slot.

use chrono::{DateTime, Days, NaiveTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;

/// When a task should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval; due immediately on first check
    Every(Duration),
    /// Once per day at a UTC wall-clock time
    DailyAt(NaiveTime),
}

impl Schedule {
    fn is_due(&self, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match *self {
            Schedule::Every(interval) => match last_run {
                None => true,
                // A clock that went backwards yields a negative gap: not due.
                Some(last) => (now - last)
                    .to_std()
                    .map_or(false, |elapsed| elapsed >= interval),
            },
            Schedule::DailyAt(at) => {
                let today = now.date_naive().and_time(at).and_utc();
                match last_run {
                    None => now >= today,
                    Some(last) => {
                        let slot = if now >= today {
                            Some(today)
                        } else {
                            now.date_naive()
                                .checked_sub_days(Days::new(1))
                                .map(|d| d.and_time(at).and_utc())
                        };
                        slot.map_or(false, |slot| last < slot)
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ScheduledTask {
    name: String,
    schedule: Schedule,
}

/// Registry of recurring tasks
#[derive(Debug, Default)]
pub struct TaskScheduler {
    tasks: Vec<ScheduledTask>,
    last_run: DashMap<String, DateTime<Utc>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task, replacing any task with the same name
    pub fn register(&mut self, name: impl Into<String>, schedule: Schedule) {
        let name = name.into();
        self.tasks.retain(|t| t.name != name);
        self.tasks.push(ScheduledTask { name, schedule });
    }

    pub fn schedule(&self, name: &str) -> Option<Schedule> {
        self.tasks.iter().find(|t| t.name == name).map(|t| t.schedule)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    /// Names of the tasks due at `now`, in registration order
    pub fn due(&self, now: DateTime<Utc>) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| t.schedule.is_due(self.last_run(&t.name), now))
            .map(|t| t.name.clone())
            .collect()
    }

    /// Claims `name` for `now` if it is due
    ///
    /// Returns `false` for unknown tasks and for tasks another caller has
    /// already claimed for the current slot.
    pub fn try_begin(&self, name: &str, now: DateTime<Utc>) -> bool {
        let Some(schedule) = self.schedule(name) else {
            return false;
        };

        match self.last_run.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                if schedule.is_due(Some(*entry.get()), now) {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                if schedule.is_due(None, now) {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn last_run(&self, name: &str) -> Option<DateTime<Utc>> {
        self.last_run.get(name).map(|t| *t)
    }
}
