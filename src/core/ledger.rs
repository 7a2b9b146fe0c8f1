use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::marker::MarkerKey;

/// Cycle and position seen on a poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclePoint {
    pub cycle: u64,
    pub position_minutes: f64,
}

/// In-memory record of what has already been notified. Never persisted.
#[derive(Debug, Default)]
pub struct NotificationLedger {
    last_fired: HashMap<MarkerKey, u64>,
    previous: Option<CyclePoint>,
    /// Duration and start instant of the run being followed.
    run: Option<(u32, DateTime<Utc>)>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_fired.clear();
        self.previous = None;
        self.run = None;
    }

    pub fn is_clear(&self) -> bool {
        self.last_fired.is_empty() && self.previous.is_none() && self.run.is_none()
    }

    pub fn previous(&self) -> Option<CyclePoint> {
        self.previous
    }

    pub fn set_previous(&mut self, point: CyclePoint) {
        self.previous = Some(point);
    }

    pub fn last_fired(&self, key: &MarkerKey) -> Option<u64> {
        self.last_fired.get(key).copied()
    }

    /// Record a firing of `key` for `cycle`. Returns false when that marker
    /// already fired for that cycle.
    pub fn record(&mut self, key: &MarkerKey, cycle: u64) -> bool {
        if self.last_fired(key) == Some(cycle) {
            return false;
        }
        self.last_fired.insert(key.clone(), cycle);
        true
    }

    /// Follow the run identified by `duration_minutes` and `start`. A different
    /// run than last time (resized, resumed or rescheduled) clears the ledger.
    /// Returns true when that happened.
    pub fn track_run(&mut self, duration_minutes: u32, start: DateTime<Utc>) -> bool {
        let run = Some((duration_minutes, start));
        if self.run == run {
            return false;
        }
        let changed = self.run.is_some();
        self.reset();
        self.run = run;
        changed
    }
}
