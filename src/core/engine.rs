use chrono::{DateTime, Utc};

use super::ledger::{CyclePoint, NotificationLedger};
use super::loop_state::{LoopConfig, MS_PER_MINUTE, RunState};
use super::marker::{Marker, MarkerKey};
use crate::error::Result;

/// Where the loop stands at an instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub cycle_index: u64,
    pub position_minutes: f64,
    /// Time left before a scheduled start.
    pub countdown_ms: Option<i64>,
}

impl Observation {
    fn at_rest() -> Self {
        Self {
            cycle_index: 0,
            position_minutes: 0.0,
            countdown_ms: None,
        }
    }
}

/// A marker that must be notified on this poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    pub key: MarkerKey,
    pub text: String,
    /// The cycle this firing belongs to.
    pub cycle: u64,
}

/// The next marker ahead of the current position.
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingMarker {
    pub key: MarkerKey,
    pub text: String,
    pub offset_minutes: i64,
    pub minutes_until: f64,
}

struct EffectiveMarker<'a> {
    key: MarkerKey,
    text: &'a str,
    offset: f64,
}

/// Decides which markers fire as the clock advances.
///
/// The host polls with the current time; the engine keeps only the ledger
/// between polls. Transitions go through the engine so that leaving a run
/// always clears the ledger.
#[derive(Debug, Default)]
pub struct LoopEngine {
    ledger: NotificationLedger,
}

impl LoopEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &NotificationLedger {
        &self.ledger
    }

    pub fn observe(now: DateTime<Utc>, config: &LoopConfig) -> Observation {
        let duration_ms = config.duration_ms();
        if duration_ms <= 0 {
            return Observation::at_rest();
        }

        match config.run_state(now) {
            RunState::Idle => Observation::at_rest(),
            RunState::Scheduled => Observation {
                countdown_ms: config
                    .start_instant()
                    .map(|at| (at - now).num_milliseconds()),
                ..Observation::at_rest()
            },
            RunState::Running => {
                let elapsed = config.running_elapsed_ms(now).unwrap_or(0);
                split_elapsed(elapsed, duration_ms)
            }
            RunState::Paused => {
                let elapsed = config
                    .paused_elapsed_ms()
                    .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX))
                    .unwrap_or(0);
                split_elapsed(elapsed, duration_ms)
            }
        }
    }

    /// Markers to notify for this poll. Each marker fires at most once per
    /// cycle; a gap of more than one cycle since the last poll fires nothing.
    pub fn poll_notifications(
        &mut self,
        now: DateTime<Utc>,
        config: &LoopConfig,
        markers: &[Marker],
    ) -> Vec<Firing> {
        let running = config.duration_minutes > 0 && config.run_state(now) == RunState::Running;
        let start = match config.start_instant() {
            Some(at) if running => at,
            _ => {
                if !self.ledger.is_clear() {
                    log::debug!("Loop not running, clearing notification ledger");
                    self.ledger.reset();
                }
                return Vec::new();
            }
        };

        if self.ledger.track_run(config.duration_minutes, start) {
            log::debug!("Loop run changed, clearing notification ledger");
        }

        let observation = Self::observe(now, config);
        let cycle = observation.cycle_index;
        let position = observation.position_minutes;
        let duration = f64::from(config.duration_minutes);

        let effective: Vec<EffectiveMarker> = markers
            .iter()
            .filter(|m| m.has_text())
            .map(|m| EffectiveMarker {
                key: m.key(config.duration_minutes),
                text: &m.text,
                offset: m.effective_offset(config.duration_minutes) as f64,
            })
            .collect();

        let mut fired = Vec::new();
        match self.ledger.previous() {
            None => {
                for m in effective.iter().filter(|m| m.offset == 0.0) {
                    self.fire(m, cycle, &mut fired);
                }
            }
            Some(prev) if cycle == prev.cycle => {
                if position >= prev.position_minutes {
                    for m in effective
                        .iter()
                        .filter(|m| prev.position_minutes < m.offset && m.offset <= position)
                    {
                        self.fire(m, cycle, &mut fired);
                    }
                }
            }
            Some(prev) if cycle == prev.cycle + 1 => {
                for m in effective
                    .iter()
                    .filter(|m| prev.position_minutes < m.offset && m.offset <= duration)
                {
                    self.fire(m, prev.cycle, &mut fired);
                }
                for m in effective.iter().filter(|m| m.offset <= position) {
                    self.fire(m, cycle, &mut fired);
                }
            }
            Some(prev) if cycle > prev.cycle => {
                log::debug!(
                    "Skipped {} cycles since last poll, resyncing without notifying",
                    cycle - prev.cycle - 1
                );
            }
            Some(prev) => {
                log::debug!(
                    "Clock moved back from cycle {} to {}, resyncing",
                    prev.cycle,
                    cycle
                );
            }
        }

        self.ledger.set_previous(CyclePoint {
            cycle,
            position_minutes: position,
        });
        fired
    }

    fn fire(&mut self, marker: &EffectiveMarker, cycle: u64, fired: &mut Vec<Firing>) {
        if self.ledger.record(&marker.key, cycle) {
            fired.push(Firing {
                key: marker.key.clone(),
                text: marker.text.to_string(),
                cycle,
            });
        }
    }

    /// The marker the loop reaches next, or `None` when idle or without
    /// markers.
    pub fn next_marker(
        now: DateTime<Utc>,
        config: &LoopConfig,
        markers: &[Marker],
    ) -> Option<UpcomingMarker> {
        let duration = f64::from(config.duration_minutes);
        if duration <= 0.0 {
            return None;
        }
        let state = config.run_state(now);
        let observation = Self::observe(now, config);
        let lead = match state {
            RunState::Idle => return None,
            RunState::Scheduled => {
                observation.countdown_ms.unwrap_or(0) as f64 / MS_PER_MINUTE as f64
            }
            RunState::Running | RunState::Paused => 0.0,
        };
        // Markers at zero fire the moment a scheduled loop starts.
        let scheduled = state == RunState::Scheduled;

        markers
            .iter()
            .filter(|m| m.has_text())
            .map(|m| {
                let offset = m.effective_offset(config.duration_minutes);
                let mut until = offset as f64 - observation.position_minutes;
                if until <= 0.0 && !scheduled {
                    until += duration;
                }
                UpcomingMarker {
                    key: m.key(config.duration_minutes),
                    text: m.text.clone(),
                    offset_minutes: offset,
                    minutes_until: lead + until,
                }
            })
            .min_by(|a, b| a.minutes_until.total_cmp(&b.minutes_until))
    }

    pub fn start(&mut self, config: &mut LoopConfig, now: DateTime<Utc>) -> Result<()> {
        config.start(now)?;
        self.ledger.reset();
        Ok(())
    }

    pub fn schedule(
        &mut self,
        config: &mut LoopConfig,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        config.schedule(at, now)?;
        self.ledger.reset();
        Ok(())
    }

    pub fn pause(&mut self, config: &mut LoopConfig, now: DateTime<Utc>) -> Result<()> {
        config.pause(now)?;
        self.ledger.reset();
        Ok(())
    }

    pub fn resume(&mut self, config: &mut LoopConfig, now: DateTime<Utc>) -> Result<()> {
        config.resume(now)?;
        self.ledger.reset();
        Ok(())
    }

    pub fn stop(&mut self, config: &mut LoopConfig) {
        config.stop();
        self.ledger.reset();
    }

    pub fn set_duration(&mut self, config: &mut LoopConfig, minutes: u32) {
        config.set_duration(minutes);
        self.ledger.reset();
    }
}

fn split_elapsed(elapsed_ms: i64, duration_ms: i64) -> Observation {
    Observation {
        cycle_index: (elapsed_ms / duration_ms) as u64,
        position_minutes: (elapsed_ms % duration_ms) as f64 / MS_PER_MINUTE as f64,
        countdown_ms: None,
    }
}
