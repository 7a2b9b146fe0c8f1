use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OrbitError, Result};

pub const MS_PER_MINUTE: i64 = 60_000;

/// The run state a loop is in at a given instant.
///
/// `Scheduled` and `Running` are not stored: both come from a started phase and
/// differ only by whether the start instant has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scheduled,
    Running,
    Paused,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopPhase {
    Idle,
    /// Deferred while `at` is in the future, running once it is reached.
    Started { at: DateTime<Utc> },
    /// Stopped with the progress made so far, kept for resume.
    Paused { elapsed_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub duration_minutes: u32,
    pub phase: LoopPhase,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::new(60)
    }
}

impl LoopConfig {
    pub fn new(duration_minutes: u32) -> Self {
        Self {
            duration_minutes,
            phase: LoopPhase::Idle,
        }
    }

    pub fn run_state(&self, now: DateTime<Utc>) -> RunState {
        match self.phase {
            LoopPhase::Idle => RunState::Idle,
            LoopPhase::Started { at } if at > now => RunState::Scheduled,
            LoopPhase::Started { .. } => RunState::Running,
            LoopPhase::Paused { .. } => RunState::Paused,
        }
    }

    pub fn start_instant(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            LoopPhase::Started { at } => Some(at),
            _ => None,
        }
    }

    pub fn paused_elapsed_ms(&self) -> Option<u64> {
        match self.phase {
            LoopPhase::Paused { elapsed_ms } => Some(elapsed_ms),
            _ => None,
        }
    }

    /// Length of one cycle; zero for a degenerate duration.
    pub fn duration_ms(&self) -> i64 {
        i64::from(self.duration_minutes) * MS_PER_MINUTE
    }

    /// Progress since the start instant, never negative. `None` when the loop
    /// has no start instant.
    pub fn running_elapsed_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        self.start_instant()
            .map(|at| (now - at).num_milliseconds().max(0))
    }

    /// Start the loop at `now`. A scheduled loop is started early.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.run_state(now) {
            RunState::Idle | RunState::Scheduled => {
                self.phase = LoopPhase::Started { at: now };
                Ok(())
            }
            from => Err(OrbitError::InvalidTransition {
                action: "start",
                from,
            }),
        }
    }

    /// Set the start instant to `at`. When `at` is not after `now` the loop is
    /// running straight away, as if it had started at `at`.
    pub fn schedule(&mut self, at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        match self.run_state(now) {
            RunState::Paused => Err(OrbitError::InvalidTransition {
                action: "schedule",
                from: RunState::Paused,
            }),
            _ => {
                self.phase = LoopPhase::Started { at };
                Ok(())
            }
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        match (self.run_state(now), self.running_elapsed_ms(now)) {
            (RunState::Running, Some(elapsed)) => {
                self.phase = LoopPhase::Paused {
                    elapsed_ms: elapsed as u64,
                };
                Ok(())
            }
            (from, _) => Err(OrbitError::InvalidTransition {
                action: "pause",
                from,
            }),
        }
    }

    /// Resume a paused loop so that its elapsed progress carries on from `now`.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.phase {
            LoopPhase::Paused { elapsed_ms } => {
                let at = i64::try_from(elapsed_ms)
                    .ok()
                    .and_then(Duration::try_milliseconds)
                    .and_then(|elapsed| now.checked_sub_signed(elapsed))
                    .ok_or_else(|| {
                        OrbitError::OutOfRange(format!(
                            "paused progress of {} ms cannot be resumed",
                            elapsed_ms
                        ))
                    })?;
                self.phase = LoopPhase::Started { at };
                Ok(())
            }
            _ => Err(OrbitError::InvalidTransition {
                action: "resume",
                from: self.run_state(now),
            }),
        }
    }

    pub fn stop(&mut self) {
        self.phase = LoopPhase::Idle;
    }

    /// Change the cycle length. Zero is raised to one minute.
    pub fn set_duration(&mut self, minutes: u32) {
        self.duration_minutes = minutes.max(1);
    }
}
