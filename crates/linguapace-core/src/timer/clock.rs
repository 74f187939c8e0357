//! Countdown clock shared by both engines.
//!
//! The clock owns no thread and no timer handle. One external driver calls
//! `tick()` once per elapsed second; everything else is a synchronous state
//! change. Only one run can exist per clock, so `start` on a running clock
//! simply replaces the previous run.
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           v
//!        Expired -> (start | reset) -> ...
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockState {
    Idle,
    Running,
    Paused,
    Expired,
}

/// What a single `tick()` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "lowercase")]
pub enum ClockSignal {
    /// One second elapsed and time is left.
    Tick { remaining: u64 },
    /// The countdown reached zero. Emitted once per run.
    Expired,
}

/// A countdown timer driven by caller ticks.
///
/// Engines are generic over this trait so tests (or hosts with their own
/// notion of time) can substitute an implementation.
pub trait SessionClock {
    /// Begin a fresh run at `duration_secs`, discarding any previous run.
    fn start(&mut self, duration_secs: u64) -> Result<(), ValidationError>;

    /// Freeze the countdown. Returns `false` when not running.
    fn pause(&mut self) -> bool;

    /// Continue a paused countdown. No-op (returns `false`) when not paused.
    fn resume(&mut self) -> bool;

    /// Cancel any pending expiry and leave the clock idle at `duration_secs`.
    fn reset(&mut self, duration_secs: u64) -> Result<(), ValidationError>;

    /// Cancel the current run. No further ticks until `start`.
    fn stop(&mut self);

    /// Advance by one second.
    fn tick(&mut self) -> Option<ClockSignal>;

    fn state(&self) -> ClockState;

    fn remaining_secs(&self) -> u64;

    fn total_secs(&self) -> u64;

    fn is_running(&self) -> bool {
        self.state() == ClockState::Running
    }

    fn elapsed_secs(&self) -> u64 {
        self.total_secs().saturating_sub(self.remaining_secs())
    }
}

/// Default [`SessionClock`]: whole-second countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownClock {
    state: ClockState,
    total_secs: u64,
    remaining_secs: u64,
}

impl CountdownClock {
    pub fn new() -> Self {
        Self {
            state: ClockState::Idle,
            total_secs: 0,
            remaining_secs: 0,
        }
    }
}

impl Default for CountdownClock {
    fn default() -> Self {
        Self::new()
    }
}

fn check_duration(duration_secs: u64) -> Result<(), ValidationError> {
    if duration_secs == 0 {
        return Err(ValidationError::invalid(
            "duration_seconds",
            "must be greater than 0",
        ));
    }
    Ok(())
}

impl SessionClock for CountdownClock {
    fn start(&mut self, duration_secs: u64) -> Result<(), ValidationError> {
        check_duration(duration_secs)?;
        self.total_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.state = ClockState::Running;
        Ok(())
    }

    fn pause(&mut self) -> bool {
        if self.state != ClockState::Running {
            return false;
        }
        self.state = ClockState::Paused;
        true
    }

    fn resume(&mut self) -> bool {
        if self.state != ClockState::Paused {
            return false;
        }
        self.state = ClockState::Running;
        true
    }

    fn reset(&mut self, duration_secs: u64) -> Result<(), ValidationError> {
        check_duration(duration_secs)?;
        self.total_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.state = ClockState::Idle;
        Ok(())
    }

    fn stop(&mut self) {
        if self.state != ClockState::Expired {
            self.state = ClockState::Idle;
        }
    }

    fn tick(&mut self) -> Option<ClockSignal> {
        if self.state != ClockState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.state = ClockState::Expired;
            return Some(ClockSignal::Expired);
        }
        Some(ClockSignal::Tick {
            remaining: self.remaining_secs,
        })
    }

    fn state(&self) -> ClockState {
        self.state
    }

    fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    fn total_secs(&self) -> u64 {
        self.total_secs
    }
}
