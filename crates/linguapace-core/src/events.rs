use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::practice::{Feedback, SessionResult};
use crate::timer::{CompletedInterval, IntervalPhase};

/// Where an engine currently is, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TickPosition {
    /// Index of the exercise item being presented.
    Item { index: usize },
    /// Current phase of the focus/break cycle.
    Phase { phase: IntervalPhase },
}

/// Per-second state emitted while a clock runs. Purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub position: TickPosition,
    pub seconds_remaining: u64,
    pub total_seconds: u64,
    pub sessions_completed_today: u32,
}

/// Every state change in an engine produces an Event.
/// Hosts render them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    Tick {
        snapshot: TickSnapshot,
        at: DateTime<Utc>,
    },
    /// An answer was judged. `feedback` is withheld under end-of-session feedback.
    AnswerEvaluated {
        session_id: Uuid,
        item_index: usize,
        feedback: Option<Feedback>,
        at: DateTime<Utc>,
    },
    ItemAdvanced {
        session_id: Uuid,
        from_index: usize,
        to_index: usize,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        result: SessionResult,
        /// True when the session clock ran out before the last item.
        timed_out: bool,
        at: DateTime<Utc>,
    },
    /// The caller cancelled the session; no result is produced.
    SessionStopped {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    ClockPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ClockResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseStarted {
        phase: IntervalPhase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        record: CompletedInterval,
        next_phase: IntervalPhase,
        auto_started: bool,
        at: DateTime<Utc>,
    },
    PhaseSkipped {
        from: IntervalPhase,
        to: IntervalPhase,
        at: DateTime<Utc>,
    },
    PhaseSwitched {
        from: IntervalPhase,
        to: IntervalPhase,
        at: DateTime<Utc>,
    },
    /// The cycle was stopped by the caller; the clock run was cancelled.
    CycleStopped {
        phase: IntervalPhase,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        rebaselined: bool,
        at: DateTime<Utc>,
    },
    /// The interval completed but could not be written to history.
    HistoryAppendFailed {
        record: CompletedInterval,
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::Tick { at, .. }
            | Event::AnswerEvaluated { at, .. }
            | Event::ItemAdvanced { at, .. }
            | Event::SessionCompleted { at, .. }
            | Event::SessionStopped { at, .. }
            | Event::ClockPaused { at, .. }
            | Event::ClockResumed { at, .. }
            | Event::PhaseStarted { at, .. }
            | Event::PhaseCompleted { at, .. }
            | Event::PhaseSkipped { at, .. }
            | Event::PhaseSwitched { at, .. }
            | Event::CycleStopped { at, .. }
            | Event::SettingsUpdated { at, .. }
            | Event::HistoryAppendFailed { at, .. } => *at,
        }
    }
}
