//! # Linguapace Core Library
//!
//! The timed session engine behind the Linguapace language-learning tracker.
//! Goals, roadmaps and vocabulary screens live elsewhere; this crate holds the
//! two pieces with real state-machine and timing logic.
//!
//! ## Architecture
//!
//! - **Session Clock**: a tick-driven countdown. It owns no thread; the caller
//!   (or [`driver::drive`]) invokes `tick()` once per second
//! - **Exercise Session Runner**: advances a learner through heterogeneous
//!   exercises under a time budget and a feedback-timing policy
//! - **Interval Cycle Engine**: focus/short-break/long-break cycle with
//!   auto-start rules and a completion counter
//! - **Storage**: interval history (SQLite or in-memory) and TOML configuration
//!
//! ## Key Components
//!
//! - [`ExerciseSessionRunner`]: practice session state machine
//! - [`IntervalCycleEngine`]: focus/break cycle state machine
//! - [`SessionHistoryStore`]: append-only log of completed intervals
//! - [`ExerciseEvaluator`]: pluggable answer judging per exercise kind
//! - [`Config`]: learner defaults, handed to engines by the host

pub mod driver;
pub mod error;
pub mod events;
pub mod practice;
pub mod storage;
pub mod timer;

pub use driver::{drive, DriveOutcome, TickDriven};
pub use error::{ConfigError, CoreError, EvaluatorError, StorageError, ValidationError};
pub use events::{Event, TickPosition, TickSnapshot};
pub use practice::{
    Answer, Difficulty, EvaluatorRegistry, ExerciseEvaluator, ExerciseItem, ExerciseKind,
    ExercisePrompt, ExerciseSessionRunner, Feedback, FeedbackTiming, Mistake, RunnerState,
    SessionResult, SessionSettings,
};
pub use storage::{Config, InMemoryHistoryStore, SessionHistoryStore, SqliteHistoryStore};
pub use timer::{
    ClockState, CompletedInterval, CountdownClock, IntervalCycleEngine, IntervalPhase,
    IntervalSettings, SessionClock,
};
