//! Timed practice sessions: exercise model, evaluators and the runner.

mod evaluator;
mod exercise;
mod runner;
mod settings;

pub use evaluator::{
    normalize, ChoiceEvaluator, Evaluation, EvaluatorRegistry, ExerciseEvaluator,
    MatchingEvaluator, TextMatchEvaluator,
};
pub use exercise::{Answer, ExerciseItem, ExerciseKind, ExercisePrompt};
pub use runner::{
    ExerciseSessionRunner, Feedback, Mistake, RunnerState, SessionResult, DELAYED_ADVANCE_SECS,
};
pub use settings::{Difficulty, FeedbackTiming, SessionSettings};
