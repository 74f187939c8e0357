use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// When the learner finds out whether an answer was right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTiming {
    /// Reveal and advance on every answer.
    #[default]
    Immediate,
    /// Reveal, then advance after [`DELAYED_ADVANCE_SECS`](super::DELAYED_ADVANCE_SECS).
    Delayed,
    /// Reveal nothing until the session result.
    End,
}

impl std::str::FromStr for FeedbackTiming {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "immediate" => Ok(FeedbackTiming::Immediate),
            "delayed" => Ok(FeedbackTiming::Delayed),
            "end" => Ok(FeedbackTiming::End),
            other => Err(ValidationError::invalid(
                "feedback_timing",
                format!("expected immediate, delayed or end, got '{other}'"),
            )),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ValidationError::invalid(
                "difficulty",
                format!("expected easy, medium or hard, got '{other}'"),
            )),
        }
    }
}

/// Settings for one practice session, supplied by the caller at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub duration_seconds: u64,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub feedback_timing: FeedbackTiming,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default = "default_show_explanations")]
    pub show_explanations: bool,
}

fn default_show_explanations() -> bool {
    true
}

impl SessionSettings {
    pub fn new(duration_seconds: u64, feedback_timing: FeedbackTiming) -> Self {
        Self {
            duration_seconds,
            difficulty: Difficulty::default(),
            feedback_timing,
            shuffle: false,
            show_explanations: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_seconds == 0 {
            return Err(ValidationError::invalid(
                "duration_seconds",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}
