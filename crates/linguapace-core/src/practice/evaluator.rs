//! Answer evaluators.
//!
//! The runner only needs a yes/no verdict. Each exercise kind brings its own
//! evaluator; [`EvaluatorRegistry`] dispatches on the item's kind so a single
//! runner can mix kinds in one session.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::exercise::{Answer, ExerciseItem, ExerciseKind, ExercisePrompt};
use super::settings::Difficulty;
use crate::error::EvaluatorError;

/// Verdict for one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub correct: bool,
}

/// Judges a submitted answer against an item.
pub trait ExerciseEvaluator {
    fn evaluate(
        &self,
        item: &ExerciseItem,
        answer: &Answer,
        difficulty: Difficulty,
    ) -> Result<Evaluation, EvaluatorError>;
}

impl<E: ExerciseEvaluator + ?Sized> ExerciseEvaluator for &E {
    fn evaluate(
        &self,
        item: &ExerciseItem,
        answer: &Answer,
        difficulty: Difficulty,
    ) -> Result<Evaluation, EvaluatorError> {
        (**self).evaluate(item, answer, difficulty)
    }
}

impl<E: ExerciseEvaluator + ?Sized> ExerciseEvaluator for Box<E> {
    fn evaluate(
        &self,
        item: &ExerciseItem,
        answer: &Answer,
        difficulty: Difficulty,
    ) -> Result<Evaluation, EvaluatorError> {
        (**self).evaluate(item, answer, difficulty)
    }
}

fn expected_answer(item: &ExerciseItem) -> Result<&str, EvaluatorError> {
    item.correct_answer
        .as_deref()
        .ok_or_else(|| EvaluatorError::Failed(format!("item '{}' has no correct answer", item.id)))
}

fn wrong_shape(kind: ExerciseKind, message: &str) -> EvaluatorError {
    EvaluatorError::AnswerShape {
        kind: kind.to_string(),
        message: message.to_string(),
    }
}

/// Normalise free text for comparison.
///
/// Easy ignores case, punctuation and repeated whitespace; medium ignores
/// case; hard only trims.
pub fn normalize(text: &str, difficulty: Difficulty) -> String {
    match difficulty {
        Difficulty::Hard => text.trim().to_string(),
        Difficulty::Medium => text.trim().to_lowercase(),
        Difficulty::Easy => text
            .chars()
            .filter(|c| !c.is_ascii_punctuation() && !matches!(c, '¿' | '¡' | '«' | '»'))
            .collect::<String>()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Multiple choice. `correct_answer` holds the option text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceEvaluator;

impl ExerciseEvaluator for ChoiceEvaluator {
    fn evaluate(
        &self,
        item: &ExerciseItem,
        answer: &Answer,
        difficulty: Difficulty,
    ) -> Result<Evaluation, EvaluatorError> {
        let ExercisePrompt::MultipleChoice { options, .. } = &item.prompt else {
            return Err(EvaluatorError::Unsupported {
                kind: item.kind().to_string(),
            });
        };
        let expected = expected_answer(item)?;
        let chosen = match answer {
            Answer::Choice(idx) => options
                .get(*idx)
                .ok_or_else(|| wrong_shape(item.kind(), "option index out of range"))?,
            Answer::Text(text) => text,
            Answer::Pairs(_) => return Err(wrong_shape(item.kind(), "expected a choice")),
        };
        Ok(Evaluation {
            correct: normalize(chosen, difficulty) == normalize(expected, difficulty),
        })
    }
}

/// Free-text kinds. `correct_answer` may list alternatives separated by `|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMatchEvaluator;

impl ExerciseEvaluator for TextMatchEvaluator {
    fn evaluate(
        &self,
        item: &ExerciseItem,
        answer: &Answer,
        difficulty: Difficulty,
    ) -> Result<Evaluation, EvaluatorError> {
        let Answer::Text(text) = answer else {
            return Err(wrong_shape(item.kind(), "expected text"));
        };
        let given = normalize(text, difficulty);
        let correct = expected_answer(item)?
            .split('|')
            .any(|alt| normalize(alt, difficulty) == given);
        Ok(Evaluation { correct })
    }
}

/// Matching. `correct_answer` is `left=right;left=right`, order-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingEvaluator;

impl MatchingEvaluator {
    fn pair_set<'a>(
        pairs: impl Iterator<Item = (&'a str, &'a str)>,
        difficulty: Difficulty,
    ) -> BTreeSet<(String, String)> {
        pairs
            .map(|(l, r)| (normalize(l, difficulty), normalize(r, difficulty)))
            .collect()
    }
}

impl ExerciseEvaluator for MatchingEvaluator {
    fn evaluate(
        &self,
        item: &ExerciseItem,
        answer: &Answer,
        difficulty: Difficulty,
    ) -> Result<Evaluation, EvaluatorError> {
        let Answer::Pairs(given) = answer else {
            return Err(wrong_shape(item.kind(), "expected pairs"));
        };
        let expected = expected_answer(item)?
            .split(';')
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                p.split_once('=')
                    .ok_or_else(|| EvaluatorError::Failed(format!("malformed pair '{p}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let expected = Self::pair_set(expected.into_iter(), difficulty);
        let given = Self::pair_set(
            given.iter().map(|(l, r)| (l.as_str(), r.as_str())),
            difficulty,
        );
        Ok(Evaluation {
            correct: expected == given,
        })
    }
}

/// Dispatches to the evaluator registered for each item's kind.
#[derive(Default)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<ExerciseKind, Box<dyn ExerciseEvaluator + Send + Sync>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in evaluator for every kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ExerciseKind::MultipleChoice, ChoiceEvaluator);
        registry.register(ExerciseKind::FillBlank, TextMatchEvaluator);
        registry.register(ExerciseKind::Translation, TextMatchEvaluator);
        registry.register(ExerciseKind::Listening, TextMatchEvaluator);
        registry.register(ExerciseKind::Matching, MatchingEvaluator);
        registry
    }

    /// Register (or replace) the evaluator for `kind`.
    pub fn register<E>(&mut self, kind: ExerciseKind, evaluator: E)
    where
        E: ExerciseEvaluator + Send + Sync + 'static,
    {
        self.evaluators.insert(kind, Box::new(evaluator));
    }

    pub fn supports(&self, kind: ExerciseKind) -> bool {
        self.evaluators.contains_key(&kind)
    }
}

impl ExerciseEvaluator for EvaluatorRegistry {
    fn evaluate(
        &self,
        item: &ExerciseItem,
        answer: &Answer,
        difficulty: Difficulty,
    ) -> Result<Evaluation, EvaluatorError> {
        let evaluator = self
            .evaluators
            .get(&item.kind())
            .ok_or_else(|| EvaluatorError::Unsupported {
                kind: item.kind().to_string(),
            })?;
        evaluator.evaluate(item, answer, difficulty)
    }
}
