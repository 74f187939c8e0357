//! Exercise session runner.
//!
//! Walks a learner through an ordered list of exercises under one countdown.
//! Like the cycle engine, it owns no thread: the caller delivers one `tick()`
//! per second and forwards answers through `submit_answer()`.
//!
//! ## State Transitions
//!
//! ```text
//! Presenting(i) --answer (immediate | end)--> Presenting(i+1) | Completed
//! Presenting(i) --answer (delayed)--> AwaitingAdvance(i) --2 ticks--> Presenting(i+1) | Completed
//! any non-terminal --clock expiry--> Completed
//! ```

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::evaluator::ExerciseEvaluator;
use super::exercise::{Answer, ExerciseItem};
use super::settings::{FeedbackTiming, SessionSettings};
use crate::error::ValidationError;
use crate::events::{Event, TickPosition, TickSnapshot};
use crate::timer::{ClockSignal, CountdownClock, SessionClock};

/// Seconds the learner sees feedback before a delayed-feedback session moves on.
pub const DELAYED_ADVANCE_SECS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunnerState {
    Presenting { index: usize },
    AwaitingAdvance { index: usize },
    Completed,
}

/// What the learner is shown after answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub correct: bool,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

/// One incorrect answer, kept for post-session review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mistake {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: Uuid,
    pub correct_count: u32,
    pub total_count: u32,
    pub time_taken_seconds: u64,
    pub mistakes: Vec<Mistake>,
}

impl SessionResult {
    /// Share of items answered correctly, 0.0 for an empty session.
    pub fn accuracy(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        f64::from(self.correct_count) / f64::from(self.total_count)
    }
}

/// Drives one practice session.
pub struct ExerciseSessionRunner<E, C = CountdownClock> {
    session_id: Uuid,
    items: Vec<ExerciseItem>,
    settings: SessionSettings,
    evaluator: E,
    clock: C,
    state: RunnerState,
    correct_count: u32,
    mistakes: Vec<Mistake>,
    /// Ticks left in the delayed-feedback window.
    advance_in: Option<u64>,
    result: Option<SessionResult>,
    stopped: bool,
}

impl<E: ExerciseEvaluator> ExerciseSessionRunner<E> {
    /// Start a session on a fresh [`CountdownClock`].
    ///
    /// # Errors
    /// Returns a `ValidationError` if the settings are invalid.
    pub fn new(
        items: Vec<ExerciseItem>,
        settings: SessionSettings,
        evaluator: E,
    ) -> Result<Self, ValidationError> {
        Self::with_clock(
            items,
            settings,
            evaluator,
            CountdownClock::new(),
            &mut rand::thread_rng(),
        )
    }
}

impl<E: ExerciseEvaluator, C: SessionClock> ExerciseSessionRunner<E, C> {
    /// Start a session on the given clock. `rng` is only used when
    /// `settings.shuffle` is set.
    ///
    /// # Errors
    /// Returns a `ValidationError` if the settings are invalid.
    pub fn with_clock<R: Rng + ?Sized>(
        mut items: Vec<ExerciseItem>,
        settings: SessionSettings,
        evaluator: E,
        clock: C,
        rng: &mut R,
    ) -> Result<Self, ValidationError> {
        settings.validate()?;
        if settings.shuffle {
            items.shuffle(rng);
        }

        let session_id = Uuid::new_v4();
        let mut runner = Self {
            session_id,
            items,
            settings,
            evaluator,
            clock,
            state: RunnerState::Completed,
            correct_count: 0,
            mistakes: Vec::new(),
            advance_in: None,
            result: None,
            stopped: false,
        };

        if runner.items.is_empty() {
            runner.clock.stop();
            runner.result = Some(SessionResult {
                session_id,
                correct_count: 0,
                total_count: 0,
                time_taken_seconds: 0,
                mistakes: Vec::new(),
            });
            tracing::debug!(%session_id, "empty item list, session completed immediately");
            return Ok(runner);
        }

        runner.clock.start(runner.settings.duration_seconds)?;
        runner.state = RunnerState::Presenting { index: 0 };
        tracing::debug!(
            %session_id,
            items = runner.items.len(),
            duration_secs = runner.settings.duration_seconds,
            "practice session started"
        );
        Ok(runner)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn items(&self) -> &[ExerciseItem] {
        &self.items
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            RunnerState::Presenting { index } | RunnerState::AwaitingAdvance { index } => {
                Some(index)
            }
            RunnerState::Completed => None,
        }
    }

    pub fn current_item(&self) -> Option<&ExerciseItem> {
        self.current_index().and_then(|i| self.items.get(i))
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn mistakes(&self) -> &[Mistake] {
        &self.mistakes
    }

    pub fn remaining_secs(&self) -> u64 {
        self.clock.remaining_secs()
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<SessionResult> {
        self.result
    }

    /// Completed or cancelled; no further events will be produced.
    pub fn is_finished(&self) -> bool {
        self.stopped || self.state == RunnerState::Completed
    }

    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            position: TickPosition::Item {
                index: self.current_index().unwrap_or(self.items.len()),
            },
            seconds_remaining: self.clock.remaining_secs(),
            total_seconds: self.settings.duration_seconds,
            // Only focus intervals count toward the daily tally.
            sessions_completed_today: 0,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Submit an answer for the item being presented.
    ///
    /// Ignored (empty result) outside `Presenting`, which makes repeated
    /// submissions during a delayed-feedback window harmless.
    pub fn submit_answer(&mut self, answer: Answer) -> Vec<Event> {
        let index = match self.state {
            RunnerState::Presenting { index } if !self.stopped => index,
            state => {
                tracing::debug!(session_id = %self.session_id, ?state, "answer ignored");
                return Vec::new();
            }
        };
        let Some(item) = self.items.get(index) else {
            return Vec::new();
        };

        let correct = match self
            .evaluator
            .evaluate(item, &answer, self.settings.difficulty)
        {
            Ok(evaluation) => evaluation.correct,
            Err(error) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    item_id = %item.id,
                    kind = %item.kind(),
                    %error,
                    "evaluator failed, counting answer as incorrect"
                );
                false
            }
        };

        let explanation = if self.settings.show_explanations {
            item.explanation.clone()
        } else {
            None
        };
        if correct {
            self.correct_count += 1;
        } else {
            self.mistakes.push(Mistake {
                question: item.prompt.question_text(),
                user_answer: answer.render(&item.prompt),
                correct_answer: item.correct_answer.clone().unwrap_or_default(),
                explanation: explanation.clone(),
            });
        }

        let feedback = match self.settings.feedback_timing {
            FeedbackTiming::End => None,
            FeedbackTiming::Immediate | FeedbackTiming::Delayed => Some(Feedback {
                correct,
                correct_answer: item.correct_answer.clone(),
                explanation,
            }),
        };

        let mut events = vec![Event::AnswerEvaluated {
            session_id: self.session_id,
            item_index: index,
            feedback,
            at: Utc::now(),
        }];

        match self.settings.feedback_timing {
            FeedbackTiming::Immediate | FeedbackTiming::End => {
                self.advance_from(index, &mut events);
            }
            FeedbackTiming::Delayed => {
                self.state = RunnerState::AwaitingAdvance { index };
                self.advance_in = Some(DELAYED_ADVANCE_SECS);
            }
        }
        events
    }

    /// Call once per elapsed second.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.is_finished() {
            return Vec::new();
        }

        let mut events = Vec::new();
        match self.clock.tick() {
            None => {}
            Some(ClockSignal::Expired) => events.extend(self.on_clock_expire()),
            Some(ClockSignal::Tick { .. }) => {
                events.push(Event::Tick {
                    snapshot: self.snapshot(),
                    at: Utc::now(),
                });
                if let RunnerState::AwaitingAdvance { index } = self.state {
                    let left = self.advance_in.map_or(0, |n| n.saturating_sub(1));
                    if left == 0 {
                        self.advance_in = None;
                        self.advance_from(index, &mut events);
                    } else {
                        self.advance_in = Some(left);
                    }
                }
            }
        }
        events
    }

    /// The session ran out of time. Completes the session with whatever was
    /// answered so far, even in the middle of a feedback window.
    pub fn on_clock_expire(&mut self) -> Vec<Event> {
        if self.is_finished() {
            return Vec::new();
        }
        let mut events = Vec::new();
        self.complete(true, &mut events);
        events
    }

    pub fn pause(&mut self) -> Vec<Event> {
        if self.is_finished() || !self.clock.pause() {
            return Vec::new();
        }
        vec![Event::ClockPaused {
            remaining_secs: self.clock.remaining_secs(),
            at: Utc::now(),
        }]
    }

    pub fn resume(&mut self) -> Vec<Event> {
        if self.is_finished() || !self.clock.resume() {
            return Vec::new();
        }
        vec![Event::ClockResumed {
            remaining_secs: self.clock.remaining_secs(),
            at: Utc::now(),
        }]
    }

    /// Abandon the session: cancels the clock run, produces no result.
    pub fn stop(&mut self) -> Vec<Event> {
        if self.is_finished() {
            return Vec::new();
        }
        self.clock.stop();
        self.stopped = true;
        self.advance_in = None;
        tracing::debug!(session_id = %self.session_id, "practice session stopped");
        vec![Event::SessionStopped {
            session_id: self.session_id,
            at: Utc::now(),
        }]
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn advance_from(&mut self, index: usize, events: &mut Vec<Event>) {
        let next = index + 1;
        if next < self.items.len() {
            self.state = RunnerState::Presenting { index: next };
            events.push(Event::ItemAdvanced {
                session_id: self.session_id,
                from_index: index,
                to_index: next,
                at: Utc::now(),
            });
        } else {
            self.complete(false, events);
        }
    }

    fn complete(&mut self, timed_out: bool, events: &mut Vec<Event>) {
        let time_taken_seconds = self
            .settings
            .duration_seconds
            .saturating_sub(self.clock.remaining_secs());
        self.clock.stop();
        self.advance_in = None;
        self.state = RunnerState::Completed;

        let result = SessionResult {
            session_id: self.session_id,
            correct_count: self.correct_count,
            total_count: self.items.len() as u32,
            time_taken_seconds,
            mistakes: self.mistakes.clone(),
        };
        tracing::info!(
            session_id = %self.session_id,
            correct = result.correct_count,
            total = result.total_count,
            time_taken_seconds,
            timed_out,
            "practice session completed"
        );
        self.result = Some(result.clone());
        events.push(Event::SessionCompleted {
            result,
            timed_out,
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluatorError;
    use crate::practice::{Difficulty, Evaluation, EvaluatorRegistry, ExercisePrompt};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn item(id: &str, correct: &str) -> ExerciseItem {
        ExerciseItem {
            id: id.into(),
            prompt: ExercisePrompt::FillBlank {
                sentence: format!("{id}: ___"),
            },
            correct_answer: Some(correct.into()),
            explanation: Some(format!("because {correct}")),
        }
    }

    fn items(n: usize) -> Vec<ExerciseItem> {
        (0..n).map(|i| item(&format!("q{i}"), "ok")).collect()
    }

    fn runner(
        n: usize,
        duration: u64,
        timing: FeedbackTiming,
    ) -> ExerciseSessionRunner<EvaluatorRegistry> {
        ExerciseSessionRunner::new(
            items(n),
            SessionSettings::new(duration, timing),
            EvaluatorRegistry::with_defaults(),
        )
        .unwrap()
    }

    fn ok() -> Answer {
        Answer::Text("ok".into())
    }

    fn wrong() -> Answer {
        Answer::Text("nope".into())
    }

    struct Broken;

    impl ExerciseEvaluator for Broken {
        fn evaluate(
            &self,
            _item: &ExerciseItem,
            _answer: &Answer,
            _difficulty: Difficulty,
        ) -> Result<Evaluation, EvaluatorError> {
            Err(EvaluatorError::Failed("widget crashed".into()))
        }
    }

    #[test]
    fn rejects_zero_duration() {
        let result = ExerciseSessionRunner::new(
            items(1),
            SessionSettings::new(0, FeedbackTiming::Immediate),
            EvaluatorRegistry::with_defaults(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_items_complete_immediately() {
        let r = runner(0, 30, FeedbackTiming::Immediate);
        assert_eq!(r.state(), RunnerState::Completed);
        let result = r.result().unwrap();
        assert_eq!(result.total_count, 0);
        assert_eq!(result.correct_count, 0);
        assert_eq!(result.time_taken_seconds, 0);
        assert!(result.mistakes.is_empty());
    }

    #[test]
    fn immediate_feedback_advances_and_reveals() {
        let mut r = runner(2, 30, FeedbackTiming::Immediate);
        let events = r.submit_answer(wrong());
        match &events[0] {
            Event::AnswerEvaluated { feedback, .. } => {
                let fb = feedback.as_ref().unwrap();
                assert!(!fb.correct);
                assert_eq!(fb.correct_answer.as_deref(), Some("ok"));
                assert_eq!(fb.explanation.as_deref(), Some("because ok"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(r.state(), RunnerState::Presenting { index: 1 });
        assert_eq!(r.mistakes().len(), 1);
        assert_eq!(r.mistakes()[0].user_answer, "nope");
        assert_eq!(r.mistakes()[0].question, "q0: ___");
    }

    #[test]
    fn end_feedback_withholds_feedback() {
        let mut r = runner(2, 30, FeedbackTiming::End);
        let events = r.submit_answer(ok());
        assert!(matches!(
            events[0],
            Event::AnswerEvaluated { feedback: None, .. }
        ));
        assert_eq!(r.current_index(), Some(1));
    }

    #[test]
    fn delayed_feedback_waits_two_ticks() {
        let mut r = runner(2, 30, FeedbackTiming::Delayed);
        r.submit_answer(ok());
        assert_eq!(r.state(), RunnerState::AwaitingAdvance { index: 0 });

        r.tick();
        assert_eq!(r.state(), RunnerState::AwaitingAdvance { index: 0 });
        let events = r.tick();
        assert_eq!(r.state(), RunnerState::Presenting { index: 1 });
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::ItemAdvanced { from_index: 0, to_index: 1, .. })));
    }

    #[test]
    fn duplicate_submission_while_awaiting_is_ignored() {
        let mut r = runner(2, 30, FeedbackTiming::Delayed);
        r.submit_answer(wrong());
        assert!(r.submit_answer(ok()).is_empty());
        assert!(r.submit_answer(wrong()).is_empty());
        assert_eq!(r.correct_count(), 0);
        assert_eq!(r.mistakes().len(), 1);
    }

    #[test]
    fn expiry_wins_over_feedback_window() {
        let mut r = runner(3, 2, FeedbackTiming::Delayed);
        r.submit_answer(ok());
        r.tick();
        let events = r.tick();
        assert_eq!(r.state(), RunnerState::Completed);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::SessionCompleted { timed_out: true, .. }
        )));
        let result = r.result().unwrap();
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.total_count, 3);
        assert_eq!(result.time_taken_seconds, 2);
    }

    #[test]
    fn evaluator_failure_counts_as_incorrect() {
        let mut r = ExerciseSessionRunner::new(
            items(2),
            SessionSettings::new(30, FeedbackTiming::Immediate),
            Broken,
        )
        .unwrap();
        r.submit_answer(ok());
        assert_eq!(r.correct_count(), 0);
        assert_eq!(r.mistakes().len(), 1);
        assert_eq!(r.current_index(), Some(1));
    }

    #[test]
    fn hidden_explanations_are_not_recorded() {
        let mut settings = SessionSettings::new(30, FeedbackTiming::Immediate);
        settings.show_explanations = false;
        let mut r =
            ExerciseSessionRunner::new(items(1), settings, EvaluatorRegistry::with_defaults())
                .unwrap();
        r.submit_answer(wrong());
        let result = r.result().unwrap();
        assert_eq!(result.mistakes[0].explanation, None);
    }

    #[test]
    fn pause_freezes_clock_and_feedback_window() {
        let mut r = runner(2, 30, FeedbackTiming::Delayed);
        r.submit_answer(ok());
        assert_eq!(r.pause().len(), 1);
        for _ in 0..5 {
            assert!(r.tick().is_empty());
        }
        assert_eq!(r.state(), RunnerState::AwaitingAdvance { index: 0 });
        assert_eq!(r.remaining_secs(), 30);
        r.resume();
        r.tick();
        r.tick();
        assert_eq!(r.current_index(), Some(1));
    }

    #[test]
    fn stop_cancels_without_result() {
        let mut r = runner(2, 30, FeedbackTiming::Immediate);
        assert_eq!(r.stop().len(), 1);
        assert!(r.tick().is_empty());
        assert!(r.submit_answer(ok()).is_empty());
        assert!(r.result().is_none());
        assert!(r.is_finished());
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let mut settings = SessionSettings::new(30, FeedbackTiming::Immediate);
        settings.shuffle = true;
        let order = |seed: u64| {
            let r = ExerciseSessionRunner::with_clock(
                items(8),
                settings.clone(),
                EvaluatorRegistry::with_defaults(),
                CountdownClock::new(),
                &mut Pcg64::seed_from_u64(seed),
            )
            .unwrap();
            r.items().iter().map(|i| i.id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(order(7), order(7));
        let mut sorted = order(7);
        sorted.sort();
        assert_eq!(sorted, items(8).into_iter().map(|i| i.id).collect::<Vec<_>>());
    }

    #[test]
    fn result_accuracy() {
        let result = SessionResult {
            session_id: Uuid::nil(),
            correct_count: 3,
            total_count: 4,
            time_taken_seconds: 10,
            mistakes: Vec::new(),
        };
        assert!((result.accuracy() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_choice_is_recorded_as_mistake() {
        let choice = ExerciseItem {
            id: "mc".into(),
            prompt: ExercisePrompt::MultipleChoice {
                question: "Pick one".into(),
                options: vec!["only".into()],
            },
            correct_answer: Some("only".into()),
            explanation: None,
        };
        let mut r = ExerciseSessionRunner::new(
            vec![choice],
            SessionSettings::new(30, FeedbackTiming::Immediate),
            EvaluatorRegistry::with_defaults(),
        )
        .unwrap();

        let events = r.submit_answer(Answer::Choice(usize::MAX));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SessionCompleted { .. })));
        let result = r.result().unwrap();
        assert_eq!(result.correct_count, 0);
        assert_eq!(
            result.mistakes[0].user_answer,
            format!("option #{}", usize::MAX)
        );
    }
}
