//! Integration tests for timed practice sessions.
//!
//! Drives the runner tick by tick the way a host would, covering the
//! timeout, feedback-timing and idempotence guarantees.

use linguapace_core::{
    Answer, EvaluatorRegistry, Event, ExerciseItem, ExercisePrompt, ExerciseSessionRunner,
    FeedbackTiming, RunnerState, SessionSettings,
};
use proptest::prelude::*;

fn vocab_items(n: usize) -> Vec<ExerciseItem> {
    (0..n)
        .map(|i| ExerciseItem {
            id: format!("vocab-{i}"),
            prompt: ExercisePrompt::MultipleChoice {
                question: format!("Word #{i}"),
                options: vec!["right".into(), "wrong".into()],
            },
            correct_answer: Some("right".into()),
            explanation: Some("The first option is always right here.".into()),
        })
        .collect()
}

fn runner(
    n: usize,
    duration: u64,
    timing: FeedbackTiming,
) -> ExerciseSessionRunner<EvaluatorRegistry> {
    ExerciseSessionRunner::new(
        vocab_items(n),
        SessionSettings::new(duration, timing),
        EvaluatorRegistry::with_defaults(),
    )
    .unwrap()
}

fn completed_in(events: &[Event]) -> bool {
    events
        .iter()
        .any(|e| matches!(e, Event::SessionCompleted { .. }))
}

#[test]
fn all_answers_before_timeout_complete_on_last_answer() {
    let mut r = runner(3, 5, FeedbackTiming::End);

    r.tick();
    assert!(!completed_in(&r.submit_answer(Answer::Choice(0))));
    r.tick();
    assert!(!completed_in(&r.submit_answer(Answer::Choice(0))));
    let events = r.submit_answer(Answer::Choice(0));
    assert!(completed_in(&events));

    let result = r.result().unwrap();
    assert_eq!(r.state(), RunnerState::Completed);
    assert_eq!(result.correct_count, 3);
    assert_eq!(result.total_count, 3);
    assert!(result.time_taken_seconds < 5);
    assert_eq!(result.time_taken_seconds, 2);
}

#[test]
fn no_input_completes_at_final_tick() {
    let mut r = runner(3, 5, FeedbackTiming::End);
    for _ in 0..4 {
        assert!(!completed_in(&r.tick()));
    }
    let events = r.tick();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::SessionCompleted { timed_out: true, .. })));

    let result = r.result().unwrap();
    assert_eq!(result.correct_count, 0);
    assert_eq!(result.time_taken_seconds, 5);
    assert!(r.tick().is_empty());
}

#[test]
fn timeout_keeps_partial_progress() {
    let mut r = runner(4, 3, FeedbackTiming::Immediate);
    r.submit_answer(Answer::Choice(0));
    r.submit_answer(Answer::Choice(1));
    for _ in 0..3 {
        r.tick();
    }
    let result = r.result().unwrap();
    assert_eq!(result.correct_count, 1);
    assert_eq!(result.total_count, 4);
    assert_eq!(result.mistakes.len(), 1);
    assert_eq!(result.mistakes[0].question, "Word #1");
    assert_eq!(result.mistakes[0].user_answer, "wrong");
    assert_eq!(result.mistakes[0].correct_answer, "right");
}

#[test]
fn mixed_kinds_dispatch_to_their_evaluators() {
    let items = vec![
        ExerciseItem {
            id: "fill".into(),
            prompt: ExercisePrompt::FillBlank {
                sentence: "Je ___ français.".into(),
            },
            correct_answer: Some("parle".into()),
            explanation: None,
        },
        ExerciseItem {
            id: "match".into(),
            prompt: ExercisePrompt::Matching {
                instruction: "Match the numbers".into(),
                left: vec!["un".into(), "deux".into()],
                right: vec!["one".into(), "two".into()],
            },
            correct_answer: Some("un=one;deux=two".into()),
            explanation: None,
        },
        ExerciseItem {
            id: "listen".into(),
            prompt: ExercisePrompt::Listening {
                transcript_hint: None,
                audio_ref: "audio/bonjour.ogg".into(),
            },
            correct_answer: Some("bonjour".into()),
            explanation: None,
        },
    ];
    let mut r = ExerciseSessionRunner::new(
        items,
        SessionSettings::new(60, FeedbackTiming::Immediate),
        EvaluatorRegistry::with_defaults(),
    )
    .unwrap();

    r.submit_answer(Answer::Text("Parle".into()));
    r.submit_answer(Answer::Pairs(vec![
        ("deux".into(), "two".into()),
        ("un".into(), "one".into()),
    ]));
    // Wrong answer shape: the evaluator fails, the session carries on.
    r.submit_answer(Answer::Choice(0));

    let result = r.result().unwrap();
    assert_eq!(result.correct_count, 2);
    assert_eq!(result.mistakes.len(), 1);
    assert_eq!(result.mistakes[0].question, "Listen: audio/bonjour.ogg");
}

proptest! {
    #[test]
    fn untouched_session_completes_exactly_at_duration(
        n in 1usize..6,
        duration in 1u64..40,
        timing in prop_oneof![
            Just(FeedbackTiming::Immediate),
            Just(FeedbackTiming::Delayed),
            Just(FeedbackTiming::End),
        ],
    ) {
        let mut r = runner(n, duration, timing);
        for _ in 1..duration {
            r.tick();
            prop_assert!(r.result().is_none());
        }
        r.tick();
        let result = r.result().unwrap();
        prop_assert_eq!(result.time_taken_seconds, duration);
        prop_assert_eq!(result.correct_count, 0);
    }

    #[test]
    fn immediate_index_tracks_submissions(n in 1usize..10, k_frac in 0.0f64..=1.0) {
        let k = ((n as f64) * k_frac).round() as usize;
        let mut r = runner(n, 600, FeedbackTiming::Immediate);
        for _ in 0..k {
            r.submit_answer(Answer::Choice(0));
        }
        if k == n {
            prop_assert_eq!(r.state(), RunnerState::Completed);
        } else {
            prop_assert_eq!(r.current_index(), Some(k));
        }
    }

    #[test]
    fn repeated_submissions_in_feedback_window_change_nothing(
        n in 1usize..5,
        first_correct in any::<bool>(),
        extra in proptest::collection::vec(any::<bool>(), 1..6),
    ) {
        let mut r = runner(n, 600, FeedbackTiming::Delayed);
        r.submit_answer(Answer::Choice(if first_correct { 0 } else { 1 }));
        let correct = r.correct_count();
        let mistakes = r.mistakes().to_vec();

        for right in extra {
            let events = r.submit_answer(Answer::Choice(if right { 0 } else { 1 }));
            prop_assert!(events.is_empty());
        }
        prop_assert_eq!(r.correct_count(), correct);
        prop_assert_eq!(r.mistakes(), mistakes.as_slice());
        prop_assert_eq!(r.state(), RunnerState::AwaitingAdvance { index: 0 });
    }
}
