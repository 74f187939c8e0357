//! Async tick driver.
//!
//! The engines are plain state machines; something has to call `tick()` once
//! per second. [`drive`] is that something for tokio hosts. It is the only
//! timer in the system, and cancelling it stops the engine's clock, so no
//! ticks leak after the caller navigates away.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::events::Event;
use crate::practice::{ExerciseEvaluator, ExerciseSessionRunner};
use crate::storage::SessionHistoryStore;
use crate::timer::{IntervalCycleEngine, SessionClock};

/// An engine advanced by periodic ticks.
pub trait TickDriven {
    fn tick(&mut self) -> Vec<Event>;

    /// No further ticks will produce events.
    fn is_finished(&self) -> bool;

    /// Cancel the active clock run.
    fn stop(&mut self) -> Vec<Event>;
}

impl<E: ExerciseEvaluator, C: SessionClock> TickDriven for ExerciseSessionRunner<E, C> {
    fn tick(&mut self) -> Vec<Event> {
        ExerciseSessionRunner::tick(self)
    }

    fn is_finished(&self) -> bool {
        ExerciseSessionRunner::is_finished(self)
    }

    fn stop(&mut self) -> Vec<Event> {
        ExerciseSessionRunner::stop(self)
    }
}

impl<S: SessionHistoryStore, C: SessionClock> TickDriven for IntervalCycleEngine<S, C> {
    fn tick(&mut self) -> Vec<Event> {
        IntervalCycleEngine::tick(self)
    }

    /// The cycle has no terminal phase.
    fn is_finished(&self) -> bool {
        false
    }

    fn stop(&mut self) -> Vec<Event> {
        IntervalCycleEngine::stop(self)
    }
}

/// Why [`drive`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The engine reached its terminal state.
    Finished,
    /// The cancel signal fired (or its sender was dropped).
    Cancelled,
}

/// Tick `engine` every `period` until it finishes or `cancel` becomes `true`.
///
/// Caller input (answers, skip requests, ...) arrives on `inputs` and is
/// applied through `apply` between ticks, so the engine only ever sees one
/// operation at a time. Every event produced, including the ones from the
/// final `stop()`, is passed to `on_event`. The first tick fires one `period`
/// after the call.
pub async fn drive<T, I, A, F>(
    engine: &mut T,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
    mut inputs: mpsc::UnboundedReceiver<I>,
    mut apply: A,
    mut on_event: F,
) -> DriveOutcome
where
    T: TickDriven + ?Sized,
    A: FnMut(&mut T, I) -> Vec<Event>,
    F: FnMut(&Event),
{
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut inputs_open = true;

    loop {
        if engine.is_finished() {
            return DriveOutcome::Finished;
        }
        if *cancel.borrow() {
            break;
        }

        tokio::select! {
            _ = interval.tick() => {
                for event in engine.tick() {
                    on_event(&event);
                }
            }
            input = inputs.recv(), if inputs_open => match input {
                Some(input) => {
                    for event in apply(&mut *engine, input) {
                        on_event(&event);
                    }
                }
                None => inputs_open = false,
            },
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
        }
    }

    tracing::debug!("tick driver cancelled");
    for event in engine.stop() {
        on_event(&event);
    }
    DriveOutcome::Cancelled
}
