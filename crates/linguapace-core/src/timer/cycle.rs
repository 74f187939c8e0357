//! Focus/break interval cycle.
//!
//! Like the session runner, the engine owns no thread. The caller invokes
//! `tick()` once per second; each call is one transition of the state
//! machine, so no callback ever has to remember settings between ticks.
//!
//! ## Phase Transitions
//!
//! ```text
//! Focus --expiry--> ShortBreak | LongBreak   (LongBreak when completed % n == 0)
//! ShortBreak | LongBreak --expiry--> Focus
//! ```
//!
//! Every natural expiry appends one [`CompletedInterval`] to history.
//! `skip()` and `manual_phase_switch()` never do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clock::{ClockSignal, ClockState, CountdownClock, SessionClock};
use crate::error::ValidationError;
use crate::events::{Event, TickPosition, TickSnapshot};
use crate::storage::SessionHistoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalPhase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl IntervalPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            IntervalPhase::Focus => "focus",
            IntervalPhase::ShortBreak => "short_break",
            IntervalPhase::LongBreak => "long_break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "focus" => Some(IntervalPhase::Focus),
            "short_break" => Some(IntervalPhase::ShortBreak),
            "long_break" => Some(IntervalPhase::LongBreak),
            _ => None,
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, IntervalPhase::Focus)
    }

    pub fn label(self) -> &'static str {
        match self {
            IntervalPhase::Focus => "Focus",
            IntervalPhase::ShortBreak => "Short Break",
            IntervalPhase::LongBreak => "Long Break",
        }
    }
}

impl std::fmt::Display for IntervalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cycle configuration, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSettings {
    pub focus_duration_min: u32,
    pub short_break_duration_min: u32,
    pub long_break_duration_min: u32,
    pub sessions_until_long_break: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_focus: bool,
}

impl Default for IntervalSettings {
    fn default() -> Self {
        Self {
            focus_duration_min: 25,
            short_break_duration_min: 5,
            long_break_duration_min: 15,
            sessions_until_long_break: 4,
            auto_start_breaks: false,
            auto_start_focus: false,
        }
    }
}

impl IntervalSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("focus_duration_min", self.focus_duration_min),
            ("short_break_duration_min", self.short_break_duration_min),
            ("long_break_duration_min", self.long_break_duration_min),
        ] {
            if value == 0 {
                return Err(ValidationError::invalid(field, "must be greater than 0"));
            }
        }
        if self.sessions_until_long_break < 2 {
            return Err(ValidationError::invalid(
                "sessions_until_long_break",
                "must be at least 2",
            ));
        }
        Ok(())
    }

    pub fn duration_min(&self, phase: IntervalPhase) -> u32 {
        match phase {
            IntervalPhase::Focus => self.focus_duration_min,
            IntervalPhase::ShortBreak => self.short_break_duration_min,
            IntervalPhase::LongBreak => self.long_break_duration_min,
        }
    }

    pub fn duration_secs(&self, phase: IntervalPhase) -> u64 {
        u64::from(self.duration_min(phase)).saturating_mul(60)
    }

    /// Whether entering `phase` after an expiry starts its clock.
    pub fn auto_starts(&self, phase: IntervalPhase) -> bool {
        if phase.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_focus
        }
    }
}

/// Phase that follows `phase` once `focus_completed` focus intervals are done.
pub fn next_phase(
    phase: IntervalPhase,
    focus_completed: u32,
    sessions_until_long_break: u32,
) -> IntervalPhase {
    match phase {
        IntervalPhase::Focus => {
            if sessions_until_long_break > 0 && focus_completed % sessions_until_long_break == 0 {
                IntervalPhase::LongBreak
            } else {
                IntervalPhase::ShortBreak
            }
        }
        IntervalPhase::ShortBreak | IntervalPhase::LongBreak => IntervalPhase::Focus,
    }
}

/// Immutable record of one naturally finished phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedInterval {
    /// Monotonic per engine; breaks ties between equal timestamps.
    pub seq: u64,
    pub phase: IntervalPhase,
    pub duration_minutes: u64,
    pub completed_at: DateTime<Utc>,
    pub completed: bool,
}

/// Focus/break cycle engine.
///
/// Runs until the caller stops it; there is no terminal phase.
pub struct IntervalCycleEngine<S, C = CountdownClock> {
    settings: IntervalSettings,
    store: S,
    clock: C,
    phase: IntervalPhase,
    focus_sessions_completed: u32,
    /// Focus intervals completed today before this engine existed.
    sessions_baseline: u32,
    next_seq: u64,
    last_completed_at: Option<DateTime<Utc>>,
}

impl<S: SessionHistoryStore> IntervalCycleEngine<S> {
    /// Create an idle engine in `Focus` on a fresh [`CountdownClock`].
    ///
    /// # Errors
    /// Returns a `ValidationError` if the settings are invalid.
    pub fn new(settings: IntervalSettings, store: S) -> Result<Self, ValidationError> {
        Self::with_clock(settings, store, CountdownClock::new())
    }
}

impl<S: SessionHistoryStore, C: SessionClock> IntervalCycleEngine<S, C> {
    /// # Errors
    /// Returns a `ValidationError` if the settings are invalid.
    pub fn with_clock(
        settings: IntervalSettings,
        store: S,
        mut clock: C,
    ) -> Result<Self, ValidationError> {
        settings.validate()?;
        clock.reset(settings.duration_secs(IntervalPhase::Focus))?;
        Ok(Self {
            settings,
            store,
            clock,
            phase: IntervalPhase::Focus,
            focus_sessions_completed: 0,
            sessions_baseline: 0,
            next_seq: 1,
            last_completed_at: None,
        })
    }

    /// Count focus intervals finished earlier today in tick snapshots.
    /// Does not affect when long breaks happen.
    pub fn with_sessions_completed_today(mut self, count: u32) -> Self {
        self.sessions_baseline = count;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> IntervalPhase {
        self.phase
    }

    pub fn settings(&self) -> &IntervalSettings {
        &self.settings
    }

    pub fn focus_sessions_completed(&self) -> u32 {
        self.focus_sessions_completed
    }

    pub fn sessions_completed_today(&self) -> u32 {
        self.sessions_baseline + self.focus_sessions_completed
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.clock.remaining_secs()
    }

    pub fn total_secs(&self) -> u64 {
        self.clock.total_secs()
    }

    pub fn history(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            position: TickPosition::Phase { phase: self.phase },
            seconds_remaining: self.clock.remaining_secs(),
            total_seconds: self.clock.total_secs(),
            sessions_completed_today: self.sessions_completed_today(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the current phase, or resume it if paused.
    pub fn start(&mut self) -> Vec<Event> {
        match self.clock.state() {
            ClockState::Running => Vec::new(),
            ClockState::Paused => self.resume(),
            ClockState::Idle | ClockState::Expired => self.run_phase().into_iter().collect(),
        }
    }

    pub fn pause(&mut self) -> Vec<Event> {
        if !self.clock.pause() {
            return Vec::new();
        }
        vec![Event::ClockPaused {
            remaining_secs: self.clock.remaining_secs(),
            at: Utc::now(),
        }]
    }

    pub fn resume(&mut self) -> Vec<Event> {
        if !self.clock.resume() {
            return Vec::new();
        }
        vec![Event::ClockResumed {
            remaining_secs: self.clock.remaining_secs(),
            at: Utc::now(),
        }]
    }

    /// Cancel the active run. The current phase stays selected, idle at its
    /// full duration.
    pub fn stop(&mut self) -> Vec<Event> {
        self.clock.stop();
        self.rebaseline();
        tracing::debug!(phase = %self.phase, "cycle stopped");
        vec![Event::CycleStopped {
            phase: self.phase,
            at: Utc::now(),
        }]
    }

    /// Call once per elapsed second.
    pub fn tick(&mut self) -> Vec<Event> {
        match self.clock.tick() {
            None => Vec::new(),
            Some(ClockSignal::Tick { .. }) => vec![Event::Tick {
                snapshot: self.snapshot(),
                at: Utc::now(),
            }],
            Some(ClockSignal::Expired) => self.on_phase_expired(),
        }
    }

    /// Move on to the phase that would naturally follow, without recording
    /// the current one or counting it toward the long break. A running clock
    /// keeps running in the new phase; an idle one stays idle.
    pub fn skip(&mut self) -> Vec<Event> {
        let from = self.phase;
        let to = next_phase(
            from,
            self.focus_sessions_completed + 1,
            self.settings.sessions_until_long_break,
        );
        let was_running = self.clock.is_running();

        self.phase = to;
        self.rebaseline();
        tracing::debug!(%from, %to, "phase skipped");

        let mut events = vec![Event::PhaseSkipped {
            from,
            to,
            at: Utc::now(),
        }];
        if was_running {
            events.extend(self.run_phase());
        }
        events
    }

    /// Jump to `phase`, cancelling the current run. The engine stays stopped
    /// until `start()`.
    pub fn manual_phase_switch(&mut self, phase: IntervalPhase) -> Vec<Event> {
        let from = self.phase;
        self.clock.stop();
        self.phase = phase;
        self.rebaseline();
        tracing::debug!(%from, to = %phase, "phase switched manually");
        vec![Event::PhaseSwitched {
            from,
            to: phase,
            at: Utc::now(),
        }]
    }

    /// Replace the settings. An idle clock is re-baselined to the new
    /// duration of the current phase; an in-flight countdown is left alone.
    ///
    /// # Errors
    /// Returns a `ValidationError` and keeps the old settings if the new
    /// ones are invalid.
    pub fn update_settings(
        &mut self,
        settings: IntervalSettings,
    ) -> Result<Vec<Event>, ValidationError> {
        settings.validate()?;
        self.settings = settings;
        let rebaselined = matches!(self.clock.state(), ClockState::Idle | ClockState::Expired);
        if rebaselined {
            self.rebaseline();
        }
        Ok(vec![Event::SettingsUpdated {
            rebaselined,
            at: Utc::now(),
        }])
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn on_phase_expired(&mut self) -> Vec<Event> {
        let finished = self.phase;
        if finished == IntervalPhase::Focus {
            self.focus_sessions_completed += 1;
        }
        let next = next_phase(
            finished,
            self.focus_sessions_completed,
            self.settings.sessions_until_long_break,
        );
        let auto_started = self.settings.auto_starts(next);
        let record = self.completion_record(finished);

        let mut events = vec![Event::PhaseCompleted {
            record: record.clone(),
            next_phase: next,
            auto_started,
            at: Utc::now(),
        }];

        match self.store.append(&record) {
            Ok(()) => tracing::info!(
                phase = %finished,
                seq = record.seq,
                focus_completed = self.focus_sessions_completed,
                "interval completed"
            ),
            Err(error) => {
                tracing::warn!(
                    phase = %finished,
                    seq = record.seq,
                    %error,
                    "failed to append interval to history"
                );
                events.push(Event::HistoryAppendFailed {
                    record,
                    message: error.to_string(),
                    at: Utc::now(),
                });
            }
        }

        self.phase = next;
        self.rebaseline();
        if auto_started {
            events.extend(self.run_phase());
        }
        events
    }

    fn completion_record(&mut self, phase: IntervalPhase) -> CompletedInterval {
        let seq = self.next_seq;
        self.next_seq += 1;

        let now = Utc::now();
        let completed_at = match self.last_completed_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_completed_at = Some(completed_at);

        CompletedInterval {
            seq,
            phase,
            duration_minutes: self.clock.total_secs().div_ceil(60),
            completed_at,
            completed: true,
        }
    }

    /// Leave the clock idle at the configured duration of the current phase.
    fn rebaseline(&mut self) {
        let secs = self.settings.duration_secs(self.phase);
        if let Err(error) = self.clock.reset(secs) {
            tracing::error!(phase = %self.phase, %error, "failed to reset clock");
        }
    }

    fn run_phase(&mut self) -> Option<Event> {
        let duration_secs = self.settings.duration_secs(self.phase);
        match self.clock.start(duration_secs) {
            Ok(()) => {
                tracing::debug!(phase = %self.phase, duration_secs, "phase started");
                Some(Event::PhaseStarted {
                    phase: self.phase,
                    duration_secs,
                    at: Utc::now(),
                })
            }
            Err(error) => {
                tracing::error!(phase = %self.phase, %error, "failed to start clock");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryHistoryStore;

    fn settings() -> IntervalSettings {
        IntervalSettings {
            focus_duration_min: 1,
            short_break_duration_min: 1,
            long_break_duration_min: 2,
            sessions_until_long_break: 2,
            auto_start_breaks: false,
            auto_start_focus: false,
        }
    }

    fn engine(settings: IntervalSettings) -> IntervalCycleEngine<InMemoryHistoryStore> {
        IntervalCycleEngine::new(settings, InMemoryHistoryStore::new()).unwrap()
    }

    fn run_out(engine: &mut IntervalCycleEngine<InMemoryHistoryStore>) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..engine.remaining_secs() {
            events.extend(engine.tick());
        }
        events
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut s = settings();
        s.sessions_until_long_break = 1;
        assert!(IntervalCycleEngine::new(s, InMemoryHistoryStore::new()).is_err());
        let mut s = settings();
        s.short_break_duration_min = 0;
        assert!(IntervalCycleEngine::new(s, InMemoryHistoryStore::new()).is_err());
    }

    #[test]
    fn starts_idle_in_focus() {
        let e = engine(settings());
        assert_eq!(e.phase(), IntervalPhase::Focus);
        assert_eq!(e.clock_state(), ClockState::Idle);
        assert_eq!(e.remaining_secs(), 60);
    }

    #[test]
    fn next_phase_follows_modulo() {
        assert_eq!(next_phase(IntervalPhase::Focus, 1, 4), IntervalPhase::ShortBreak);
        assert_eq!(next_phase(IntervalPhase::Focus, 4, 4), IntervalPhase::LongBreak);
        assert_eq!(next_phase(IntervalPhase::Focus, 8, 4), IntervalPhase::LongBreak);
        assert_eq!(next_phase(IntervalPhase::LongBreak, 8, 4), IntervalPhase::Focus);
    }

    #[test]
    fn focus_expiry_records_and_waits_for_manual_start() {
        let mut e = engine(settings());
        e.start();
        let events = run_out(&mut e);
        assert!(events
            .iter()
            .any(|ev| matches!(ev, Event::PhaseCompleted { auto_started: false, .. })));
        assert_eq!(e.focus_sessions_completed(), 1);
        assert_eq!(e.phase(), IntervalPhase::ShortBreak);
        assert_eq!(e.clock_state(), ClockState::Idle);
        assert_eq!(e.history().len(), 1);
        assert_eq!(e.history().records()[0].phase, IntervalPhase::Focus);
        assert!(e.tick().is_empty());
    }

    #[test]
    fn break_expiry_auto_starts_focus_when_enabled() {
        let mut s = settings();
        s.auto_start_focus = true;
        let mut e = engine(s);
        e.manual_phase_switch(IntervalPhase::ShortBreak);
        e.start();
        run_out(&mut e);
        assert_eq!(e.phase(), IntervalPhase::Focus);
        assert!(e.is_running());
        assert_eq!(e.focus_sessions_completed(), 0);
        assert_eq!(e.history().records()[0].phase, IntervalPhase::ShortBreak);
    }

    #[test]
    fn skip_neither_records_nor_counts() {
        let mut e = engine(settings());
        e.start();
        e.tick();
        let events = e.skip();
        assert!(matches!(
            events[0],
            Event::PhaseSkipped {
                from: IntervalPhase::Focus,
                to: IntervalPhase::ShortBreak,
                ..
            }
        ));
        assert_eq!(e.focus_sessions_completed(), 0);
        assert!(e.history().is_empty());
        assert!(e.is_running());
        assert_eq!(e.remaining_secs(), 60);
    }

    #[test]
    fn skip_from_idle_stays_idle() {
        let mut e = engine(settings());
        e.skip();
        assert_eq!(e.phase(), IntervalPhase::ShortBreak);
        assert_eq!(e.clock_state(), ClockState::Idle);
    }

    #[test]
    fn manual_switch_cancels_run() {
        let mut e = engine(settings());
        e.start();
        e.tick();
        e.manual_phase_switch(IntervalPhase::LongBreak);
        assert_eq!(e.phase(), IntervalPhase::LongBreak);
        assert_eq!(e.clock_state(), ClockState::Idle);
        assert_eq!(e.remaining_secs(), 120);
        assert!(e.tick().is_empty());
        assert!(e.history().is_empty());
    }

    #[test]
    fn settings_update_rebaselines_only_idle_clock() {
        let mut e = engine(settings());
        let mut longer = settings();
        longer.focus_duration_min = 3;
        e.update_settings(longer.clone()).unwrap();
        assert_eq!(e.remaining_secs(), 180);

        e.start();
        e.tick();
        let mut shorter = longer;
        shorter.focus_duration_min = 1;
        let events = e.update_settings(shorter).unwrap();
        assert!(matches!(
            events[0],
            Event::SettingsUpdated {
                rebaselined: false,
                ..
            }
        ));
        assert_eq!(e.remaining_secs(), 179);
    }

    #[test]
    fn invalid_settings_update_keeps_old_settings() {
        let mut e = engine(settings());
        let mut bad = settings();
        bad.sessions_until_long_break = 0;
        assert!(e.update_settings(bad).is_err());
        assert_eq!(e.settings().sessions_until_long_break, 2);
    }

    #[test]
    fn stop_cancels_and_rebaselines() {
        let mut e = engine(settings());
        e.start();
        e.tick();
        e.stop();
        assert!(e.tick().is_empty());
        assert_eq!(e.remaining_secs(), 60);
        e.start();
        assert!(e.is_running());
    }

    #[test]
    fn pause_and_start_resume() {
        let mut e = engine(settings());
        e.start();
        e.tick();
        assert_eq!(e.pause().len(), 1);
        assert!(e.tick().is_empty());
        let events = e.start();
        assert!(matches!(events[0], Event::ClockResumed { remaining_secs: 59, .. }));
    }

    #[test]
    fn records_carry_increasing_sequence() {
        let mut s = settings();
        s.auto_start_breaks = true;
        s.auto_start_focus = true;
        let mut e = engine(s);
        e.start();
        for _ in 0..(60 * 4) {
            e.tick();
        }
        let records = e.history().records();
        assert!(records.len() >= 3);
        for pair in records.windows(2) {
            assert!(pair[0].seq < pair[1].seq);
            assert!(pair[0].completed_at <= pair[1].completed_at);
        }
    }

    #[test]
    fn baseline_only_affects_reported_count() {
        let mut e = engine(settings()).with_sessions_completed_today(5);
        assert_eq!(e.snapshot().sessions_completed_today, 5);
        e.start();
        run_out(&mut e);
        assert_eq!(e.sessions_completed_today(), 6);
        assert_eq!(e.phase(), IntervalPhase::ShortBreak);
    }
}
