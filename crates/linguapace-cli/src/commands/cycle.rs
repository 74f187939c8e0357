use clap::Subcommand;
use linguapace_core::error::Result;
use linguapace_core::{drive, Config, Event, IntervalCycleEngine, IntervalPhase, SqliteHistoryStore};
use tokio::sync::watch;

use super::{cancel_channel, cancel_on_ctrl_c, emit, runtime, spawn_stdin_reader, tick_period};

#[derive(Subcommand)]
pub enum CycleAction {
    /// Run the focus/break cycle, recording completed intervals.
    ///
    /// Keys (followed by Enter): empty line starts a stopped phase, `s` skips,
    /// `p`/`r` pause/resume, `x` stops the current run, `c` reloads config,
    /// a phase name (focus, short_break, long_break) switches to it, `q` quits.
    Run {
        /// Quit after this many focus intervals complete
        #[arg(long)]
        focus_sessions: Option<u32>,
        /// Milliseconds per tick
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },
}

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum CycleCommand {
    Start,
    Skip,
    Pause,
    Resume,
    Stop,
    Reload,
    Switch(IntervalPhase),
    Quit,
}

impl CycleCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => Some(Self::Start),
            "s" => Some(Self::Skip),
            "p" => Some(Self::Pause),
            "r" => Some(Self::Resume),
            "x" => Some(Self::Stop),
            "c" => Some(Self::Reload),
            "q" => Some(Self::Quit),
            other => IntervalPhase::parse(other).map(Self::Switch),
        }
    }
}

pub fn run(action: CycleAction) -> Result<()> {
    match action {
        CycleAction::Run {
            focus_sessions,
            tick_ms,
        } => {
            let settings = Config::load()?.interval_settings()?;
            let store = SqliteHistoryStore::open()?;
            let baseline = store.focus_completed_today()?;
            let mut engine =
                IntervalCycleEngine::new(settings, store)?.with_sessions_completed_today(baseline);

            for event in engine.start() {
                emit(&event);
                announce(&event);
            }

            let rt = runtime()?;
            rt.block_on(async {
                let (cancel, cancel_rx) = cancel_channel();
                cancel_on_ctrl_c(cancel.clone());
                let inputs = spawn_stdin_reader();
                let mut focus_done = 0u32;
                drive(
                    &mut engine,
                    tick_period(tick_ms),
                    cancel_rx,
                    inputs,
                    |engine, line| apply_line(engine, &line, &cancel),
                    |event| {
                        emit(event);
                        announce(event);
                        if let Event::PhaseCompleted { record, .. } = event {
                            if record.phase == IntervalPhase::Focus {
                                focus_done += 1;
                                if focus_sessions.is_some_and(|limit| focus_done >= limit) {
                                    let _ = cancel.send(true);
                                }
                            }
                        }
                    },
                )
                .await
            });
            rt.shutdown_background();

            let summary = serde_json::json!({
                "focus_sessions_completed": engine.focus_sessions_completed(),
                "sessions_completed_today": engine.sessions_completed_today(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

/// Human-readable phase changes on stderr.
fn announce(event: &Event) {
    if let Event::PhaseStarted {
        phase,
        duration_secs,
        ..
    } = event
    {
        eprintln!("{} started ({} min)", phase.label(), duration_secs / 60);
    }
}

fn apply_line(
    engine: &mut IntervalCycleEngine<SqliteHistoryStore>,
    line: &str,
    cancel: &watch::Sender<bool>,
) -> Vec<Event> {
    let Some(command) = CycleCommand::parse(line) else {
        eprintln!("unknown command: {}", line.trim());
        return Vec::new();
    };
    match command {
        CycleCommand::Start => engine.start(),
        CycleCommand::Skip => engine.skip(),
        CycleCommand::Pause => engine.pause(),
        CycleCommand::Resume => engine.resume(),
        CycleCommand::Stop => engine.stop(),
        CycleCommand::Switch(phase) => engine.manual_phase_switch(phase),
        CycleCommand::Reload => {
            let reloaded = Config::load()
                .map_err(|e| e.to_string())
                .and_then(|config| config.interval_settings().map_err(|e| e.to_string()))
                .and_then(|settings| engine.update_settings(settings).map_err(|e| e.to_string()));
            match reloaded {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(error = %e, "config reload failed");
                    Vec::new()
                }
            }
        }
        CycleCommand::Quit => {
            let _ = cancel.send(true);
            Vec::new()
        }
    }
}
