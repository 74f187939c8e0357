use std::path::{Path, PathBuf};

use clap::Subcommand;
use linguapace_core::error::Result;
use linguapace_core::{
    drive, Answer, Config, CoreError, CountdownClock, Difficulty, DriveOutcome, EvaluatorRegistry,
    Event, ExerciseItem, ExercisePrompt, ExerciseSessionRunner, FeedbackTiming,
};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tokio::sync::watch;

use super::{cancel_channel, cancel_on_ctrl_c, emit, runtime, spawn_stdin_reader, tick_period};

#[derive(Subcommand)]
pub enum PracticeAction {
    /// Run a timed session. Answers are read from stdin, one per line.
    ///
    /// Multiple choice takes a 1-based option number or the option text,
    /// matching takes `left=right;left=right`. `:pause`, `:resume` and `:quit`
    /// control the session.
    Run {
        /// JSON file holding an array of exercise items
        file: PathBuf,
        /// Session length in seconds (defaults to config)
        #[arg(long)]
        duration: Option<u64>,
        /// Feedback timing: immediate, delayed or end
        #[arg(long)]
        feedback: Option<FeedbackTiming>,
        /// Answer strictness: easy, medium or hard
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Shuffle item order
        #[arg(long)]
        shuffle: bool,
        /// Seed for a reproducible shuffle
        #[arg(long)]
        seed: Option<u64>,
        /// Milliseconds per tick
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },
    /// Validate an items file and print a summary
    Check {
        /// JSON file holding an array of exercise items
        file: PathBuf,
    },
}

pub fn run(action: PracticeAction) -> Result<()> {
    match action {
        PracticeAction::Run {
            file,
            duration,
            feedback,
            difficulty,
            shuffle,
            seed,
            tick_ms,
        } => {
            let items = load_items(&file)?;
            let mut settings = Config::load()?.session_settings()?;
            if let Some(duration) = duration {
                settings.duration_seconds = duration;
            }
            if let Some(feedback) = feedback {
                settings.feedback_timing = feedback;
            }
            if let Some(difficulty) = difficulty {
                settings.difficulty = difficulty;
            }
            settings.shuffle |= shuffle || seed.is_some();

            let registry = EvaluatorRegistry::with_defaults();
            let mut runner = match seed {
                Some(seed) => ExerciseSessionRunner::with_clock(
                    items,
                    settings,
                    registry,
                    CountdownClock::new(),
                    &mut Pcg64::seed_from_u64(seed),
                )?,
                None => ExerciseSessionRunner::new(items, settings, registry)?,
            };

            let prompts: Vec<String> = runner.items().iter().map(describe).collect();
            if let Some(first) = prompts.first() {
                eprintln!("[1/{}] {first}", prompts.len());
            }

            let rt = runtime()?;
            let outcome = rt.block_on(async {
                let (cancel, cancel_rx) = cancel_channel();
                cancel_on_ctrl_c(cancel.clone());
                let inputs = spawn_stdin_reader();
                drive(
                    &mut runner,
                    tick_period(tick_ms),
                    cancel_rx,
                    inputs,
                    |runner, line| apply_line(runner, &line, &cancel),
                    |event| {
                        emit(event);
                        if let Event::ItemAdvanced { to_index, .. } = event {
                            if let Some(prompt) = prompts.get(*to_index) {
                                eprintln!("[{}/{}] {prompt}", to_index + 1, prompts.len());
                            }
                        }
                    },
                )
                .await
            });
            rt.shutdown_background();

            match (outcome, runner.into_result()) {
                (DriveOutcome::Finished, Some(result)) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                _ => eprintln!("session stopped"),
            }
        }
        PracticeAction::Check { file } => {
            let items = load_items(&file)?;
            let registry = EvaluatorRegistry::with_defaults();
            let mut kinds = std::collections::BTreeMap::<String, usize>::new();
            let mut problems = Vec::new();
            for item in &items {
                *kinds.entry(item.kind().to_string()).or_default() += 1;
                if item.correct_answer.is_none() {
                    problems.push(format!("{}: missing correct_answer", item.id));
                }
                if !registry.supports(item.kind()) {
                    problems.push(format!("{}: no evaluator for {}", item.id, item.kind()));
                }
            }
            let summary = serde_json::json!({
                "items": items.len(),
                "kinds": kinds,
                "problems": problems,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn load_items(path: &Path) -> Result<Vec<ExerciseItem>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Custom(format!("cannot read {}: {e}", path.display())))?;
    let items: Vec<ExerciseItem> = serde_json::from_str(&content)?;
    Ok(items)
}

fn apply_line(
    runner: &mut ExerciseSessionRunner<EvaluatorRegistry>,
    line: &str,
    cancel: &watch::Sender<bool>,
) -> Vec<Event> {
    let line = line.trim();
    match line {
        "" => Vec::new(),
        ":pause" => runner.pause(),
        ":resume" => runner.resume(),
        ":quit" => {
            let _ = cancel.send(true);
            Vec::new()
        }
        _ => match runner.current_item() {
            Some(item) => {
                let answer = parse_answer(&item.prompt, line);
                runner.submit_answer(answer)
            }
            None => Vec::new(),
        },
    }
}

/// Interpret a typed line against the prompt it answers.
fn parse_answer(prompt: &ExercisePrompt, line: &str) -> Answer {
    match prompt {
        ExercisePrompt::MultipleChoice { options, .. } => match line.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => Answer::Choice(n - 1),
            _ => Answer::Text(line.to_string()),
        },
        ExercisePrompt::Matching { .. } => Answer::Pairs(
            line.split(';')
                .filter_map(|pair| pair.split_once('='))
                .map(|(l, r)| (l.trim().to_string(), r.trim().to_string()))
                .collect(),
        ),
        _ => Answer::Text(line.to_string()),
    }
}

fn describe(item: &ExerciseItem) -> String {
    let question = item.prompt.question_text();
    match &item.prompt {
        ExercisePrompt::MultipleChoice { options, .. } => {
            let numbered: Vec<String> = options
                .iter()
                .enumerate()
                .map(|(i, o)| format!("{}) {o}", i + 1))
                .collect();
            format!("{question}  {}", numbered.join("  "))
        }
        ExercisePrompt::Matching { left, right, .. } => {
            format!("{question}  [{}] <-> [{}]", left.join(", "), right.join(", "))
        }
        _ => question,
    }
}
