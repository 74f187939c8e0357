use chrono::Utc;
use clap::Subcommand;
use linguapace_core::error::Result;
use linguapace_core::{IntervalPhase, SessionHistoryStore, SqliteHistoryStore};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Most recent completed intervals, newest first
    Recent {
        /// How many to show
        #[arg(default_value = "10")]
        n: usize,
    },
    /// Intervals completed since midnight (UTC), per phase
    Today,
}

pub fn run(action: HistoryAction) -> Result<()> {
    let store = SqliteHistoryStore::open()?;

    match action {
        HistoryAction::Recent { n } => {
            let records = store.list_recent(n)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        HistoryAction::Today => {
            let midnight = Utc::now()
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc())
                .unwrap_or_else(Utc::now);
            let mut counts = serde_json::Map::new();
            for phase in [
                IntervalPhase::Focus,
                IntervalPhase::ShortBreak,
                IntervalPhase::LongBreak,
            ] {
                let count = store.count_since(phase, midnight)?;
                counts.insert(phase.as_str().to_string(), count.into());
            }
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
    }
    Ok(())
}
