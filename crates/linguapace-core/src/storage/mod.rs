mod config;
pub mod history;

pub use config::{Config, CycleConfig, PracticeConfig};
pub use history::{InMemoryHistoryStore, SessionHistoryStore, SqliteHistoryStore};

use std::path::PathBuf;

/// Returns `~/.config/linguapace[-dev]/` based on LINGUAPACE_ENV.
///
/// Set LINGUAPACE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("LINGUAPACE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("linguapace-dev")
    } else {
        base_dir.join("linguapace")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
