//! Interval history storage.
//!
//! Provides the append-only log the cycle engine writes completed intervals
//! to:
//! - [`SessionHistoryStore`]: the capability the engine depends on
//! - [`InMemoryHistoryStore`]: ephemeral log for tests and previews
//! - [`SqliteHistoryStore`]: persistent log at `~/.config/linguapace/linguapace.db`

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::data_dir;
use crate::error::StorageError;
use crate::timer::{CompletedInterval, IntervalPhase};

/// Append-only, time-ordered log of completed intervals.
pub trait SessionHistoryStore {
    /// Append one record. Records arrive in strictly increasing `seq` order.
    fn append(&mut self, record: &CompletedInterval) -> Result<(), StorageError>;

    /// Up to `n` records, most recent first.
    fn list_recent(&self, n: usize) -> Result<Vec<CompletedInterval>, StorageError>;
}

impl<S: SessionHistoryStore + ?Sized> SessionHistoryStore for &mut S {
    fn append(&mut self, record: &CompletedInterval) -> Result<(), StorageError> {
        (**self).append(record)
    }

    fn list_recent(&self, n: usize) -> Result<Vec<CompletedInterval>, StorageError> {
        (**self).list_recent(n)
    }
}

impl<S: SessionHistoryStore + ?Sized> SessionHistoryStore for Box<S> {
    fn append(&mut self, record: &CompletedInterval) -> Result<(), StorageError> {
        (**self).append(record)
    }

    fn list_recent(&self, n: usize) -> Result<Vec<CompletedInterval>, StorageError> {
        (**self).list_recent(n)
    }
}

/// History kept in process memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistoryStore {
    records: Vec<CompletedInterval>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[CompletedInterval] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionHistoryStore for InMemoryHistoryStore {
    fn append(&mut self, record: &CompletedInterval) -> Result<(), StorageError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn list_recent(&self, n: usize) -> Result<Vec<CompletedInterval>, StorageError> {
        Ok(self.records.iter().rev().take(n).cloned().collect())
    }
}

/// SQLite-backed history.
///
/// Rows are ordered by their autoincrement id, which follows append order,
/// so two completions inside the same wall-clock second still list in the
/// order they happened.
pub struct SqliteHistoryStore {
    conn: Connection,
}

impl SqliteHistoryStore {
    /// Open the store at `~/.config/linguapace/linguapace.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("linguapace.db"))
    }

    /// Open (or create) the store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS intervals (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                seq          INTEGER NOT NULL,
                phase        TEXT NOT NULL,
                duration_min INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_intervals_completed_at ON intervals(completed_at);
            CREATE INDEX IF NOT EXISTS idx_intervals_phase_completed_at ON intervals(phase, completed_at);",
        )?;
        Ok(())
    }

    /// Number of intervals of `phase` completed at or after `since`.
    pub fn count_since(
        &self,
        phase: IntervalPhase,
        since: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM intervals WHERE phase = ?1 AND completed_at >= ?2",
            params![phase.as_str(), since.to_rfc3339()],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    /// Focus intervals completed since UTC midnight.
    pub fn focus_completed_today(&self) -> Result<u32, StorageError> {
        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);
        self.count_since(IntervalPhase::Focus, midnight)
    }
}

impl SessionHistoryStore for SqliteHistoryStore {
    fn append(&mut self, record: &CompletedInterval) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO intervals (seq, phase, duration_min, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.seq,
                record.phase.as_str(),
                record.duration_minutes,
                record.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_recent(&self, n: usize) -> Result<Vec<CompletedInterval>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, phase, duration_min, completed_at
             FROM intervals
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![n as i64], |row| {
            Ok((
                row.get::<_, u64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (seq, phase, duration_minutes, completed_at) = row?;
            let phase = IntervalPhase::parse(&phase)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown phase '{phase}'")))?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?
                .with_timezone(&Utc);
            records.push(CompletedInterval {
                seq,
                phase,
                duration_minutes,
                completed_at,
                completed: true,
            });
        }
        Ok(records)
    }
}
