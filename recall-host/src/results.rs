//! Results storage.
//!
//! Every finished attempt is stored as a [`ResultRecord`] (`visitorId`,
//! `taskId`, `score`) stamped with an id and the time it was recorded.
//! [`SqliteResultsStore`] keeps them in a single table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS task_results (
//!     id          TEXT PRIMARY KEY,
//!     visitor_id  TEXT NOT NULL,
//!     task_id     TEXT NOT NULL,
//!     score       INTEGER NOT NULL,
//!     recorded_at TEXT NOT NULL
//! );
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use recall_core::config::ResultsConfig;
use recall_core::{ResultRecord, TaskId};
use rusqlite::{Connection, OpenFlags, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{HostError, Result};

/// A saved result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResult {
    /// Row id.
    pub id: Uuid,
    /// When it was saved.
    pub recorded_at: DateTime<Utc>,
    /// The record itself.
    #[serde(flatten)]
    pub record: ResultRecord,
}

impl StoredResult {
    fn stamp(record: &ResultRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            record: record.clone(),
        }
    }
}

/// Where finished attempts go.
pub trait ResultsStore: Send + Sync {
    /// Append a result.
    ///
    /// # Errors
    /// Backend failures.
    fn save_result(&self, record: &ResultRecord) -> Result<StoredResult>;

    /// Every result for `visitor`, oldest first.
    ///
    /// # Errors
    /// Backend failures.
    fn results_for(&self, visitor: &str) -> Result<Vec<StoredResult>>;

    /// Best score `visitor` has reached on `task`.
    ///
    /// # Errors
    /// Backend failures.
    fn best_score(&self, visitor: &str, task: &TaskId) -> Result<Option<u32>>;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local results.
#[derive(Debug, Default)]
pub struct MemoryResultsStore {
    rows: Mutex<Vec<StoredResult>>,
}

impl MemoryResultsStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultsStore for MemoryResultsStore {
    fn save_result(&self, record: &ResultRecord) -> Result<StoredResult> {
        let stored = StoredResult::stamp(record);
        self.rows.lock().push(stored.clone());
        Ok(stored)
    }

    fn results_for(&self, visitor: &str) -> Result<Vec<StoredResult>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.record.visitor_id == visitor)
            .cloned()
            .collect())
    }

    fn best_score(&self, visitor: &str, task: &TaskId) -> Result<Option<u32>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.record.visitor_id == visitor && r.record.task_id == *task)
            .map(|r| r.record.score)
            .max())
    }
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS task_results (
        id          TEXT PRIMARY KEY,
        visitor_id  TEXT NOT NULL,
        task_id     TEXT NOT NULL,
        score       INTEGER NOT NULL,
        recorded_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_task_results_visitor ON task_results (visitor_id, task_id);";

/// Results in an SQLite database.
pub struct SqliteResultsStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteResultsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteResultsStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteResultsStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns [`HostError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &ResultsConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "Results store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// An in-memory database.
    ///
    /// # Errors
    /// Returns [`HostError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Total stored results.
    ///
    /// # Errors
    /// Returns [`HostError::Database`] on SQLite failures.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM task_results", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn decode_row(
    id: &str,
    visitor_id: String,
    task_id: String,
    score: i64,
    recorded_at: &str,
) -> Result<StoredResult> {
    let id = Uuid::parse_str(id).map_err(|e| HostError::Serialization(format!("bad result id {id}: {e}")))?;
    let recorded_at = DateTime::parse_from_rfc3339(recorded_at)
        .map_err(|e| HostError::Serialization(format!("bad timestamp {recorded_at}: {e}")))?
        .with_timezone(&Utc);
    let score = u32::try_from(score).map_err(|e| HostError::Serialization(format!("bad score {score}: {e}")))?;
    Ok(StoredResult {
        id,
        recorded_at,
        record: ResultRecord {
            visitor_id,
            task_id: TaskId(task_id),
            score,
        },
    })
}

impl ResultsStore for SqliteResultsStore {
    fn save_result(&self, record: &ResultRecord) -> Result<StoredResult> {
        let start = Instant::now();
        let stored = StoredResult::stamp(record);
        self.conn.lock().execute(
            "INSERT INTO task_results (id, visitor_id, task_id, score, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                stored.id.to_string(),
                record.visitor_id,
                record.task_id.as_str(),
                i64::from(record.score),
                stored.recorded_at.to_rfc3339(),
            ],
        )?;
        debug!(
            visitor = %record.visitor_id,
            task = %record.task_id,
            score = record.score,
            elapsed_us = start.elapsed().as_micros(),
            "Saved result"
        );
        Ok(stored)
    }

    fn results_for(&self, visitor: &str) -> Result<Vec<StoredResult>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, visitor_id, task_id, score, recorded_at FROM task_results
             WHERE visitor_id = ?1 ORDER BY recorded_at, rowid",
        )?;
        let rows = stmt.query_map(params![visitor], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, visitor_id, task_id, score, recorded_at) = row?;
            results.push(decode_row(&id, visitor_id, task_id, score, &recorded_at)?);
        }
        Ok(results)
    }

    fn best_score(&self, visitor: &str, task: &TaskId) -> Result<Option<u32>> {
        let best: Option<i64> = self.conn.lock().query_row(
            "SELECT MAX(score) FROM task_results WHERE visitor_id = ?1 AND task_id = ?2",
            params![visitor, task.as_str()],
            |row| row.get(0),
        )?;
        best.map(|score| u32::try_from(score).map_err(|e| HostError::Serialization(e.to_string())))
            .transpose()
    }
}
