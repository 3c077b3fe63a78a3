//! SQLite-backed knowledge base
//!
//! Persistent store for configured failure causes and per-artifact scan
//! outcomes.
//!
//! # Schema Design
//!
//! WAL mode for concurrent reads and single-writer semantics.  All
//! timestamps are epoch milliseconds (i64).  JSON columns are stored as
//! TEXT.
//!
//! # Tables
//!
//! - `failure_causes`: configured causes with their pattern lists
//! - `scan_outcomes`: one row per scanned artifact, upserted on re-scan
//! - `schema_version`: migration tracking

use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::KnowledgeError;
use crate::knowledge::KnowledgeBase;
use crate::pattern::{FailureCause, Indication};
use crate::report::ScanOutcome;
use crate::Result;

/// Current schema version for migration tracking
pub const SCHEMA_VERSION: i32 = 1;

/// Schema initialization SQL
pub const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,  -- epoch ms
    description TEXT
);

-- Configured failure causes; patterns and categories are JSON arrays
CREATE TABLE IF NOT EXISTS failure_causes (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    categories TEXT NOT NULL DEFAULT '[]',
    patterns TEXT NOT NULL,
    created_at INTEGER NOT NULL   -- epoch ms
);

-- One outcome row per scanned artifact, keyed by its locator URL
CREATE TABLE IF NOT EXISTS scan_outcomes (
    build_url TEXT PRIMARY KEY,
    outcome TEXT NOT NULL,        -- JSON ScanOutcome
    recorded_at INTEGER NOT NULL  -- epoch ms
);
"#;

/// Knowledge base persisted in a SQLite database.
///
/// The connection sits behind a mutex: scans are read-mostly and the
/// write paths (outcome upsert/removal) are short single statements.
#[derive(Debug)]
pub struct SqliteKnowledgeBase {
    conn: Mutex<Connection>,
}

impl SqliteKnowledgeBase {
    /// Open (creating if needed) a knowledge base at `path`.
    ///
    /// # Errors
    ///
    /// Database open or schema initialization failures.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(KnowledgeError::from)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory knowledge base (tests, throwaway runs).
    ///
    /// # Errors
    ///
    /// Database open or schema initialization failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(KnowledgeError::from)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL).map_err(KnowledgeError::from)?;
        // MAX on an empty table yields one row holding NULL.
        let version: Option<i32> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get::<_, Option<i32>>(0)
            })
            .map_err(KnowledgeError::from)?;
        if version.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version, applied_at, description)
                 VALUES (?1, ?2, 'initial schema')",
                params![SCHEMA_VERSION, now_ms()],
            )
            .map_err(KnowledgeError::from)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Store a configured cause.  The cause name must be unique.
    ///
    /// # Errors
    ///
    /// Database write failures (including a duplicate name).
    pub fn add_cause(&self, cause: &FailureCause) -> Result<()> {
        let patterns: Vec<&str> = cause.indications.iter().map(Indication::as_str).collect();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO failure_causes (name, description, categories, patterns, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                cause.name,
                cause.description,
                serde_json::to_string(&cause.categories)?,
                serde_json::to_string(&patterns)?,
                now_ms(),
            ],
        )
        .map_err(KnowledgeError::from)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KnowledgeBase for SqliteKnowledgeBase {
    fn causes(&self) -> Result<Vec<FailureCause>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT name, description, categories, patterns
                 FROM failure_causes ORDER BY id",
            )
            .map_err(KnowledgeError::from)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(KnowledgeError::from)?;

        let mut causes = Vec::new();
        for row in rows {
            let (name, description, categories, patterns) = row.map_err(KnowledgeError::from)?;
            let categories: Vec<String> =
                serde_json::from_str(&categories).map_err(|err| KnowledgeError::CorruptCause {
                    name: name.clone(),
                    detail: err.to_string(),
                })?;
            let patterns: Vec<String> =
                serde_json::from_str(&patterns).map_err(|err| KnowledgeError::CorruptCause {
                    name: name.clone(),
                    detail: err.to_string(),
                })?;

            let mut cause = FailureCause::new(name.clone(), description);
            cause.categories = categories;
            for pattern in &patterns {
                let indication =
                    Indication::new(pattern).map_err(|err| KnowledgeError::CorruptCause {
                        name: name.clone(),
                        detail: err.to_string(),
                    })?;
                cause.indications.push(indication);
            }
            causes.push(cause);
        }
        Ok(causes)
    }

    fn remove_outcome(&self, build_url: &str) -> Result<()> {
        self.lock()
            .execute(
                "DELETE FROM scan_outcomes WHERE build_url = ?1",
                params![build_url],
            )
            .map_err(KnowledgeError::from)?;
        Ok(())
    }

    fn record_outcome(&self, build_url: &str, outcome: &ScanOutcome) -> Result<()> {
        let json = serde_json::to_string(outcome)?;
        self.lock()
            .execute(
                "INSERT INTO scan_outcomes (build_url, outcome, recorded_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(build_url) DO UPDATE SET
                     outcome = excluded.outcome,
                     recorded_at = excluded.recorded_at",
                params![build_url, json, now_ms()],
            )
            .map_err(KnowledgeError::from)?;
        Ok(())
    }
}

impl SqliteKnowledgeBase {
    /// The stored outcome for `build_url`, if any.
    ///
    /// # Errors
    ///
    /// Database read or JSON decode failures.
    pub fn outcome(&self, build_url: &str) -> Result<Option<ScanOutcome>> {
        let json: Option<String> = self
            .lock()
            .query_row(
                "SELECT outcome FROM scan_outcomes WHERE build_url = ?1",
                params![build_url],
                |row| row.get(0),
            )
            .optional()
            .map_err(KnowledgeError::from)?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
