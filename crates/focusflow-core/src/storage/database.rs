//! SQLite-based step log and state storage.
//!
//! Provides persistent storage for:
//! - Daily step counts (one row per calendar day)
//! - Key-value store for application state (orchestrator snapshot, shield status)

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, DatabaseError, Result};

/// Steps recorded for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLogEntry {
    pub day: NaiveDate,
    pub steps: u64,
    pub updated_at: DateTime<Utc>,
}

/// SQLite database for step counts and persisted state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/focusflow.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("focusflow.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS step_log (
                day        TEXT PRIMARY KEY,
                steps      INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Overwrite the step count for `day`.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub fn record_steps(&self, day: NaiveDate, steps: u64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO step_log (day, steps, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(day) DO UPDATE SET steps = excluded.steps, updated_at = excluded.updated_at",
            params![day.to_string(), to_sql_steps(steps), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Add `delta` steps to `day` and return the new total.
    pub fn add_steps(&self, day: NaiveDate, delta: u64) -> Result<u64> {
        let total = self.steps_for_day(day)?.saturating_add(delta);
        self.record_steps(day, total)?;
        Ok(total)
    }

    /// Steps recorded for `day`, 0 when nothing was logged.
    pub fn steps_for_day(&self, day: NaiveDate) -> Result<u64> {
        let steps: Option<i64> = self
            .conn
            .query_row(
                "SELECT steps FROM step_log WHERE day = ?1",
                params![day.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(steps.map(from_sql_steps).unwrap_or(0))
    }

    /// The most recent `limit` days with logged steps, newest first.
    pub fn recent_steps(&self, limit: usize) -> Result<Vec<StepLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT day, steps, updated_at FROM step_log ORDER BY day DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (day, steps, updated_at) = row?;
            let day = day.parse::<NaiveDate>().map_err(|e| DatabaseError::Corrupt {
                key: format!("step_log.{day}"),
                message: e.to_string(),
            })?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DatabaseError::Corrupt {
                    key: format!("step_log.{day}.updated_at"),
                    message: e.to_string(),
                })?;
            entries.push(StepLogEntry {
                day,
                steps: from_sql_steps(steps),
                updated_at,
            });
        }
        Ok(entries)
    }

    /// Get a value from the key-value store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the key-value store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Decode a JSON value stored under `key`.
    pub fn kv_get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv_get(key)? {
            Some(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
                CoreError::Database(DatabaseError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            }),
            None => Ok(None),
        }
    }

    pub fn kv_set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.kv_set(key, &json)
    }
}

// SQLite integers are signed.
fn to_sql_steps(steps: u64) -> i64 {
    i64::try_from(steps).unwrap_or(i64::MAX)
}

fn from_sql_steps(steps: i64) -> u64 {
    u64::try_from(steps).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    #[test]
    fn missing_day_reads_zero() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.steps_for_day(day(11)).unwrap(), 0);
    }

    #[test]
    fn record_overwrites_and_add_accumulates() {
        let db = Database::open_memory().unwrap();
        db.record_steps(day(11), 4_000).unwrap();
        db.record_steps(day(11), 6_000).unwrap();
        assert_eq!(db.steps_for_day(day(11)).unwrap(), 6_000);

        assert_eq!(db.add_steps(day(11), 1_500).unwrap(), 7_500);
        assert_eq!(db.add_steps(day(12), 200).unwrap(), 200);
        assert_eq!(db.steps_for_day(day(11)).unwrap(), 7_500);
    }

    #[test]
    fn recent_steps_newest_first() {
        let db = Database::open_memory().unwrap();
        db.record_steps(day(9), 1).unwrap();
        db.record_steps(day(11), 3).unwrap();
        db.record_steps(day(10), 2).unwrap();

        let recent = db.recent_steps(2).unwrap();
        let days: Vec<_> = recent.iter().map(|e| (e.day, e.steps)).collect();
        assert_eq!(days, vec![(day(11), 3), (day(10), 2)]);
    }

    #[test]
    fn huge_counts_saturate_instead_of_wrapping() {
        let db = Database::open_memory().unwrap();
        db.record_steps(day(11), u64::MAX).unwrap();
        assert_eq!(db.steps_for_day(day(11)).unwrap(), i64::MAX as u64);
    }

    #[test]
    fn kv_roundtrip_and_delete() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.kv_get("k").unwrap(), None);
        db.kv_set("k", "v1").unwrap();
        db.kv_set("k", "v2").unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v2"));
        db.kv_delete("k").unwrap();
        assert_eq!(db.kv_get("k").unwrap(), None);
    }

    #[test]
    fn kv_json_reports_corrupt_values() {
        let db = Database::open_memory().unwrap();
        db.kv_set_json("n", &42u32).unwrap();
        assert_eq!(db.kv_get_json::<u32>("n").unwrap(), Some(42));

        db.kv_set("n", "{not json").unwrap();
        assert!(matches!(
            db.kv_get_json::<u32>("n"),
            Err(CoreError::Database(DatabaseError::Corrupt { .. }))
        ));
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusflow.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.record_steps(day(11), 8_800).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.steps_for_day(day(11)).unwrap(), 8_800);
    }
}
