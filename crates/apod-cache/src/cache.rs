use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Row counts for the `cache stats` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: u64,
    pub oldest_cached_at: Option<i64>,
}

/// Cache manager using SQLite
///
/// Values are stored as JSON text keyed by a string (a `YYYY-MM-DD` date,
/// or `today`). The connection sits behind a mutex so one manager can be
/// shared between fetch tasks.
pub struct CacheManager {
    conn: Mutex<Connection>,
}

impl CacheManager {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                // Connection::open reports a missing directory as a vague error
                if let Err(e) = std::fs::create_dir_all(parent) {
                    debug!("Could not create cache directory {}: {}", parent.display(), e);
                }
            }
        }

        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Throwaway cache, handy for tests and `--no-cache` runs
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Initialize schema on first run
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Fetch a cached value. With `max_age` set, anything older counts as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str, max_age: Option<Duration>) -> Result<Option<T>> {
        let row: Option<(String, i64)> = self
            .conn()?
            .query_row(
                "SELECT data, cached_at FROM entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((data, cached_at)) = row else {
            return Ok(None);
        };

        if let Some(max_age) = max_age {
            let age = Utc::now().timestamp() - cached_at;
            if age < 0 || age as u64 > max_age.as_secs() {
                debug!("Cache entry {} is stale ({}s old)", key, age);
                return Ok(None);
            }
        }

        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Store (or replace) a value
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_string(value)?;
        self.conn()?.execute(
            "INSERT INTO entries (key, data, cached_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET data = excluded.data, cached_at = excluded.cached_at",
            params![key, data, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM entries WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    /// Drop everything cached before `max_age` ago; returns how many rows went
    pub fn purge_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now().timestamp() - max_age.as_secs() as i64;
        let removed = self
            .conn()?
            .execute("DELETE FROM entries WHERE cached_at < ?1", params![cutoff])?;
        Ok(removed)
    }

    pub fn clear(&self) -> Result<usize> {
        Ok(self.conn()?.execute("DELETE FROM entries", [])?)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.conn()?;
        let (entries, oldest_cached_at): (i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), MIN(cached_at) FROM entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(CacheStats {
            entries: entries as u64,
            oldest_cached_at,
        })
    }

    /// Backdate an entry - only tests need to pretend time has passed
    #[cfg(test)]
    fn backdate(&self, key: &str, seconds: i64) -> Result<()> {
        self.conn()?.execute(
            "UPDATE entries SET cached_at = cached_at - ?1 WHERE key = ?2",
            params![seconds, key],
        )?;
        Ok(())
    }
}
