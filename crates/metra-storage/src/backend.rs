use crate::error::{Result, StorageError};
use metra_common::retry::{RetriesExhausted, RetryPolicy};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Optional durable write-through backend.
///
/// Every accepted update is mirrored here best-effort; the in-memory
/// store stays the source of truth for the read path, so a failed
/// write-through is logged by the caller and never rolled back.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    retry: RetryPolicy,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_policy(path, RetryPolicy::default())
    }

    pub fn open_with_policy(path: &Path, retry: RetryPolicy) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS metrics (
                 kind TEXT NOT NULL,
                 name TEXT NOT NULL,
                 value REAL,
                 delta INTEGER,
                 PRIMARY KEY (kind, name)
             )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            retry,
        })
    }

    /// Mirrors a gauge update: the stored value is replaced.
    pub fn write_gauge(&self, name: &str, value: f64) -> Result<()> {
        self.with_retry(|conn| {
            conn.execute(
                "INSERT INTO metrics (kind, name, value) VALUES ('gauge', ?1, ?2)
                 ON CONFLICT (kind, name) DO UPDATE SET value = excluded.value",
                rusqlite::params![name, value],
            )
            .map(|_| ())
        })
    }

    /// Mirrors a counter update: the stored total accumulates.
    pub fn write_counter(&self, name: &str, delta: i64) -> Result<()> {
        self.with_retry(|conn| {
            conn.execute(
                "INSERT INTO metrics (kind, name, delta) VALUES ('counter', ?1, ?2)
                 ON CONFLICT (kind, name) DO UPDATE SET delta = delta + excluded.delta",
                rusqlite::params![name, delta],
            )
            .map(|_| ())
        })
    }

    /// Health probe used by the `/ping` endpoint.
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Runs `op` under the retry policy, retrying transient lock
    /// contention only; any other SQLite error aborts immediately.
    fn with_retry<T>(
        &self,
        mut op: impl FnMut(&Connection) -> std::result::Result<T, rusqlite::Error>,
    ) -> Result<T> {
        let attempts = self.retry.attempts.max(1);
        let mut last = None;

        for attempt in 1..=attempts {
            let result = {
                let conn = self.conn.lock().unwrap();
                op(&conn)
            };
            match result {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) => last = Some(err),
                Err(err) => return Err(StorageError::Sqlite(err)),
            }
            if attempt < attempts {
                std::thread::sleep(self.retry.delay_after(attempt));
            }
        }

        Err(StorageError::WriteThrough(RetriesExhausted {
            attempts,
            last: last.expect("at least one attempt was made"),
        }))
    }
}

fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}
