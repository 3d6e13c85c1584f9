//! r2d2-backed SQLite connection pool with embedded schema migration.

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use reminderflow_domain::Result;
use tracing::info;

use crate::errors::InfraError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS calendar_connections (
    user_id TEXT NOT NULL,
    provider TEXT NOT NULL,
    access_token TEXT NOT NULL,
    refresh_token TEXT,
    expires_at INTEGER,
    sync_enabled INTEGER NOT NULL DEFAULT 1,
    sync_frequency_minutes INTEGER NOT NULL DEFAULT 15,
    last_sync_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, provider)
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    due_date TEXT,
    due_time TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    priority TEXT NOT NULL DEFAULT 'medium',
    creator TEXT NOT NULL,
    calendar_event_id TEXT,
    last_calendar_sync INTEGER,
    calendar_sync_error TEXT,
    source TEXT NOT NULL DEFAULT 'manual',
    reminder_sent INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (creator, calendar_event_id)
);

CREATE INDEX IF NOT EXISTS idx_tasks_creator_due ON tasks(creator, due_date);
CREATE INDEX IF NOT EXISTS idx_tasks_reminder ON tasks(reminder_sent, status, due_date);
";

/// Shared connection pool handed to every repository.
pub struct SqlitePool {
    inner: Pool<SqliteConnectionManager>,
}

impl SqlitePool {
    /// Open a file-backed database with WAL journaling.
    pub fn open(path: &Path, pool_size: u32) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        });

        let inner =
            Pool::builder().max_size(pool_size).build(manager).map_err(InfraError::from)?;

        info!(path = %path.display(), pool_size, "opened sqlite pool");
        Ok(Self { inner })
    }

    /// Check out a connection.
    pub fn get(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.inner.get().map_err(InfraError::from)?)
    }

    /// Apply the schema. Idempotent; runs on every startup.
    pub fn run_migrations(&self) -> Result<()> {
        self.get()?.execute_batch(SCHEMA).map_err(InfraError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let temp = TempDir::new().unwrap();
        let pool = SqlitePool::open(&temp.path().join("test.db"), 2).unwrap();

        pool.run_migrations().unwrap();
        pool.run_migrations().unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('tasks', 'calendar_connections')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }
}
