//! SQLite-backed implementation of the ConnectionStore port.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reminderflow_core::ports::ConnectionStore;
use reminderflow_domain::{CalendarConnection, CalendarProvider, ConnectionUpsert, Result};
use rusqlite::{Row, ToSql};
use tracing::{debug, instrument};

use crate::database::{datetime_from_ts, optional_datetime_from_ts, SqlitePool};
use crate::errors::InfraError;

const CONNECTION_COLUMNS: &str = "user_id, provider, access_token, refresh_token, expires_at,
    sync_enabled, sync_frequency_minutes, last_sync_at, created_at, updated_at";

/// SQLite implementation of ConnectionStore.
pub struct SqliteConnectionStore {
    pool: Arc<SqlitePool>,
}

impl SqliteConnectionStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

// rusqlite row closures cannot return domain errors, so raw columns are
// read first and validated by the caller.
fn read_connection(row: &Row<'_>) -> rusqlite::Result<RawConnection> {
    Ok(RawConnection {
        user_id: row.get(0)?,
        provider: row.get(1)?,
        access_token: row.get(2)?,
        refresh_token: row.get(3)?,
        expires_at: row.get(4)?,
        sync_enabled: row.get(5)?,
        sync_frequency_minutes: row.get(6)?,
        last_sync_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Raw row before timestamp and enum validation.
struct RawConnection {
    user_id: String,
    provider: String,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    sync_enabled: bool,
    sync_frequency_minutes: u32,
    last_sync_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl RawConnection {
    fn into_domain(self) -> Result<CalendarConnection> {
        Ok(CalendarConnection {
            provider: CalendarProvider::from_str(&self.provider)?,
            user_id: self.user_id,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: optional_datetime_from_ts(self.expires_at)?,
            sync_enabled: self.sync_enabled,
            sync_frequency_minutes: self.sync_frequency_minutes,
            last_sync_at: optional_datetime_from_ts(self.last_sync_at)?,
            created_at: datetime_from_ts(self.created_at)?,
            updated_at: datetime_from_ts(self.updated_at)?,
        })
    }
}

#[async_trait]
impl ConnectionStore for SqliteConnectionStore {
    #[instrument(skip(self))]
    async fn find_connection(
        &self,
        user_id: &str,
        provider: CalendarProvider,
    ) -> Result<Option<CalendarConnection>> {
        let conn = self.pool.get()?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {CONNECTION_COLUMNS} FROM calendar_connections
                     WHERE user_id = ?1 AND provider = ?2"
                ),
                [&user_id as &dyn ToSql, &provider.as_str()],
                read_connection,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(InfraError::from(other)),
            })?;

        row.map(RawConnection::into_domain).transpose()
    }

    #[instrument(skip(self, fields))]
    async fn upsert_connection(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        fields: ConnectionUpsert,
    ) -> Result<CalendarConnection> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();

        conn.execute(
            "INSERT INTO calendar_connections (
                user_id, provider, access_token, refresh_token, expires_at,
                sync_enabled, sync_frequency_minutes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT(user_id, provider) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                sync_enabled = excluded.sync_enabled,
                sync_frequency_minutes = excluded.sync_frequency_minutes,
                updated_at = excluded.updated_at",
            [
                &user_id as &dyn ToSql,
                &provider.as_str(),
                &fields.access_token,
                &fields.refresh_token,
                &fields.expires_at.map(|at| at.timestamp()),
                &fields.sync_enabled,
                &fields.sync_frequency_minutes,
                &now,
            ]
            .as_ref(),
        )
        .map_err(InfraError::from)?;

        debug!(user_id, provider = provider.as_str(), "upserted calendar connection");
        drop(conn);

        match self.find_connection(user_id, provider).await? {
            Some(connection) => Ok(connection),
            None => Err(reminderflow_domain::ReminderFlowError::Database(
                "connection disappeared after upsert".into(),
            )),
        }
    }

    #[instrument(skip(self))]
    async fn delete_connection(&self, user_id: &str, provider: CalendarProvider) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM calendar_connections WHERE user_id = ?1 AND provider = ?2",
            [&user_id as &dyn ToSql, &provider.as_str()],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_enabled_connections(&self) -> Result<Vec<CalendarConnection>> {
        let conn = self.pool.get()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CONNECTION_COLUMNS} FROM calendar_connections
                 WHERE sync_enabled = 1
                 ORDER BY user_id ASC"
            ))
            .map_err(InfraError::from)?;

        let raw: Vec<RawConnection> = stmt
            .query_map([], read_connection)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<_>>()
            .map_err(InfraError::from)?;

        raw.into_iter().map(RawConnection::into_domain).collect()
    }

    #[instrument(skip(self))]
    async fn set_sync_enabled(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        enabled: bool,
    ) -> Result<bool> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();

        let updated = conn
            .execute(
                "UPDATE calendar_connections SET sync_enabled = ?1, updated_at = ?2
                 WHERE user_id = ?3 AND provider = ?4",
                [&enabled as &dyn ToSql, &now, &user_id, &provider.as_str()],
            )
            .map_err(InfraError::from)?;

        Ok(updated > 0)
    }

    #[instrument(skip(self))]
    async fn update_sync_frequency(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        minutes: u32,
    ) -> Result<bool> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();

        let updated = conn
            .execute(
                "UPDATE calendar_connections SET sync_frequency_minutes = ?1, updated_at = ?2
                 WHERE user_id = ?3 AND provider = ?4",
                [&minutes as &dyn ToSql, &now, &user_id, &provider.as_str()],
            )
            .map_err(InfraError::from)?;

        Ok(updated > 0)
    }

    #[instrument(skip(self, access_token))]
    async fn update_tokens(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();

        conn.execute(
            "UPDATE calendar_connections
             SET access_token = ?1, expires_at = ?2, updated_at = ?3
             WHERE user_id = ?4 AND provider = ?5",
            [
                &access_token as &dyn ToSql,
                &expires_at.timestamp(),
                &now,
                &user_id,
                &provider.as_str(),
            ],
        )
        .map_err(InfraError::from)?;

        debug!(user_id, provider = provider.as_str(), "stored refreshed tokens");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn touch_last_sync(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "UPDATE calendar_connections SET last_sync_at = ?1
             WHERE user_id = ?2 AND provider = ?3",
            [&at.timestamp() as &dyn ToSql, &user_id, &provider.as_str()],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }
}
