//! Calendar connection operations
//!
//! The inbound surface consumed by the web layer and the scheduler:
//! connect, disconnect, toggle, cadence updates, status, and manual sync
//! triggers. Route shapes and session handling live outside this crate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reminderflow_domain::{
    CalendarConnection, CalendarProvider, ConnectionStatus, ConnectionUpsert, ReminderFlowError,
    Result,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::ports::ConnectionStore;
use crate::sync::engine::{PullOutcome, PushOutcome, SyncEngine, SyncOutcome};

/// Sync cadence presets offered by the settings UI.
const SYNC_FREQUENCY_PRESETS: [u32; 3] = [15, 30, 60];

/// Default cadence for a freshly connected calendar.
const DEFAULT_SYNC_FREQUENCY_MINUTES: u32 = 15;

/// Credentials submitted on connect (OAuth callback or manual entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Connection management plus manual sync triggers.
pub struct CalendarService {
    connections: Arc<dyn ConnectionStore>,
    engine: Arc<SyncEngine>,
}

impl CalendarService {
    pub fn new(connections: Arc<dyn ConnectionStore>, engine: Arc<SyncEngine>) -> Self {
        Self { connections, engine }
    }

    /// Connect (or reconnect) a user's external calendar, enabling sync
    /// and kicking off an immediate best-effort reconciliation. A failure
    /// of that first sync does not fail the connect; the scheduler retries
    /// on the next tick.
    #[instrument(skip(self, request))]
    pub async fn connect_calendar(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        request: ConnectRequest,
    ) -> Result<CalendarConnection> {
        if request.access_token.trim().is_empty() {
            return Err(ReminderFlowError::InvalidInput("access token is required".into()));
        }
        if provider != CalendarProvider::Google {
            return Err(ReminderFlowError::InvalidInput(format!(
                "provider {provider} is not supported yet"
            )));
        }

        let connection = self
            .connections
            .upsert_connection(
                user_id,
                provider,
                ConnectionUpsert {
                    access_token: request.access_token,
                    refresh_token: request.refresh_token,
                    expires_at: request.expires_at,
                    sync_enabled: true,
                    sync_frequency_minutes: DEFAULT_SYNC_FREQUENCY_MINUTES,
                },
            )
            .await?;

        info!(user_id, %provider, "calendar connected");

        if let Err(err) = self.engine.sync_all(user_id).await {
            warn!(user_id, error = %err, "initial sync after connect failed");
        }

        Ok(connection)
    }

    /// Fetch the stored connection, if any.
    pub async fn get_connection(
        &self,
        user_id: &str,
        provider: CalendarProvider,
    ) -> Result<Option<CalendarConnection>> {
        self.connections.find_connection(user_id, provider).await
    }

    /// Connection state for the settings UI. A user with no connection
    /// gets a disconnected status, not an error.
    pub async fn connection_status(
        &self,
        user_id: &str,
        provider: CalendarProvider,
    ) -> Result<ConnectionStatus> {
        let connection = self.connections.find_connection(user_id, provider).await?;

        Ok(match connection {
            Some(conn) => ConnectionStatus {
                provider,
                connected: true,
                sync_enabled: conn.sync_enabled,
                sync_frequency_minutes: conn.sync_frequency_minutes,
                last_sync_at: conn.last_sync_at,
            },
            None => ConnectionStatus {
                provider,
                connected: false,
                sync_enabled: false,
                sync_frequency_minutes: DEFAULT_SYNC_FREQUENCY_MINUTES,
                last_sync_at: None,
            },
        })
    }

    /// Enable or disable automatic sync for a connected calendar.
    #[instrument(skip(self))]
    pub async fn toggle_sync(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        enabled: bool,
    ) -> Result<()> {
        let updated = self.connections.set_sync_enabled(user_id, provider, enabled).await?;
        if !updated {
            return Err(ReminderFlowError::NotFound(format!(
                "no calendar connection for user {user_id}"
            )));
        }
        info!(user_id, %provider, enabled, "sync toggled");
        Ok(())
    }

    /// Change the automatic sync cadence; only the UI presets are valid.
    #[instrument(skip(self))]
    pub async fn update_sync_frequency(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        minutes: u32,
    ) -> Result<()> {
        if !SYNC_FREQUENCY_PRESETS.contains(&minutes) {
            return Err(ReminderFlowError::InvalidInput(format!(
                "unsupported sync frequency: {minutes} minutes"
            )));
        }
        let updated = self.connections.update_sync_frequency(user_id, provider, minutes).await?;
        if !updated {
            return Err(ReminderFlowError::NotFound(format!(
                "no calendar connection for user {user_id}"
            )));
        }
        Ok(())
    }

    /// Remove the connection entirely. Pushed events remain on the
    /// external calendar.
    #[instrument(skip(self))]
    pub async fn disconnect_calendar(
        &self,
        user_id: &str,
        provider: CalendarProvider,
    ) -> Result<()> {
        self.connections.delete_connection(user_id, provider).await?;
        info!(user_id, %provider, "calendar disconnected");
        Ok(())
    }

    /// Manually trigger a full reconciliation.
    pub async fn sync_now(&self, user_id: &str) -> Result<SyncOutcome> {
        self.engine.sync_all(user_id).await
    }

    /// Manually push local tasks to the external calendar.
    pub async fn push_now(&self, user_id: &str) -> Result<Option<PushOutcome>> {
        self.engine.push_tasks(user_id).await
    }

    /// Manually import external events as local tasks.
    pub async fn pull_now(&self, user_id: &str) -> Result<Option<PullOutcome>> {
        self.engine.pull_events(user_id).await
    }
}
