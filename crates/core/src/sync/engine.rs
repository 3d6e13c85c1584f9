//! Calendar sync engine
//!
//! Stateless reconciliation of one user's local tasks against their
//! external calendar, in both directions. The engine holds no persistent
//! state of its own: every run reads the connection and task stores, calls
//! the gateway, and writes bookkeeping back.
//!
//! Ordering rules:
//! - within one run, pull completes before push, so freshly imported
//!   events are not immediately re-pushed as if they were new local tasks;
//! - at most one run per user is in flight at a time (see [`SyncGuard`]).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use reminderflow_domain::{
    CalendarConnection, CalendarProvider, EventPayload, GatewayError, GatewayResult, ImportedTask,
    ReminderFlowError, Result, TaskSource,
};
use tracing::{debug, error, info, instrument, warn};

use crate::ports::{ConnectionStore, GatewayRegistry, TaskStore};
use crate::sync::guard::SyncGuard;

/// Tuning knobs for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// Lower bound of the pull window, measured back from now.
    pub pull_lookback: Duration,
    /// Upper bound of the pull window, measured forward from now.
    pub pull_lookahead: Duration,
    /// Lead time before credential expiry within which a refresh is
    /// proactively attempted.
    pub refresh_safety_window: Duration,
    /// Bound on any single gateway call; expiry counts as a transient
    /// failure for that task or event, not for the batch.
    pub gateway_timeout: StdDuration,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            pull_lookback: Duration::hours(24),
            pull_lookahead: Duration::days(7),
            refresh_safety_window: Duration::hours(24),
            gateway_timeout: StdDuration::from_secs(30),
        }
    }
}

/// Result of one push batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// Tasks successfully created or updated remotely.
    pub pushed: usize,
    /// Tasks whose gateway call failed; the error is recorded on the task.
    pub failed: usize,
}

/// Result of one pull batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullOutcome {
    /// New local tasks created from foreign events.
    pub imported: usize,
    /// Events skipped: system-tagged, or already imported earlier.
    pub skipped: usize,
}

/// Result of one full reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed { pull: PullOutcome, push: PushOutcome },
    /// No enabled connection for the user; a silent no-op, not an error.
    SkippedNoConnection,
    /// A run for this user is already in flight.
    SkippedInFlight,
}

/// Stateless per-user reconciliation engine.
pub struct SyncEngine {
    connections: Arc<dyn ConnectionStore>,
    tasks: Arc<dyn TaskStore>,
    gateways: Arc<dyn GatewayRegistry>,
    guard: Arc<SyncGuard>,
    config: SyncEngineConfig,
}

impl SyncEngine {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        tasks: Arc<dyn TaskStore>,
        gateways: Arc<dyn GatewayRegistry>,
        config: SyncEngineConfig,
    ) -> Self {
        Self { connections, tasks, gateways, guard: Arc::new(SyncGuard::new()), config }
    }

    /// Full reconciliation for one user: pull, then push, then stamp the
    /// connection's last-sync instant.
    #[instrument(skip(self))]
    pub async fn sync_all(&self, user_id: &str) -> Result<SyncOutcome> {
        let Some(_permit) = self.guard.try_acquire(user_id) else {
            warn!(user_id, "sync already in flight for user, skipping");
            return Ok(SyncOutcome::SkippedInFlight);
        };

        let Some(connection) = self.usable_connection(user_id).await? else {
            return Ok(SyncOutcome::SkippedNoConnection);
        };

        let pull = self.pull_with(&connection).await?;
        let push = self.push_with(&connection).await?;

        self.connections.touch_last_sync(user_id, connection.provider, Utc::now()).await?;

        info!(
            user_id,
            imported = pull.imported,
            pushed = push.pushed,
            push_failures = push.failed,
            "sync completed"
        );

        Ok(SyncOutcome::Completed { pull, push })
    }

    /// Push eligible local tasks to the external calendar.
    ///
    /// Without an enabled connection this is a no-op, not an error.
    #[instrument(skip(self))]
    pub async fn push_tasks(&self, user_id: &str) -> Result<Option<PushOutcome>> {
        let Some(connection) = self.usable_connection(user_id).await? else {
            return Ok(None);
        };
        Ok(Some(self.push_with(&connection).await?))
    }

    /// Import foreign events from the external calendar as local tasks.
    #[instrument(skip(self))]
    pub async fn pull_events(&self, user_id: &str) -> Result<Option<PullOutcome>> {
        let Some(connection) = self.usable_connection(user_id).await? else {
            return Ok(None);
        };
        Ok(Some(self.pull_with(&connection).await?))
    }

    /// Refresh the access token when it expires inside the safety window.
    ///
    /// Returns the connection to keep using, or `None` when the connection
    /// was disabled because its credentials are beyond recovery. Disabling
    /// is deliberate: retrying a dead token every tick is user-hostile
    /// noise, and re-authentication is the only fix.
    #[instrument(skip(self, connection), fields(user_id = %connection.user_id))]
    pub async fn refresh_credentials_if_needed(
        &self,
        mut connection: CalendarConnection,
    ) -> Result<Option<CalendarConnection>> {
        let now = Utc::now();
        if !connection.expires_within(now, self.config.refresh_safety_window) {
            return Ok(Some(connection));
        }

        let Some(refresh_token) = connection.refresh_token.clone() else {
            // No refresh token: the current access token stays usable until
            // it actually expires, at which point the connection is dead.
            if connection.expires_at.is_some_and(|at| at <= now) {
                warn!(user_id = %connection.user_id, "access token expired with no refresh token, disabling sync");
                self.disable_connection(&connection).await?;
                return Ok(None);
            }
            return Ok(Some(connection));
        };

        let gateway = self.gateways.gateway_for(connection.provider)?;
        let refreshed = self
            .bounded(gateway.refresh_token(&refresh_token))
            .await;

        match refreshed {
            Ok(token) => {
                self.connections
                    .update_tokens(
                        &connection.user_id,
                        connection.provider,
                        &token.access_token,
                        token.expires_at,
                    )
                    .await?;
                debug!(user_id = %connection.user_id, "access token refreshed");
                connection.access_token = token.access_token;
                connection.expires_at = Some(token.expires_at);
                Ok(Some(connection))
            }
            Err(err) => {
                warn!(user_id = %connection.user_id, error = %err, "token refresh failed, disabling sync");
                self.disable_connection(&connection).await?;
                Ok(None)
            }
        }
    }

    /// Scheduler-driven pass: refresh every enabled connection whose
    /// credentials expire inside the safety window. Returns the number of
    /// connections refreshed; failures disable the affected connection and
    /// never abort the pass.
    #[instrument(skip(self))]
    pub async fn refresh_expiring_credentials(&self) -> Result<usize> {
        let now = Utc::now();
        let mut refreshed = 0;

        for connection in self.connections.list_enabled_connections().await? {
            if !connection.expires_within(now, self.config.refresh_safety_window) {
                continue;
            }
            let user_id = connection.user_id.clone();
            match self.refresh_credentials_if_needed(connection).await {
                Ok(Some(_)) => refreshed += 1,
                Ok(None) => {}
                Err(err) => {
                    error!(user_id, error = %err, "credential refresh pass failed for user");
                }
            }
        }

        Ok(refreshed)
    }

    /// Load the user's enabled connection and make sure its credentials
    /// are fresh enough to use.
    async fn usable_connection(&self, user_id: &str) -> Result<Option<CalendarConnection>> {
        let connection =
            self.connections.find_connection(user_id, CalendarProvider::Google).await?;

        let Some(connection) = connection else {
            debug!(user_id, "no calendar connection for user");
            return Ok(None);
        };

        if !connection.sync_enabled {
            debug!(user_id, "sync disabled for user");
            return Ok(None);
        }

        self.refresh_credentials_if_needed(connection).await
    }

    async fn push_with(&self, connection: &CalendarConnection) -> Result<PushOutcome> {
        let gateway = self.gateways.gateway_for(connection.provider)?;
        let credentials = connection.credentials();
        let tasks = self.tasks.find_syncable_tasks(&connection.user_id).await?;

        let mut outcome = PushOutcome::default();

        for task in tasks {
            if !task.needs_sync() {
                continue;
            }
            let Some(payload) = EventPayload::for_task(&task) else {
                continue;
            };

            let result = match task.calendar_event_id.as_deref() {
                // Already correlated: always routed to update, never create.
                Some(event_id) => self
                    .bounded(gateway.update_event(&credentials, event_id, &payload))
                    .await
                    .map(|()| None),
                None => self
                    .bounded(gateway.create_event(&credentials, &payload))
                    .await
                    .map(Some),
            };

            match result {
                Ok(created_id) => {
                    self.tasks
                        .mark_task_synced(&task.id, created_id.as_deref(), Utc::now())
                        .await?;
                    outcome.pushed += 1;
                }
                Err(err) => {
                    // A single task failure never aborts the batch.
                    error!(task_id = %task.id, error = %err, "failed to push task");
                    self.tasks.record_sync_error(&task.id, &err.to_string()).await?;
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn pull_with(&self, connection: &CalendarConnection) -> Result<PullOutcome> {
        let gateway = self.gateways.gateway_for(connection.provider)?;
        let credentials = connection.credentials();

        let now = Utc::now();
        let time_min = now - self.config.pull_lookback;
        let time_max = now + self.config.pull_lookahead;

        let events = self
            .bounded(gateway.list_events(&credentials, time_min, time_max))
            .await
            .map_err(ReminderFlowError::from)?;

        let mut outcome = PullOutcome::default();

        for event in events {
            if event.is_system_tagged() {
                // Our own pushed event, not a foreign event to import.
                outcome.skipped += 1;
                continue;
            }

            let imported = ImportedTask {
                title: event.title.clone().unwrap_or_else(|| "Untitled Event".to_string()),
                description: event.description.clone(),
                due_date: event.start.date_naive(),
                due_time: (!event.all_day).then(|| event.start.time()),
                creator: connection.user_id.clone(),
                calendar_event_id: event.id.clone(),
                source: TaskSource::GoogleCalendar,
                last_calendar_sync: now,
            };

            match self.tasks.import_task(imported).await {
                Ok(true) => outcome.imported += 1,
                Ok(false) => outcome.skipped += 1,
                Err(err) => {
                    // Continue processing other events.
                    error!(event_id = %event.id, error = %err, "failed to import event");
                }
            }
        }

        Ok(outcome)
    }

    async fn disable_connection(&self, connection: &CalendarConnection) -> Result<()> {
        self.connections
            .set_sync_enabled(&connection.user_id, connection.provider, false)
            .await?;
        Ok(())
    }

    /// Bound a gateway call by the configured timeout; expiry is reported
    /// as a transient failure.
    async fn bounded<T, F>(&self, fut: F) -> GatewayResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        match tokio::time::timeout(self.config.gateway_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Transient(format!(
                "gateway call timed out after {:?}",
                self.config.gateway_timeout
            ))),
        }
    }
}
