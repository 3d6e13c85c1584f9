//! Port interfaces for calendar synchronization
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reminderflow_domain::{
    CalendarConnection, CalendarProvider, ConnectionUpsert, Credentials, EventPayload,
    ExternalEvent, GatewayResult, ImportedTask, NewTask, RefreshedToken, Result, Task,
};

/// Trait for persisting per-user calendar connections.
///
/// Mutations are field-level and atomic: the connection row is written to
/// by both the sync engine (tokens, last-sync stamp) and user-initiated
/// actions (toggle, disconnect), and a read-modify-write cycle would race.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Look up the connection for one `(user, provider)` pair.
    async fn find_connection(
        &self,
        user_id: &str,
        provider: CalendarProvider,
    ) -> Result<Option<CalendarConnection>>;

    /// Create or replace the connection for a `(user, provider)` pair.
    async fn upsert_connection(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        fields: ConnectionUpsert,
    ) -> Result<CalendarConnection>;

    /// Remove the connection. Succeeds even when none exists.
    async fn delete_connection(&self, user_id: &str, provider: CalendarProvider) -> Result<()>;

    /// All connections with sync enabled, for scheduler fan-out.
    async fn list_enabled_connections(&self) -> Result<Vec<CalendarConnection>>;

    /// Flip the sync flag. Returns false when no connection exists.
    async fn set_sync_enabled(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        enabled: bool,
    ) -> Result<bool>;

    /// Update the sync cadence. Returns false when no connection exists.
    async fn update_sync_frequency(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        minutes: u32,
    ) -> Result<bool>;

    /// Store a refreshed access token and its expiry.
    async fn update_tokens(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Record the instant of the last sync attempt.
    async fn touch_last_sync(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Trait for persisting tasks and their sync bookkeeping fields.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks for a user that carry a due date; the engine applies the
    /// `needs_sync` eligibility test on top of this coarse filter.
    async fn find_syncable_tasks(&self, user_id: &str) -> Result<Vec<Task>>;

    /// Look up the local task correlated to an external event id.
    async fn find_task_by_external_id(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<Option<Task>>;

    /// Create a task locally.
    async fn create_task(&self, task: NewTask) -> Result<Task>;

    /// Import a task pulled from an external event, insert-only-if-absent
    /// keyed on `(creator, calendar_event_id)`. Returns true when a row was
    /// inserted, false when the event was already imported.
    async fn import_task(&self, task: ImportedTask) -> Result<bool>;

    /// Record a successful push: stamp `last_calendar_sync`, clear the
    /// error field, and store the correlation id when one was just created.
    async fn mark_task_synced(
        &self,
        task_id: &str,
        calendar_event_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Record a failed push without touching the correlation id or the
    /// last-sync stamp.
    async fn record_sync_error(&self, task_id: &str, message: &str) -> Result<()>;

    /// Uncompleted tasks due at or before `now` whose reminder has not
    /// been sent.
    async fn find_due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;

    /// Mark the reminder for a task as sent.
    async fn mark_reminder_sent(&self, task_id: &str) -> Result<()>;
}

/// Thin client abstraction over a third-party calendar API.
///
/// Credentials are passed explicitly into every call; implementations hold
/// no per-user state.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Create an event and return its provider-assigned id.
    async fn create_event(
        &self,
        credentials: &Credentials,
        payload: &EventPayload,
    ) -> GatewayResult<String>;

    /// Update an existing event in place.
    async fn update_event(
        &self,
        credentials: &Credentials,
        event_id: &str,
        payload: &EventPayload,
    ) -> GatewayResult<()>;

    /// List events within a bounded time window.
    async fn list_events(
        &self,
        credentials: &Credentials,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> GatewayResult<Vec<ExternalEvent>>;

    /// Exchange a refresh token for a new access token.
    async fn refresh_token(&self, refresh_token: &str) -> GatewayResult<RefreshedToken>;
}

/// Resolves the gateway implementation for a provider.
pub trait GatewayRegistry: Send + Sync {
    /// Returns `InvalidInput` for providers without a functional gateway.
    fn gateway_for(&self, provider: CalendarProvider) -> Result<Arc<dyn CalendarGateway>>;
}

/// Opaque outbound notification delivery (email/push/SMS behind it).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a due-task reminder to the task's creator.
    async fn send_reminder(&self, user_id: &str, task: &Task) -> Result<()>;
}
