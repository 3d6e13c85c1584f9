//! In-memory mock ports for sync engine and service tests.
//!
//! Deterministic fakes in the style of unit-test doubles: state lives in
//! mutex-wrapped collections, and the gateway records every call so tests
//! can assert on exactly which operations were issued.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reminderflow_core::ports::{
    CalendarGateway, ConnectionStore, GatewayRegistry, Notifier, TaskStore,
};
use reminderflow_domain::{
    CalendarConnection, CalendarProvider, ConnectionUpsert, Credentials, EventPayload,
    ExternalEvent, GatewayError, GatewayResult, ImportedTask, NewTask, RefreshedToken,
    ReminderFlowError, Result, Task, TaskPriority, TaskSource, TaskStatus,
};

/// In-memory `ConnectionStore`.
#[derive(Default)]
pub struct MockConnectionStore {
    connections: Mutex<HashMap<(String, CalendarProvider), CalendarConnection>>,
}

impl MockConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection(self, connection: CalendarConnection) -> Self {
        let key = (connection.user_id.clone(), connection.provider);
        self.connections.lock().unwrap().insert(key, connection);
        self
    }

    pub fn get(&self, user_id: &str, provider: CalendarProvider) -> Option<CalendarConnection> {
        self.connections.lock().unwrap().get(&(user_id.to_string(), provider)).cloned()
    }
}

#[async_trait]
impl ConnectionStore for MockConnectionStore {
    async fn find_connection(
        &self,
        user_id: &str,
        provider: CalendarProvider,
    ) -> Result<Option<CalendarConnection>> {
        Ok(self.get(user_id, provider))
    }

    async fn upsert_connection(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        fields: ConnectionUpsert,
    ) -> Result<CalendarConnection> {
        let mut connections = self.connections.lock().unwrap();
        let key = (user_id.to_string(), provider);
        let now = Utc::now();
        let created_at = connections.get(&key).map_or(now, |c| c.created_at);
        let last_sync_at = connections.get(&key).and_then(|c| c.last_sync_at);

        let connection = CalendarConnection {
            user_id: user_id.to_string(),
            provider,
            access_token: fields.access_token,
            refresh_token: fields.refresh_token,
            expires_at: fields.expires_at,
            sync_enabled: fields.sync_enabled,
            sync_frequency_minutes: fields.sync_frequency_minutes,
            last_sync_at,
            created_at,
            updated_at: now,
        };
        connections.insert(key, connection.clone());
        Ok(connection)
    }

    async fn delete_connection(&self, user_id: &str, provider: CalendarProvider) -> Result<()> {
        self.connections.lock().unwrap().remove(&(user_id.to_string(), provider));
        Ok(())
    }

    async fn list_enabled_connections(&self) -> Result<Vec<CalendarConnection>> {
        Ok(self
            .connections
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.sync_enabled)
            .cloned()
            .collect())
    }

    async fn set_sync_enabled(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        enabled: bool,
    ) -> Result<bool> {
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(&(user_id.to_string(), provider)) {
            Some(conn) => {
                conn.sync_enabled = enabled;
                conn.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_sync_frequency(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        minutes: u32,
    ) -> Result<bool> {
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(&(user_id.to_string(), provider)) {
            Some(conn) => {
                conn.sync_frequency_minutes = minutes;
                conn.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_tokens(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut connections = self.connections.lock().unwrap();
        if let Some(conn) = connections.get_mut(&(user_id.to_string(), provider)) {
            conn.access_token = access_token.to_string();
            conn.expires_at = Some(expires_at);
            conn.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn touch_last_sync(
        &self,
        user_id: &str,
        provider: CalendarProvider,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut connections = self.connections.lock().unwrap();
        if let Some(conn) = connections.get_mut(&(user_id.to_string(), provider)) {
            conn.last_sync_at = Some(at);
        }
        Ok(())
    }
}

/// In-memory `TaskStore`.
#[derive(Default)]
pub struct MockTaskStore {
    tasks: Mutex<Vec<Task>>,
    next_id: AtomicUsize,
}

impl MockTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(self, task: Task) -> Self {
        self.tasks.lock().unwrap().push(task);
        self
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.tasks.lock().unwrap().iter().find(|t| t.id == task_id).cloned()
    }

    pub fn all(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskStore for MockTaskStore {
    async fn find_syncable_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.creator == user_id && t.due_date.is_some())
            .cloned()
            .collect())
    }

    async fn find_task_by_external_id(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.creator == user_id && t.calendar_event_id.as_deref() == Some(event_id))
            .cloned())
    }

    async fn create_task(&self, task: NewTask) -> Result<Task> {
        let id = format!("task-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let created = Task {
            id,
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            due_time: task.due_time,
            status: task.status,
            priority: task.priority,
            creator: task.creator,
            calendar_event_id: None,
            last_calendar_sync: None,
            calendar_sync_error: None,
            source: task.source,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn import_task(&self, task: ImportedTask) -> Result<bool> {
        let mut tasks = self.tasks.lock().unwrap();
        let exists = tasks.iter().any(|t| {
            t.creator == task.creator
                && t.calendar_event_id.as_deref() == Some(task.calendar_event_id.as_str())
        });
        if exists {
            return Ok(false);
        }
        let id = format!("task-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        // Stamp created/updated with the import's sync instant, matching the
        // real store where a fresh import never reads as edited-after-sync.
        let now = task.last_calendar_sync;
        tasks.push(Task {
            id,
            title: task.title,
            description: task.description,
            due_date: Some(task.due_date),
            due_time: task.due_time,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            creator: task.creator,
            calendar_event_id: Some(task.calendar_event_id),
            last_calendar_sync: Some(task.last_calendar_sync),
            calendar_sync_error: None,
            source: task.source,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        });
        Ok(true)
    }

    async fn mark_task_synced(
        &self,
        task_id: &str,
        calendar_event_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ReminderFlowError::NotFound(format!("task {task_id}")))?;
        if let Some(event_id) = calendar_event_id {
            task.calendar_event_id = Some(event_id.to_string());
        }
        task.last_calendar_sync = Some(at);
        task.calendar_sync_error = None;
        Ok(())
    }

    async fn record_sync_error(&self, task_id: &str, message: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ReminderFlowError::NotFound(format!("task {task_id}")))?;
        task.calendar_sync_error = Some(message.to_string());
        Ok(())
    }

    async fn find_due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                !t.reminder_sent
                    && t.status != TaskStatus::Completed
                    && t.due_date.is_some_and(|d| d.and_hms_opt(0, 0, 0).is_some_and(|dt| dt.and_utc() <= now))
            })
            .cloned()
            .collect())
    }

    async fn mark_reminder_sent(&self, task_id: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) {
            task.reminder_sent = true;
        }
        Ok(())
    }
}

/// Scripted `CalendarGateway` that records every call.
#[derive(Default)]
pub struct MockGateway {
    /// Events returned by `list_events`.
    pub remote_events: Mutex<Vec<ExternalEvent>>,
    /// Recorded create calls with assigned event ids.
    pub created: Mutex<Vec<(String, EventPayload)>>,
    /// Recorded update calls.
    pub updated: Mutex<Vec<(String, EventPayload)>>,
    /// Payload titles whose create/update call fails transiently.
    pub fail_titles: Mutex<Vec<String>>,
    /// Scripted refresh response; `None` means succeed with defaults.
    pub refresh_error: Mutex<Option<GatewayError>>,
    pub refresh_calls: AtomicUsize,
    /// Artificial latency for `list_events`, for overlap tests.
    pub list_delay: Mutex<Option<Duration>>,
    next_event_id: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_event(self, event: ExternalEvent) -> Self {
        self.remote_events.lock().unwrap().push(event);
        self
    }

    pub fn failing_on(self, title: &str) -> Self {
        self.fail_titles.lock().unwrap().push(title.to_string());
        self
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn updated_count(&self) -> usize {
        self.updated.lock().unwrap().len()
    }

    fn check_failure(&self, payload: &EventPayload) -> GatewayResult<()> {
        if self.fail_titles.lock().unwrap().iter().any(|t| t == &payload.title) {
            return Err(GatewayError::Transient("simulated network failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarGateway for MockGateway {
    async fn create_event(
        &self,
        _credentials: &Credentials,
        payload: &EventPayload,
    ) -> GatewayResult<String> {
        self.check_failure(payload)?;
        let id = format!("evt-{}", self.next_event_id.fetch_add(1, Ordering::SeqCst));
        self.created.lock().unwrap().push((id.clone(), payload.clone()));
        Ok(id)
    }

    async fn update_event(
        &self,
        _credentials: &Credentials,
        event_id: &str,
        payload: &EventPayload,
    ) -> GatewayResult<()> {
        self.check_failure(payload)?;
        self.updated.lock().unwrap().push((event_id.to_string(), payload.clone()));
        Ok(())
    }

    async fn list_events(
        &self,
        _credentials: &Credentials,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
    ) -> GatewayResult<Vec<ExternalEvent>> {
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.remote_events.lock().unwrap().clone())
    }

    async fn refresh_token(&self, _refresh_token: &str) -> GatewayResult<RefreshedToken> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.refresh_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(RefreshedToken {
            access_token: "refreshed-token".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}

/// Registry serving the mock gateway for Google only.
pub struct MockRegistry {
    gateway: Arc<MockGateway>,
}

impl MockRegistry {
    pub fn new(gateway: Arc<MockGateway>) -> Self {
        Self { gateway }
    }
}

impl GatewayRegistry for MockRegistry {
    fn gateway_for(&self, provider: CalendarProvider) -> Result<Arc<dyn CalendarGateway>> {
        match provider {
            CalendarProvider::Google => Ok(self.gateway.clone()),
            other => Err(ReminderFlowError::InvalidInput(format!("unknown provider: {other}"))),
        }
    }
}

/// Notifier that records deliveries and can fail for chosen tasks.
#[derive(Default)]
pub struct MockNotifier {
    pub delivered: Mutex<Vec<(String, String)>>,
    pub fail_task_ids: Mutex<Vec<String>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(self, task_id: &str) -> Self {
        self.fail_task_ids.lock().unwrap().push(task_id.to_string());
        self
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_reminder(&self, user_id: &str, task: &Task) -> Result<()> {
        if self.fail_task_ids.lock().unwrap().iter().any(|id| id == &task.id) {
            return Err(ReminderFlowError::Network("simulated delivery failure".into()));
        }
        self.delivered.lock().unwrap().push((user_id.to_string(), task.id.clone()));
        Ok(())
    }
}

/// A connected, enabled Google connection with a long-lived token.
pub fn google_connection(user_id: &str) -> CalendarConnection {
    let now = Utc::now();
    CalendarConnection {
        user_id: user_id.to_string(),
        provider: CalendarProvider::Google,
        access_token: "access-token".into(),
        refresh_token: Some("refresh-token".into()),
        expires_at: Some(now + chrono::Duration::days(30)),
        sync_enabled: true,
        sync_frequency_minutes: 15,
        last_sync_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// A manual task due tomorrow at 10:00.
pub fn manual_task(id: &str, user_id: &str, title: &str) -> Task {
    let now = Utc::now();
    Task {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        due_date: Some((now + chrono::Duration::days(1)).date_naive()),
        due_time: chrono::NaiveTime::from_hms_opt(10, 0, 0),
        status: TaskStatus::Pending,
        priority: TaskPriority::Medium,
        creator: user_id.to_string(),
        calendar_event_id: None,
        last_calendar_sync: None,
        calendar_sync_error: None,
        source: TaskSource::Manual,
        reminder_sent: false,
        created_at: now,
        updated_at: now,
    }
}

/// A foreign event on the remote calendar (no system tag).
pub fn foreign_event(id: &str, title: &str) -> ExternalEvent {
    let start = Utc::now() + chrono::Duration::hours(2);
    ExternalEvent {
        id: id.to_string(),
        title: Some(title.to_string()),
        description: None,
        start,
        end: start + chrono::Duration::hours(1),
        all_day: false,
        metadata: reminderflow_domain::EventMetadata::default(),
    }
}

/// An event previously pushed by the system itself.
pub fn system_event(id: &str, task_id: &str) -> ExternalEvent {
    let start = Utc::now() + chrono::Duration::hours(2);
    ExternalEvent {
        id: id.to_string(),
        title: Some("pushed task".to_string()),
        description: None,
        start,
        end: start + chrono::Duration::hours(1),
        all_day: false,
        metadata: reminderflow_domain::EventMetadata::system_tag(task_id),
    }
}
