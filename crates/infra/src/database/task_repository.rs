//! SQLite-backed implementation of the TaskStore port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use reminderflow_core::ports::TaskStore;
use reminderflow_domain::{
    ImportedTask, NewTask, ReminderFlowError, Result, Task, TaskPriority, TaskSource, TaskStatus,
};
use rusqlite::{Row, ToSql};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::database::{
    date_from_text, datetime_from_ts, optional_datetime_from_ts, time_from_text, SqlitePool,
    DATE_FORMAT, TIME_FORMAT,
};
use crate::errors::InfraError;

const TASK_COLUMNS: &str = "id, title, description, due_date, due_time, status, priority,
    creator, calendar_event_id, last_calendar_sync, calendar_sync_error, source,
    reminder_sent, created_at, updated_at";

/// SQLite implementation of TaskStore.
pub struct SqliteTaskStore {
    pool: Arc<SqlitePool>,
}

impl SqliteTaskStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

fn parse_status(text: &str) -> Result<TaskStatus> {
    match text {
        "pending" => Ok(TaskStatus::Pending),
        "in_progress" => Ok(TaskStatus::InProgress),
        "completed" => Ok(TaskStatus::Completed),
        other => Err(ReminderFlowError::Database(format!("unknown task status: {other}"))),
    }
}

fn parse_priority(text: &str) -> Result<TaskPriority> {
    match text {
        "low" => Ok(TaskPriority::Low),
        "medium" => Ok(TaskPriority::Medium),
        "high" => Ok(TaskPriority::High),
        other => Err(ReminderFlowError::Database(format!("unknown task priority: {other}"))),
    }
}

fn parse_source(text: &str) -> Result<TaskSource> {
    match text {
        "manual" => Ok(TaskSource::Manual),
        "google_calendar" => Ok(TaskSource::GoogleCalendar),
        "outlook" => Ok(TaskSource::Outlook),
        other => Err(ReminderFlowError::Database(format!("unknown task source: {other}"))),
    }
}

// rusqlite row closures cannot return domain errors, so raw columns are
// read first and validated by the caller.
fn read_task(row: &Row<'_>) -> rusqlite::Result<RawTask> {
    Ok(RawTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        due_date: row.get(3)?,
        due_time: row.get(4)?,
        status: row.get(5)?,
        priority: row.get(6)?,
        creator: row.get(7)?,
        calendar_event_id: row.get(8)?,
        last_calendar_sync: row.get(9)?,
        calendar_sync_error: row.get(10)?,
        source: row.get(11)?,
        reminder_sent: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

struct RawTask {
    id: String,
    title: String,
    description: Option<String>,
    due_date: Option<String>,
    due_time: Option<String>,
    status: String,
    priority: String,
    creator: String,
    calendar_event_id: Option<String>,
    last_calendar_sync: Option<i64>,
    calendar_sync_error: Option<String>,
    source: String,
    reminder_sent: bool,
    created_at: i64,
    updated_at: i64,
}

impl RawTask {
    fn into_domain(self) -> Result<Task> {
        Ok(Task {
            status: parse_status(&self.status)?,
            priority: parse_priority(&self.priority)?,
            source: parse_source(&self.source)?,
            due_date: self.due_date.as_deref().map(date_from_text).transpose()?,
            due_time: self.due_time.as_deref().map(time_from_text).transpose()?,
            last_calendar_sync: optional_datetime_from_ts(self.last_calendar_sync)?,
            created_at: datetime_from_ts(self.created_at)?,
            updated_at: datetime_from_ts(self.updated_at)?,
            id: self.id,
            title: self.title,
            description: self.description,
            creator: self.creator,
            calendar_event_id: self.calendar_event_id,
            calendar_sync_error: self.calendar_sync_error,
            reminder_sent: self.reminder_sent,
        })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    #[instrument(skip(self))]
    async fn find_syncable_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        let conn = self.pool.get()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE creator = ?1 AND due_date IS NOT NULL
                 ORDER BY due_date ASC"
            ))
            .map_err(InfraError::from)?;

        let raw: Vec<RawTask> = stmt
            .query_map([user_id], read_task)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<_>>()
            .map_err(InfraError::from)?;

        raw.into_iter().map(RawTask::into_domain).collect()
    }

    #[instrument(skip(self))]
    async fn find_task_by_external_id(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<Option<Task>> {
        let conn = self.pool.get()?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE creator = ?1 AND calendar_event_id = ?2"
                ),
                [user_id, event_id],
                read_task,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(InfraError::from(other)),
            })?;

        row.map(RawTask::into_domain).transpose()
    }

    #[instrument(skip(self, task), fields(title = %task.title))]
    async fn create_task(&self, task: NewTask) -> Result<Task> {
        let conn = self.pool.get()?;

        let id = Uuid::now_v7().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tasks (
                id, title, description, due_date, due_time, status, priority,
                creator, source, reminder_sent, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)",
            [
                &id as &dyn ToSql,
                &task.title,
                &task.description,
                &task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
                &task.due_time.map(|t| t.format(TIME_FORMAT).to_string()),
                &task.status.as_str(),
                &task.priority.as_str(),
                &task.creator,
                &task.source.as_str(),
                &now.timestamp(),
            ]
            .as_ref(),
        )
        .map_err(InfraError::from)?;

        debug!(task_id = %id, "created task");

        Ok(Task {
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
        })
    }

    #[instrument(skip(self, task), fields(event_id = %task.calendar_event_id))]
    async fn import_task(&self, task: ImportedTask) -> Result<bool> {
        let conn = self.pool.get()?;

        let id = Uuid::now_v7().to_string();
        let now = Utc::now().timestamp();

        // Insert only when the event was never imported; a conflict means a
        // local task already tracks this event and must not be overwritten.
        let inserted = conn
            .execute(
                "INSERT INTO tasks (
                    id, title, description, due_date, due_time, status, priority,
                    creator, calendar_event_id, last_calendar_sync, source,
                    reminder_sent, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', 'medium', ?6, ?7, ?8, ?9, 0, ?10, ?10)
                ON CONFLICT(creator, calendar_event_id) DO NOTHING",
                [
                    &id as &dyn ToSql,
                    &task.title,
                    &task.description,
                    &task.due_date.format(DATE_FORMAT).to_string(),
                    &task.due_time.map(|t| t.format(TIME_FORMAT).to_string()),
                    &task.creator,
                    &task.calendar_event_id,
                    &task.last_calendar_sync.timestamp(),
                    &task.source.as_str(),
                    &now,
                ]
                .as_ref(),
            )
            .map_err(InfraError::from)?;

        Ok(inserted > 0)
    }

    #[instrument(skip(self))]
    async fn mark_task_synced(
        &self,
        task_id: &str,
        calendar_event_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.pool.get()?;

        let updated = conn
            .execute(
                "UPDATE tasks SET
                    calendar_event_id = COALESCE(?1, calendar_event_id),
                    last_calendar_sync = ?2,
                    calendar_sync_error = NULL
                 WHERE id = ?3",
                [&calendar_event_id as &dyn ToSql, &at.timestamp(), &task_id],
            )
            .map_err(InfraError::from)?;

        if updated == 0 {
            return Err(ReminderFlowError::NotFound(format!("task {task_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn record_sync_error(&self, task_id: &str, message: &str) -> Result<()> {
        let conn = self.pool.get()?;

        let updated = conn
            .execute(
                "UPDATE tasks SET calendar_sync_error = ?1 WHERE id = ?2",
                [&message as &dyn ToSql, &task_id],
            )
            .map_err(InfraError::from)?;

        if updated == 0 {
            return Err(ReminderFlowError::NotFound(format!("task {task_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let conn = self.pool.get()?;

        // Coarse SQL filter on the date; the exact due instant (date plus
        // optional time) is checked after conversion.
        let today = now.date_naive().format(DATE_FORMAT).to_string();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE reminder_sent = 0
                   AND status != 'completed'
                   AND due_date IS NOT NULL
                   AND due_date <= ?1
                 ORDER BY due_date ASC"
            ))
            .map_err(InfraError::from)?;

        let raw: Vec<RawTask> = stmt
            .query_map([&today], read_task)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<_>>()
            .map_err(InfraError::from)?;

        let mut due = Vec::new();
        for task in raw.into_iter().map(RawTask::into_domain) {
            let task = task?;
            let Some(due_date) = task.due_date else { continue };
            let due_at = due_date.and_time(task.due_time.unwrap_or(NaiveTime::MIN)).and_utc();
            if due_at <= now {
                due.push(task);
            }
        }

        Ok(due)
    }

    #[instrument(skip(self))]
    async fn mark_reminder_sent(&self, task_id: &str) -> Result<()> {
        let conn = self.pool.get()?;

        conn.execute("UPDATE tasks SET reminder_sent = 1 WHERE id = ?1", [task_id])
            .map_err(InfraError::from)?;

        Ok(())
    }
}
