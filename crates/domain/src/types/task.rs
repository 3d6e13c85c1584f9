//! Task types and sync eligibility rules

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Where a task originated. Tasks imported from an external calendar are
/// never pushed back to it (loop prevention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Manual,
    GoogleCalendar,
    Outlook,
}

impl TaskSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::GoogleCalendar => "google_calendar",
            Self::Outlook => "outlook",
        }
    }
}

/// A task with the fields the sync engine and reminder worker care about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// A task without a due date is never eligible for calendar sync.
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub creator: String,
    /// Correlation id of the external event pushed for this task.
    /// Absence means "never pushed".
    pub calendar_event_id: Option<String>,
    /// Instant of the last successful push for this task.
    pub last_calendar_sync: Option<DateTime<Utc>>,
    /// Last push error, cleared on the next success.
    pub calendar_sync_error: Option<String>,
    pub source: TaskSource,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Push eligibility: a due date is set and the task was edited since its
    /// last successful push (or was never pushed).
    ///
    /// Imported tasks are stamped with `last_calendar_sync` at creation, so
    /// a fresh import fails this test until the user edits it locally.
    pub fn needs_sync(&self) -> bool {
        if self.due_date.is_none() {
            return false;
        }
        match self.last_calendar_sync {
            None => true,
            Some(synced_at) => self.updated_at > synced_at,
        }
    }
}

/// Fields for creating a task locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub creator: String,
    pub source: TaskSource,
}

/// Fields for importing a task from an external calendar event.
///
/// Imports are keyed on `(creator, calendar_event_id)` with
/// insert-only-if-absent semantics: repeat pulls of the same event never
/// overwrite local edits to a previously imported task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub due_time: Option<NaiveTime>,
    pub creator: String,
    pub calendar_event_id: String,
    pub source: TaskSource,
    /// Stamped at import time so the import is not immediately re-pushed.
    pub last_calendar_sync: DateTime<Utc>,
}
