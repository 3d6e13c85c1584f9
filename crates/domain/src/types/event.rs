//! External calendar event types
//!
//! [`ExternalEvent`] is ephemeral: it is returned by the gateway during a
//! pull and never persisted. [`EventPayload`] is the outbound shape built
//! from a task during a push.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::task::Task;

/// Metadata tag written into events created by ReminderFlow, so a later
/// pull can recognise its own pushed events and skip them.
pub const SYSTEM_SOURCE_TAG: &str = "ReminderFlow";

/// Fixed duration assigned to pushed events; the system does not model
/// task duration.
const EVENT_DURATION_HOURS: i64 = 1;

/// Default start time for tasks that have a due date but no due time.
const DEFAULT_DUE_TIME: (u32, u32) = (9, 0);

/// Private metadata carried on an external event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    pub source: Option<String>,
    pub task_id: Option<String>,
}

impl EventMetadata {
    /// Tag for an event created from a local task.
    pub fn system_tag(task_id: &str) -> Self {
        Self { source: Some(SYSTEM_SOURCE_TAG.to_string()), task_id: Some(task_id.to_string()) }
    }
}

/// Event returned by the gateway when listing a provider calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEvent {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub metadata: EventMetadata,
}

impl ExternalEvent {
    /// True when this event was created by a ReminderFlow push and must not
    /// be re-imported as a task (loop prevention).
    pub fn is_system_tagged(&self) -> bool {
        self.metadata.source.as_deref() == Some(SYSTEM_SOURCE_TAG)
    }
}

/// Outbound event body for create/update gateway calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub metadata: EventMetadata,
}

impl EventPayload {
    /// Build the event window for a task: start is the due date combined
    /// with the due time (09:00 when absent), end is start plus one hour.
    ///
    /// Returns `None` for tasks without a due date; those are never pushed.
    pub fn for_task(task: &Task) -> Option<Self> {
        let due_date = task.due_date?;
        let due_time = task
            .due_time
            .or_else(|| NaiveTime::from_hms_opt(DEFAULT_DUE_TIME.0, DEFAULT_DUE_TIME.1, 0))?;

        let start = due_date.and_time(due_time).and_utc();
        let end = start + Duration::hours(EVENT_DURATION_HOURS);

        Some(Self {
            title: task.title.clone(),
            description: task
                .description
                .clone()
                .unwrap_or_else(|| "No description provided".to_string()),
            start,
            end,
            metadata: EventMetadata::system_tag(&task.id),
        })
    }
}
