//! SQLite-backed persistence.

mod connection_repository;
mod pool;
mod task_repository;

pub use connection_repository::SqliteConnectionStore;
pub use pool::SqlitePool;
pub use task_repository::SqliteTaskStore;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reminderflow_domain::{ReminderFlowError, Result};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M";

pub(crate) fn datetime_from_ts(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ReminderFlowError::Database(format!("timestamp out of range: {secs}")))
}

pub(crate) fn optional_datetime_from_ts(secs: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    secs.map(datetime_from_ts).transpose()
}

pub(crate) fn date_from_text(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| ReminderFlowError::Database(format!("invalid stored date '{text}': {e}")))
}

pub(crate) fn time_from_text(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .map_err(|e| ReminderFlowError::Database(format!("invalid stored time '{text}': {e}")))
}
