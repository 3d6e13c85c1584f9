//! Conversions from driver and transport errors into the domain taxonomy.
//!
//! Orphan rules stop `reminderflow-domain` from implementing `From` for
//! foreign error types, so the infra crate owns a newtype that carries the
//! mapped error across the boundary.

use reminderflow_domain::ReminderFlowError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

#[derive(Debug)]
pub struct InfraError(pub ReminderFlowError);

impl From<InfraError> for ReminderFlowError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ReminderFlowError> for InfraError {
    fn from(value: ReminderFlowError) -> Self {
        InfraError(value)
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(map_sql_error(value))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(ReminderFlowError::Database(format!("connection pool error: {value}")))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(map_http_error(value))
    }
}

/// Busy and locked states are surfaced distinctly because they are the
/// retryable SQLite failures; constraint hits name the constraint class so
/// repository callers can tell duplicates from broken references.
fn map_sql_error(err: SqlError) -> ReminderFlowError {
    use rusqlite::ffi::ErrorCode;

    match err {
        SqlError::SqliteFailure(inner, message) => match (inner.code, inner.extended_code) {
            (ErrorCode::DatabaseBusy, _) => ReminderFlowError::Database("database is busy".into()),
            (ErrorCode::DatabaseLocked, _) => {
                ReminderFlowError::Database("database is locked".into())
            }
            (ErrorCode::ConstraintViolation, 2067) => {
                ReminderFlowError::Database("unique constraint violation".into())
            }
            (ErrorCode::ConstraintViolation, 787) => {
                ReminderFlowError::Database("foreign key constraint violation".into())
            }
            _ => ReminderFlowError::Database(format!(
                "sqlite failure {:?} (code {}): {}",
                inner.code,
                inner.extended_code,
                message.unwrap_or_default()
            )),
        },
        SqlError::QueryReturnedNoRows => {
            ReminderFlowError::NotFound("no rows returned by query".into())
        }
        other => ReminderFlowError::Database(other.to_string()),
    }
}

/// Status-code mapping mirrors the gateway taxonomy: auth statuses become
/// `Auth`, 404 becomes `NotFound`, 429 and server errors are treated as
/// transient network failures, and the remaining 4xx are caller bugs.
fn map_http_error(err: HttpError) -> ReminderFlowError {
    if err.is_timeout() {
        return ReminderFlowError::Network("HTTP request timed out".into());
    }
    if err.is_connect() {
        return ReminderFlowError::Network("HTTP connection failure".into());
    }

    match err.status() {
        Some(status) => {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            match code {
                401 | 403 => ReminderFlowError::Auth(message),
                404 => ReminderFlowError::NotFound(message),
                429 | 500..=599 => ReminderFlowError::Network(message),
                400..=499 => ReminderFlowError::InvalidInput(message),
                _ => ReminderFlowError::Network(message),
            }
        }
        None => ReminderFlowError::Network(err.to_string()),
    }
}
