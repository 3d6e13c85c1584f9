//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for ReminderFlow
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ReminderFlowError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ReminderFlow operations
pub type Result<T> = std::result::Result<T, ReminderFlowError>;

/// Failure taxonomy for external calendar provider calls.
///
/// Transient failures are recorded per task/event and retried on the next
/// scheduled tick; an expired credential is the only condition escalated to
/// a persisted connection-state change.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum GatewayError {
    /// Network failure, rate limit, timeout, or provider 5xx.
    #[error("transient gateway error: {0}")]
    Transient(String),

    /// Access token rejected and not refreshable without user action.
    #[error("credentials expired: {0}")]
    AuthExpired(String),

    /// Referenced remote resource (event id) does not exist.
    #[error("remote resource not found: {0}")]
    NotFound(String),
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

impl From<GatewayError> for ReminderFlowError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Transient(msg) => ReminderFlowError::Network(msg),
            GatewayError::AuthExpired(msg) => ReminderFlowError::Auth(msg),
            GatewayError::NotFound(msg) => ReminderFlowError::NotFound(msg),
        }
    }
}
