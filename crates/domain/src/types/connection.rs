//! Calendar connection types
//!
//! One connection per `(user, provider)` pair links a ReminderFlow account
//! to an external calendar. Tokens live on the connection row; a
//! request-scoped [`Credentials`] value is derived from it and passed
//! explicitly into every gateway call, so no shared client state is ever
//! mutated across users.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ReminderFlowError;

/// Supported external calendar providers.
///
/// Only `google` has a functional gateway; the other variants parse so a
/// stored connection row never fails to load, but the gateway factory
/// rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarProvider {
    Google,
    Outlook,
    Apple,
}

impl CalendarProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Outlook => "outlook",
            Self::Apple => "apple",
        }
    }
}

impl std::str::FromStr for CalendarProvider {
    type Err = ReminderFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "outlook" => Ok(Self::Outlook),
            "apple" => Ok(Self::Apple),
            other => Err(ReminderFlowError::InvalidInput(format!(
                "unknown calendar provider: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for CalendarProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's connection to one external calendar provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarConnection {
    pub user_id: String,
    pub provider: CalendarProvider,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Instant after which `access_token` must be refreshed before use.
    pub expires_at: Option<DateTime<Utc>>,
    pub sync_enabled: bool,
    /// Minimum interval between automatic sync runs.
    pub sync_frequency_minutes: u32,
    /// Last sync attempt, successful or not. Throttles the scheduler.
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarConnection {
    /// True when the access token expires within `safety_window` of `now`
    /// (or has no recorded expiry at all is treated as not expiring).
    pub fn expires_within(&self, now: DateTime<Utc>, safety_window: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + safety_window,
            None => false,
        }
    }

    /// Request-scoped credential context for gateway calls.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// Fields written on connect. Connect has upsert semantics: at most one
/// connection exists per `(user, provider)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionUpsert {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub sync_enabled: bool,
    pub sync_frequency_minutes: u32,
}

/// Short-lived credential context passed into each gateway call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Result of exchanging a refresh token for a new access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Connection state surfaced to the web layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub provider: CalendarProvider,
    pub connected: bool,
    pub sync_enabled: bool,
    pub sync_frequency_minutes: u32,
    pub last_sync_at: Option<DateTime<Utc>>,
}
