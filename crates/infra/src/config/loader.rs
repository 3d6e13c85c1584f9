//! Configuration loader
//!
//! Loads application configuration from environment variables, reading a
//! `.env` file first when one is present.
//!
//! ## Environment Variables
//! - `REMINDERFLOW_DB_PATH`: Database file path (default `reminderflow.db`)
//! - `REMINDERFLOW_DB_POOL_SIZE`: Connection pool size (default 5)
//! - `GOOGLE_CALENDAR_CLIENT_ID`: OAuth client id (required)
//! - `GOOGLE_CALENDAR_CLIENT_SECRET`: OAuth client secret (required)
//! - `REMINDERFLOW_SYNC_CRON`: Sync fan-out cron (default every minute)
//! - `REMINDERFLOW_REFRESH_CRON`: Token refresh cron (default hourly)
//! - `REMINDERFLOW_REMINDER_CRON`: Reminder cron (default every minute)

use reminderflow_domain::{ReminderFlowError, Result};
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub google: GoogleConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub sync_cron: String,
    pub refresh_cron: String,
    pub reminder_cron: String,
}

/// Load configuration, reading `.env` first when present.
pub fn load() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    load_from_env()
}

/// Load configuration from environment variables.
///
/// # Errors
/// Returns `ReminderFlowError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<AppConfig> {
    let db_path = env_or("REMINDERFLOW_DB_PATH", "reminderflow.db");
    let pool_size = env_or("REMINDERFLOW_DB_POOL_SIZE", "5").parse::<u32>().map_err(|e| {
        ReminderFlowError::Config(format!("invalid REMINDERFLOW_DB_POOL_SIZE: {e}"))
    })?;

    let client_id = required_env("GOOGLE_CALENDAR_CLIENT_ID")?;
    let client_secret = required_env("GOOGLE_CALENDAR_CLIENT_SECRET")?;

    Ok(AppConfig {
        database: DatabaseConfig { path: db_path, pool_size },
        google: GoogleConfig { client_id, client_secret },
        schedule: ScheduleConfig {
            sync_cron: env_or("REMINDERFLOW_SYNC_CRON", "0 * * * * *"),
            refresh_cron: env_or("REMINDERFLOW_REFRESH_CRON", "0 0 * * * *"),
            reminder_cron: env_or("REMINDERFLOW_REMINDER_CRON", "0 * * * * *"),
        },
    })
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        ReminderFlowError::Config(format!("missing required environment variable: {key}"))
    })
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
