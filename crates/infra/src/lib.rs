//! ReminderFlow infrastructure adapters.
//!
//! Concrete implementations of the core ports: SQLite-backed stores, the
//! Google Calendar HTTP gateway, cron schedulers, and configuration
//! loading. Nothing in here contains sync policy; that lives in
//! `reminderflow-core`.

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;
pub mod notifications;
pub mod scheduling;

pub use config::AppConfig;
pub use database::{SqliteConnectionStore, SqlitePool, SqliteTaskStore};
pub use errors::InfraError;
pub use integrations::calendar::{GoogleCalendarGateway, GoogleOAuthConfig, ProviderRegistry};
pub use notifications::LogNotifier;
pub use scheduling::{SyncScheduler, SyncSchedulerConfig};
