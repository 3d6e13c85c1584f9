//! ReminderFlow synchronization service.
//!
//! Headless entry point: loads configuration, opens the database, wires
//! the sync engine and services, and runs the background scheduler until
//! a shutdown signal arrives.

use std::path::Path;
use std::sync::Arc;

use reminderflow_core::ports::{ConnectionStore, TaskStore};
use reminderflow_core::{ReminderService, SyncEngine, SyncEngineConfig};
use reminderflow_infra::{
    config, GoogleCalendarGateway, GoogleOAuthConfig, LogNotifier, ProviderRegistry,
    SqliteConnectionStore, SqlitePool, SqliteTaskStore, SyncScheduler, SyncSchedulerConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::load()?;
    info!(db_path = %config.database.path, "configuration loaded");

    let pool =
        Arc::new(SqlitePool::open(Path::new(&config.database.path), config.database.pool_size)?);
    pool.run_migrations()?;

    let connections: Arc<dyn ConnectionStore> = Arc::new(SqliteConnectionStore::new(pool.clone()));
    let tasks: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(pool.clone()));

    let gateway = Arc::new(GoogleCalendarGateway::new(GoogleOAuthConfig {
        client_id: config.google.client_id.clone(),
        client_secret: config.google.client_secret.clone(),
    })?);
    let registry = Arc::new(ProviderRegistry::new(gateway));

    let engine = Arc::new(SyncEngine::new(
        connections.clone(),
        tasks.clone(),
        registry,
        SyncEngineConfig::default(),
    ));
    let reminders = Arc::new(ReminderService::new(tasks.clone(), Arc::new(LogNotifier)));

    let mut scheduler = SyncScheduler::with_config(
        SyncSchedulerConfig {
            sync_cron: config.schedule.sync_cron.clone(),
            refresh_cron: config.schedule.refresh_cron.clone(),
            reminder_cron: config.schedule.reminder_cron.clone(),
            ..Default::default()
        },
        engine,
        reminders,
        connections,
    );
    scheduler.start().await?;

    info!("reminderflow service running");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    scheduler.stop().await?;
    Ok(())
}
