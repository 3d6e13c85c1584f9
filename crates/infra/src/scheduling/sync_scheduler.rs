//! Background job scheduler for calendar sync, token refresh, and reminders.
//!
//! Three cron jobs share one scheduler instance:
//! - a per-minute sync pass that fans out over enabled connections, where
//!   each connection's own cadence decides whether it actually runs;
//! - an hourly token refresh pass for credentials entering the expiry
//!   safety window;
//! - a per-minute reminder pass for due tasks.
//!
//! Join handles are tracked, cancellation is explicit, and every job body
//! is wrapped in a timeout. User ids never reach the logs unhashed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reminderflow_core::ports::ConnectionStore;
use reminderflow_core::{ReminderService, SyncEngine, SyncOutcome};
use reminderflow_domain::CalendarConnection;
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the background scheduler.
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Cron expression for the sync fan-out pass.
    pub sync_cron: String,
    /// Cron expression for the credential refresh pass.
    pub refresh_cron: String,
    /// Cron expression for the reminder pass.
    pub reminder_cron: String,
    /// Timeout applied to a single job execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            sync_cron: "0 * * * * *".into(),     // every minute
            refresh_cron: "0 0 * * * *".into(),  // hourly
            reminder_cron: "0 * * * * *".into(), // every minute
            job_timeout: Duration::from_secs(300),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Background scheduler with explicit lifecycle management.
pub struct SyncScheduler {
    scheduler: Option<JobScheduler>,
    config: SyncSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    engine: Arc<SyncEngine>,
    reminders: Arc<ReminderService>,
    connections: Arc<dyn ConnectionStore>,
}

impl SyncScheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        reminders: Arc<ReminderService>,
        connections: Arc<dyn ConnectionStore>,
    ) -> Self {
        Self::with_config(SyncSchedulerConfig::default(), engine, reminders, connections)
    }

    pub fn with_config(
        config: SyncSchedulerConfig,
        engine: Arc<SyncEngine>,
        reminders: Arc<ReminderService>,
        connections: Arc<dyn ConnectionStore>,
    ) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            engine,
            reminders,
            connections,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        let start_result = tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?;

        start_result.map_err(|source| SchedulerError::StartFailed(source.to_string()))?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("scheduler monitor cancelled");
        });

        self.monitor_handle = Some(handle);
        info!("background scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let mut scheduler = match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        let stop_result =
            tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?;

        stop_result.map_err(|source| SchedulerError::StopFailed(source.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("background scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|source| SchedulerError::CreationFailed(source.to_string()))?;

        self.register_sync_job(&scheduler).await?;
        self.register_refresh_job(&scheduler).await?;
        self.register_reminder_job(&scheduler).await?;

        Ok(scheduler)
    }

    async fn register_sync_job(&self, scheduler: &JobScheduler) -> SchedulerResult<()> {
        let engine = self.engine.clone();
        let connections = self.connections.clone();
        let job_timeout = self.config.job_timeout;

        let job = Job::new_async(self.config.sync_cron.as_str(), move |_id, _lock| {
            let engine = engine.clone();
            let connections = connections.clone();

            Box::pin(async move {
                match tokio::time::timeout(job_timeout, run_sync_pass(engine, connections)).await
                {
                    Ok(Ok(())) => debug!("sync pass finished"),
                    Ok(Err(err)) => error!(error = %err, "sync pass failed"),
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "sync pass timed out")
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed {
            job: "sync",
            reason: source.to_string(),
        })?;

        let job_id = job.guid();
        scheduler
            .add(job)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed {
                job: "sync",
                reason: source.to_string(),
            })?;

        debug!(cron = %self.config.sync_cron, job_id = %job_id, "registered sync job");
        Ok(())
    }

    async fn register_refresh_job(&self, scheduler: &JobScheduler) -> SchedulerResult<()> {
        let engine = self.engine.clone();
        let job_timeout = self.config.job_timeout;

        let job = Job::new_async(self.config.refresh_cron.as_str(), move |_id, _lock| {
            let engine = engine.clone();

            Box::pin(async move {
                match tokio::time::timeout(job_timeout, engine.refresh_expiring_credentials())
                    .await
                {
                    Ok(Ok(refreshed)) => debug!(refreshed, "credential refresh pass finished"),
                    Ok(Err(err)) => error!(error = %err, "credential refresh pass failed"),
                    Err(_) => {
                        warn!(
                            timeout_secs = job_timeout.as_secs(),
                            "credential refresh pass timed out"
                        )
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed {
            job: "refresh",
            reason: source.to_string(),
        })?;

        scheduler
            .add(job)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed {
                job: "refresh",
                reason: source.to_string(),
            })?;

        debug!(cron = %self.config.refresh_cron, "registered credential refresh job");
        Ok(())
    }

    async fn register_reminder_job(&self, scheduler: &JobScheduler) -> SchedulerResult<()> {
        let reminders = self.reminders.clone();
        let job_timeout = self.config.job_timeout;

        let job = Job::new_async(self.config.reminder_cron.as_str(), move |_id, _lock| {
            let reminders = reminders.clone();

            Box::pin(async move {
                match tokio::time::timeout(job_timeout, reminders.send_due_reminders()).await {
                    Ok(Ok(sent)) => debug!(sent, "reminder pass finished"),
                    Ok(Err(err)) => error!(error = %err, "reminder pass failed"),
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "reminder pass timed out")
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed {
            job: "reminder",
            reason: source.to_string(),
        })?;

        scheduler
            .add(job)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed {
                job: "reminder",
                reason: source.to_string(),
            })?;

        debug!(cron = %self.config.reminder_cron, "registered reminder job");
        Ok(())
    }
}

/// One sync fan-out pass over every enabled connection. Each connection's
/// `sync_frequency_minutes` gates whether its user is actually synced this
/// tick; per-user failures never abort the pass.
async fn run_sync_pass(
    engine: Arc<SyncEngine>,
    connections: Arc<dyn ConnectionStore>,
) -> Result<(), SyncPassError> {
    let enabled = connections
        .list_enabled_connections()
        .await
        .map_err(|err| SyncPassError::listing(err.to_string()))?;

    if enabled.is_empty() {
        debug!("no enabled connections to sync");
        return Ok(());
    }

    let now = Utc::now();
    let mut synced = 0;
    let mut errors = 0;

    for connection in &enabled {
        if !cadence_elapsed(connection, now) {
            continue;
        }

        let user_tag = redact_user_id(&connection.user_id);
        match engine.sync_all(&connection.user_id).await {
            Ok(SyncOutcome::Completed { pull, push }) => {
                synced += 1;
                debug!(
                    user = %user_tag,
                    imported = pull.imported,
                    pushed = push.pushed,
                    "scheduled sync completed"
                );
            }
            Ok(SyncOutcome::SkippedInFlight) => {
                debug!(user = %user_tag, "scheduled sync skipped, run already in flight");
            }
            Ok(SyncOutcome::SkippedNoConnection) => {
                debug!(user = %user_tag, "scheduled sync skipped, connection unusable");
            }
            Err(err) => {
                errors += 1;
                warn!(user = %user_tag, error = %err, "scheduled sync failed");
            }
        }
    }

    info!(total = enabled.len(), synced, errors, "sync pass completed");

    if errors > 0 {
        return Err(SyncPassError::failures(errors, enabled.len()));
    }
    Ok(())
}

/// True when the connection's cadence interval has elapsed since its last
/// sync. A connection that never synced is always due.
fn cadence_elapsed(connection: &CalendarConnection, now: DateTime<Utc>) -> bool {
    match connection.last_sync_at {
        None => true,
        Some(last) => {
            now - last >= chrono::Duration::minutes(i64::from(connection.sync_frequency_minutes))
        }
    }
}

fn redact_user_id(user_id: &str) -> String {
    const USER_HASH_SALT: &[u8] = b"reminderflow-scheduler-user-salt";
    let mut hasher = Sha256::new();
    hasher.update(USER_HASH_SALT);
    hasher.update(user_id.as_bytes());
    let digest = hasher.finalize();
    let hash = hex::encode(&digest[..8]);
    format!("user_hash={hash}")
}

#[derive(Debug)]
enum SyncPassError {
    Listing(String),
    Failures { errors: usize, total: usize },
}

impl SyncPassError {
    fn listing(message: String) -> Self {
        Self::Listing(message)
    }

    fn failures(errors: usize, total: usize) -> Self {
        Self::Failures { errors, total }
    }
}

impl fmt::Display for SyncPassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing(message) => write!(f, "failed to list connections: {message}"),
            Self::Failures { errors, total } => {
                write!(f, "sync pass encountered {errors} errors across {total} connections")
            }
        }
    }
}

impl std::error::Error for SyncPassError {}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
