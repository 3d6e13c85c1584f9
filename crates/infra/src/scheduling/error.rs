//! Background scheduler failure modes

use reminderflow_domain::ReminderFlowError;
use thiserror::Error;

use crate::errors::InfraError;

/// Errors raised by the scheduler lifecycle and job registration.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler is not running")]
    NotRunning,

    #[error("could not create job scheduler: {0}")]
    CreationFailed(String),

    #[error("could not start scheduler: {0}")]
    StartFailed(String),

    #[error("could not stop scheduler: {0}")]
    StopFailed(String),

    /// A cron job failed to build or register, named so the log line
    /// says which of the three jobs is broken.
    #[error("could not register {job} job: {reason}")]
    JobRegistrationFailed { job: &'static str, reason: String },

    #[error("scheduler operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("scheduler monitor task failed to join: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let mapped = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                ReminderFlowError::InvalidInput(err.to_string())
            }
            _ => ReminderFlowError::Internal(err.to_string()),
        };
        InfraError(mapped)
    }
}

impl From<SchedulerError> for ReminderFlowError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
