//! Due-task reminder service
//!
//! Invoked by the scheduler every minute: finds uncompleted tasks that are
//! due and have not had their reminder sent, delivers a reminder through
//! the notifier port, and marks them so the reminder fires exactly once.

use std::sync::Arc;

use chrono::Utc;
use reminderflow_domain::Result;
use tracing::{debug, error, instrument};

use crate::ports::{Notifier, TaskStore};

pub struct ReminderService {
    tasks: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReminderService {
    pub fn new(tasks: Arc<dyn TaskStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { tasks, notifier }
    }

    /// One reminder pass. Returns the number of reminders sent; delivery
    /// failures are isolated per task and retried on the next pass because
    /// the task stays unmarked.
    #[instrument(skip(self))]
    pub async fn send_due_reminders(&self) -> Result<usize> {
        let now = Utc::now();
        let due = self.tasks.find_due_tasks(now).await?;

        let mut sent = 0;

        for task in due {
            match self.notifier.send_reminder(&task.creator, &task).await {
                Ok(()) => {
                    self.tasks.mark_reminder_sent(&task.id).await?;
                    sent += 1;
                }
                Err(err) => {
                    error!(task_id = %task.id, error = %err, "failed to deliver reminder");
                }
            }
        }

        debug!(sent, "reminder pass completed");
        Ok(sent)
    }
}
