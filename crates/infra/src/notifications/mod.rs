//! Outbound reminder delivery.

use async_trait::async_trait;
use reminderflow_core::ports::Notifier;
use reminderflow_domain::{Result, Task};
use tracing::info;

/// Notifier that records reminders in the application log. Deployments
/// wire a real delivery channel (email, push) behind the same port.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_reminder(&self, _user_id: &str, task: &Task) -> Result<()> {
        info!(task_id = %task.id, title = %task.title, "task reminder due");
        Ok(())
    }
}
