//! Provider gateway registry.

use std::sync::Arc;

use reminderflow_core::ports::{CalendarGateway, GatewayRegistry};
use reminderflow_domain::{CalendarProvider, ReminderFlowError, Result};

/// Resolves the gateway for a provider. Only Google is wired up; other
/// providers parse from storage but have no functional gateway.
pub struct ProviderRegistry {
    google: Arc<dyn CalendarGateway>,
}

impl ProviderRegistry {
    pub fn new(google: Arc<dyn CalendarGateway>) -> Self {
        Self { google }
    }
}

impl GatewayRegistry for ProviderRegistry {
    fn gateway_for(&self, provider: CalendarProvider) -> Result<Arc<dyn CalendarGateway>> {
        match provider {
            CalendarProvider::Google => Ok(self.google.clone()),
            other => {
                Err(ReminderFlowError::InvalidInput(format!("no gateway for provider {other}")))
            }
        }
    }
}
