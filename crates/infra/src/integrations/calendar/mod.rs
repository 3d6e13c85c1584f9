//! Calendar provider gateways.

mod google;
mod registry;

pub use google::{GoogleCalendarGateway, GoogleOAuthConfig};
pub use registry::ProviderRegistry;
