//! # ReminderFlow Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for stores, gateways and notifiers
//! - The calendar sync engine (push/pull reconciliation)
//! - The calendar service (inbound operation surface)
//! - The reminder service
//!
//! ## Architecture Principles
//! - Only depends on `reminderflow-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod ports;
pub mod reminder;
pub mod sync;

pub use ports::{CalendarGateway, ConnectionStore, GatewayRegistry, Notifier, TaskStore};
pub use reminder::ReminderService;
pub use sync::engine::{PullOutcome, PushOutcome, SyncEngine, SyncEngineConfig, SyncOutcome};
pub use sync::guard::{SyncGuard, SyncPermit};
pub use sync::service::{CalendarService, ConnectRequest};
