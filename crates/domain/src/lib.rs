//! # ReminderFlow Domain
//!
//! Pure domain types and the error taxonomy shared by every other crate.
//!
//! No I/O lives here: connections, tasks and external events are plain
//! values, and the sync eligibility rules are methods on those values so
//! they can be tested without a database or network.

pub mod errors;
pub mod types;

pub use errors::{GatewayError, GatewayResult, ReminderFlowError, Result};
pub use types::connection::{
    CalendarConnection, CalendarProvider, ConnectionStatus, ConnectionUpsert, Credentials,
    RefreshedToken,
};
pub use types::event::{EventMetadata, EventPayload, ExternalEvent, SYSTEM_SOURCE_TAG};
pub use types::task::{ImportedTask, NewTask, Task, TaskPriority, TaskSource, TaskStatus};
