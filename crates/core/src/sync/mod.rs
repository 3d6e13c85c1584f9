//! Calendar synchronization: engine, per-user overlap guard, and the
//! inbound operation surface.

pub mod engine;
pub mod guard;
pub mod service;
