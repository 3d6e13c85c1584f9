//! Domain type definitions

pub mod connection;
pub mod event;
pub mod task;
