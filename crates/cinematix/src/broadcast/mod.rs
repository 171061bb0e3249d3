//! Broadcasting modules for real-time event streaming.
//!
//! Any presentation layer (the CLI, a desktop shell) can subscribe.

pub mod operation_progress;

pub use operation_progress::{OperationTracker, RemasterBroadcaster, RemasterEvent};
