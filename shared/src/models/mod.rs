//! Data models
//!
//! Row types returned by list endpoints.

pub mod export_task;

// Re-exports
pub use export_task::*;
