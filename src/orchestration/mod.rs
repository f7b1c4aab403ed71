//! Orchestration layer for a tirunner run.
//!
//! The executor runs one task, the dispatcher fans tasks out over a bounded
//! worker pool, and the coordinator drives a whole run end to end.

pub mod coordinator;
pub mod executor;
mod pool;

pub use coordinator::{resolve_concurrency, Coordinator, RunArgs};
pub use executor::execute;
pub use pool::{Connections, Dispatcher, OutcomeStream, DEFAULT_MAX_CONCURRENCY};
