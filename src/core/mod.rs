//! Core domain models for a tirunner run.
//!
//! Task records, their outcomes, and the loader that reads task files.

pub mod loader;
pub mod task;

pub use loader::{load_tasks, load_tasks_async, parse_tasks};
pub use task::{format_parameters, Outcome, Parameter, RunSummary, TaskRecord};
