//! Minimal task-graph runtime.
//!
//! A [`Graph`] is a set of [`Task`]s joined by plain and conditional edges.
//! Running a graph walks it from the start task, handing every task the same
//! [`Context`], until a task returns [`NextAction::End`] or no edge matches.
//! Back-edges are allowed, which is how bounded retry loops are expressed;
//! a per-graph step ceiling guards against runaway cycles.

pub mod context;
pub mod error;
pub mod graph;
pub mod task;

// Re-export commonly used types
pub use context::Context;
pub use error::{GraphError, Result};
pub use graph::{DEFAULT_MAX_STEPS, ExecutionResult, Graph, GraphBuilder};
pub use task::{NextAction, Task, TaskResult};
