use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Graph '{0}' has no start task")]
    MissingStartTask(String),

    #[error("Graph '{graph_id}' exceeded its limit of {limit} steps")]
    StepLimitExceeded { graph_id: String, limit: usize },
}

pub type Result<T> = std::result::Result<T, GraphError>;
