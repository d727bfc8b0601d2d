use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{
    context::Context,
    error::{GraphError, Result},
    task::{NextAction, Task},
};

/// Default ceiling on the number of task executions in one run.
pub const DEFAULT_MAX_STEPS: usize = 64;

/// Type alias for edge condition functions
pub type EdgeCondition = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Edge between tasks in the graph
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub condition: Option<EdgeCondition>,
}

/// An immutable graph of tasks. Built once with [`GraphBuilder`] and shared
/// behind an `Arc`; all per-run state lives in the [`Context`] passed to `run`.
pub struct Graph {
    pub id: String,
    tasks: HashMap<String, Arc<dyn Task>>,
    edges: Vec<Edge>,
    start_task_id: Option<String>,
    max_steps: usize,
}

impl Graph {
    /// Run the graph from its start task until a task ends the run or no
    /// outgoing edge matches.
    pub async fn run(&self, context: Context) -> Result<ExecutionResult> {
        let start = self
            .start_task_id
            .clone()
            .ok_or_else(|| GraphError::MissingStartTask(self.id.clone()))?;
        self.run_from(&start, context).await
    }

    /// Run the graph starting from a specific task
    pub async fn run_from(&self, task_id: &str, context: Context) -> Result<ExecutionResult> {
        let mut current = task_id.to_string();
        let mut steps = 0usize;

        loop {
            if steps >= self.max_steps {
                return Err(GraphError::StepLimitExceeded {
                    graph_id: self.id.clone(),
                    limit: self.max_steps,
                });
            }
            steps += 1;

            let task = self
                .get_task(&current)
                .ok_or_else(|| GraphError::TaskNotFound(current.clone()))?;

            debug!(graph_id = %self.id, task_id = %current, step = steps, "Executing task");
            let result = task.run(context.clone()).await?;

            match result.next_action {
                NextAction::Continue => match self.find_next_task(&current, &context) {
                    Some(next_task_id) => current = next_task_id,
                    None => {
                        return Ok(ExecutionResult {
                            response: result.response,
                            status_message: result.status_message,
                            last_task_id: current,
                            steps,
                        });
                    }
                },
                NextAction::GoTo(target_id) => {
                    if !self.tasks.contains_key(&target_id) {
                        return Err(GraphError::TaskNotFound(target_id));
                    }
                    current = target_id;
                }
                NextAction::End => {
                    return Ok(ExecutionResult {
                        response: result.response,
                        status_message: result.status_message,
                        last_task_id: current,
                        steps,
                    });
                }
            }
        }
    }

    /// Find the next task based on edges and conditions.
    ///
    /// Conditional edges leaving `current_task_id` are checked first, in the
    /// order they were added; the first plain edge is the fallback.
    pub fn find_next_task(&self, current_task_id: &str, context: &Context) -> Option<String> {
        let mut fallback = None;
        for edge in self.edges.iter().filter(|e| e.from == current_task_id) {
            match &edge.condition {
                Some(condition) => {
                    if condition(context) {
                        return Some(edge.to.clone());
                    }
                }
                None => {
                    if fallback.is_none() {
                        fallback = Some(edge.to.clone());
                    }
                }
            }
        }
        fallback
    }

    /// Get the start task ID
    pub fn start_task_id(&self) -> Option<&str> {
        self.start_task_id.as_deref()
    }

    /// Get a task by ID
    pub fn get_task(&self, task_id: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(task_id).cloned()
    }
}

/// Builder for creating graphs
pub struct GraphBuilder {
    id: String,
    tasks: HashMap<String, Arc<dyn Task>>,
    edges: Vec<Edge>,
    start_task_id: Option<String>,
    max_steps: usize,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: HashMap::new(),
            edges: Vec::new(),
            start_task_id: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Add a task. The first task added becomes the start task unless
    /// [`GraphBuilder::set_start_task`] says otherwise.
    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        let task_id = task.id().to_string();
        if self.start_task_id.is_none() {
            self.start_task_id = Some(task_id.clone());
        }
        self.tasks.insert(task_id, task);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            condition: None,
        });
        self
    }

    /// Route from `from` to `yes` when `condition` holds, otherwise to `no`.
    pub fn add_conditional_edge<F>(
        mut self,
        from: impl Into<String>,
        condition: F,
        yes: impl Into<String>,
        no: impl Into<String>,
    ) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        let from = from.into();
        self.edges.push(Edge {
            from: from.clone(),
            to: yes.into(),
            condition: Some(Arc::new(condition)),
        });
        self.edges.push(Edge {
            from,
            to: no.into(),
            condition: None,
        });
        self
    }

    pub fn set_start_task(mut self, task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        if self.tasks.contains_key(&task_id) {
            self.start_task_id = Some(task_id);
        }
        self
    }

    /// Cap the number of task executions per run.
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn build(self) -> Graph {
        Graph {
            id: self.id,
            tasks: self.tasks,
            edges: self.edges,
            start_task_id: self.start_task_id,
            max_steps: self.max_steps,
        }
    }
}

/// Outcome of a completed graph run
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Option<String>,
    pub status_message: Option<String>,
    /// The task that ended the run
    pub last_task_id: String,
    /// Number of task executions performed
    pub steps: usize,
}
