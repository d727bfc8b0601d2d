//! The recommendation pipeline as a task graph, and the orchestrator that runs it.

use bookbot_flow::{Context, Graph, GraphBuilder, Task};
use std::any::type_name;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::error::GenerationError;
use crate::llm::{MAX_RETRIES, ModelInvoker};
use crate::models::{Language, Preferences, ResultSet};
use crate::tasks::types::has_failed;
use crate::tasks::{
    BuildPromptTask, ExcludeDeliveredTask, InvokeModelTask, ParseOutputTask, RetryGateTask,
    ValidateBatchTask, context_keys,
};

pub const PIPELINE_GRAPH_ID: &str = "recommendation_pipeline";

/// Build the pipeline graph:
///
/// ```text
/// BuildPrompt -> InvokeModel -> ParseOutput -> ValidateBatch -> ExcludeDelivered -> end
///                    ^              |               |                  |
///                    +-------- RetryGate <----------+------------------+
/// ```
///
/// Every stage routes to the gate when it marked the attempt as failed.
pub fn build_pipeline_graph(invoker: ModelInvoker, max_attempts: u32) -> Graph {
    let build_prompt: Arc<dyn Task> = Arc::new(BuildPromptTask);
    let invoke_model: Arc<dyn Task> = Arc::new(InvokeModelTask::new(invoker));
    let parse_output: Arc<dyn Task> = Arc::new(ParseOutputTask);
    let validate_batch: Arc<dyn Task> = Arc::new(ValidateBatchTask);
    let exclude_delivered: Arc<dyn Task> = Arc::new(ExcludeDeliveredTask);
    let retry_gate: Arc<dyn Task> = Arc::new(RetryGateTask::new(max_attempts));

    let build_prompt_id = type_name::<BuildPromptTask>();
    let invoke_model_id = type_name::<InvokeModelTask>();
    let parse_output_id = type_name::<ParseOutputTask>();
    let validate_batch_id = type_name::<ValidateBatchTask>();
    let exclude_delivered_id = type_name::<ExcludeDeliveredTask>();
    let retry_gate_id = type_name::<RetryGateTask>();

    GraphBuilder::new(PIPELINE_GRAPH_ID)
        .add_task(build_prompt)
        .add_task(invoke_model)
        .add_task(parse_output)
        .add_task(validate_batch)
        .add_task(exclude_delivered)
        .add_task(retry_gate)
        .add_edge(build_prompt_id, invoke_model_id)
        .add_conditional_edge(invoke_model_id, has_failed, retry_gate_id, parse_output_id)
        .add_conditional_edge(parse_output_id, has_failed, retry_gate_id, validate_batch_id)
        .add_conditional_edge(
            validate_batch_id,
            has_failed,
            retry_gate_id,
            exclude_delivered_id,
        )
        .add_edge(exclude_delivered_id, retry_gate_id)
        .set_start_task(build_prompt_id)
        // One prompt build, then at most five stages per attempt.
        .max_steps(2 + 5 * max_attempts.max(1) as usize)
        .build()
}

/// Runs the pipeline. The graph is shared; each call gets its own context.
#[derive(Clone)]
pub struct Orchestrator {
    graph: Arc<Graph>,
    max_attempts: u32,
}

impl Orchestrator {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self::with_max_attempts(invoker, MAX_RETRIES)
    }

    pub fn with_max_attempts(invoker: ModelInvoker, max_attempts: u32) -> Self {
        let max_attempts = max_attempts.max(1);
        Self {
            graph: Arc::new(build_pipeline_graph(invoker, max_attempts)),
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Produce 3 to 5 validated recommendations none of which appear in
    /// `exclusion`, or a single exhaustion error.
    pub async fn generate(
        &self,
        preferences: &Preferences,
        exclusion: &[String],
        language: Language,
    ) -> Result<ResultSet, GenerationError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id, language = language.code());

        async {
            let context = Context::new();
            context.set(context_keys::PREFERENCES, preferences).await;
            context.set(context_keys::EXCLUSION, exclusion).await;
            context.set(context_keys::LANGUAGE, language).await;

            let outcome = self.graph.run(context.clone()).await;
            let attempts = context
                .get::<u32>(context_keys::ATTEMPT)
                .await
                .unwrap_or(0);

            match outcome {
                Ok(execution) => {
                    if let Some(result_set) = context.get::<ResultSet>(context_keys::RESULT_SET).await
                    {
                        info!(
                            attempts,
                            count = result_set.len(),
                            steps = execution.steps,
                            "Pipeline succeeded"
                        );
                        return Ok(result_set);
                    }
                    error!(attempts, last_task = %execution.last_task_id, "Pipeline exhausted");
                }
                Err(e) => {
                    error!(attempts, error = %e, "Pipeline engine error");
                }
            }

            Err(GenerationError::Exhausted { attempts })
        }
        .instrument(span)
        .await
    }
}
