use async_trait::async_trait;
use bookbot_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};

use super::types::{context_keys, record_failure};
use crate::parser::parse_model_output;

pub struct ParseOutputTask;

#[async_trait]
impl Task for ParseOutputTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let raw: String = context
            .get(context_keys::RAW_OUTPUT)
            .await
            .ok_or_else(|| GraphError::ContextError("raw_output not found".to_string()))?;

        match parse_model_output(&raw) {
            Ok(payload) => context.set(context_keys::PARSED_PAYLOAD, payload).await,
            Err(failure) => record_failure(&context, failure.into()).await,
        }

        Ok(TaskResult::new(None, NextAction::Continue))
    }
}
