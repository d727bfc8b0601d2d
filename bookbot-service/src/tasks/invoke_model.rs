use async_trait::async_trait;
use bookbot_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::types::{context_keys, record_failure};
use crate::llm::ModelInvoker;
use crate::prompt::Prompt;

/// Starts an attempt: bumps the attempt counter and calls the model.
pub struct InvokeModelTask {
    invoker: ModelInvoker,
}

impl InvokeModelTask {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl Task for InvokeModelTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let prompt: Prompt = context
            .get(context_keys::PROMPT)
            .await
            .ok_or_else(|| GraphError::ContextError("prompt not found".to_string()))?;

        let attempt = context
            .get::<u32>(context_keys::ATTEMPT)
            .await
            .unwrap_or(0)
            + 1;
        context.set(context_keys::ATTEMPT, attempt).await;
        info!(attempt, "Starting pipeline attempt");

        match self
            .invoker
            .invoke(&prompt.system_text, &prompt.user_text)
            .await
        {
            Ok(raw) => context.set(context_keys::RAW_OUTPUT, raw).await,
            Err(failure) => record_failure(&context, failure.into()).await,
        }

        Ok(TaskResult::new(None, NextAction::Continue))
    }
}
