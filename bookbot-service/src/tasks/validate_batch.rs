use async_trait::async_trait;
use bookbot_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::types::{context_keys, record_failure};
use crate::models::Preferences;
use crate::parser::ParsedPayload;
use crate::validator::validate_batch;

pub struct ValidateBatchTask;

#[async_trait]
impl Task for ValidateBatchTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let payload: ParsedPayload = context
            .get(context_keys::PARSED_PAYLOAD)
            .await
            .ok_or_else(|| GraphError::ContextError("parsed_payload not found".to_string()))?;
        let preferences: Preferences = context
            .get(context_keys::PREFERENCES)
            .await
            .ok_or_else(|| GraphError::ContextError("preferences not found".to_string()))?;

        match validate_batch(&payload, &preferences) {
            Ok(validated) => {
                info!(count = validated.len(), "Batch validated");
                context.set(context_keys::VALIDATED, validated).await;
            }
            Err(failure) => record_failure(&context, failure.into()).await,
        }

        Ok(TaskResult::new(None, NextAction::Continue))
    }
}
