use async_trait::async_trait;
use bookbot_flow::{Context, NextAction, Result, Task, TaskResult};
use std::any::type_name;
use tracing::{error, info};

use super::InvokeModelTask;
use super::types::{ATTEMPT_KEYS, context_keys};
use crate::error::StageFailure;

/// Entered after any failed stage. Either starts the next attempt from a
/// clean slate or ends the run as exhausted.
pub struct RetryGateTask {
    max_attempts: u32,
}

impl RetryGateTask {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

#[async_trait]
impl Task for RetryGateTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let attempt = context.get::<u32>(context_keys::ATTEMPT).await.unwrap_or(0);
        let failure: Option<StageFailure> = context.get(context_keys::STAGE_FAILURE).await;
        let stage = failure.as_ref().map(StageFailure::stage).unwrap_or("unknown");

        if attempt >= self.max_attempts {
            error!(
                attempt,
                max_attempts = self.max_attempts,
                stage,
                "Pipeline exhausted"
            );
            return Ok(TaskResult::new_with_status(
                None,
                NextAction::End,
                Some("exhausted".to_string()),
            ));
        }

        for key in ATTEMPT_KEYS {
            context.remove(key).await;
        }
        info!(
            attempt,
            max_attempts = self.max_attempts,
            stage,
            "Retrying pipeline"
        );

        Ok(TaskResult::new(
            None,
            NextAction::GoTo(type_name::<InvokeModelTask>().to_string()),
        ))
    }
}
