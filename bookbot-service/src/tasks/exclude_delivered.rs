use async_trait::async_trait;
use bookbot_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::types::{context_keys, record_failure};
use crate::error::StageFailure;
use crate::exclusion::exclude_delivered;
use crate::models::ResultSet;
use crate::validator::MIN_RECOMMENDATIONS;

/// Last stage of an attempt. Ends the run on success.
///
/// A successful result always holds at least [`MIN_RECOMMENDATIONS`] titles,
/// so an attempt left with fewer after exclusion fails, not only an empty one.
pub struct ExcludeDeliveredTask;

#[async_trait]
impl Task for ExcludeDeliveredTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let validated: ResultSet = context
            .get(context_keys::VALIDATED)
            .await
            .ok_or_else(|| GraphError::ContextError("validated not found".to_string()))?;
        let exclusion: Vec<String> = context
            .get(context_keys::EXCLUSION)
            .await
            .unwrap_or_default();

        let remaining = exclude_delivered(&validated, &exclusion);
        if remaining.len() < MIN_RECOMMENDATIONS {
            record_failure(
                &context,
                StageFailure::Excluded {
                    remaining: remaining.len(),
                },
            )
            .await;
            return Ok(TaskResult::new(None, NextAction::Continue));
        }

        info!(
            count = remaining.len(),
            removed = validated.len() - remaining.len(),
            "Recommendations ready"
        );
        context.set(context_keys::RESULT_SET, remaining).await;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::End,
            Some("succeeded".to_string()),
        ))
    }
}
