use async_trait::async_trait;
use bookbot_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::types::context_keys;
use crate::models::{Language, Preferences};
use crate::prompt::build_prompt;

/// Builds the prompt once per run; every attempt reuses it unchanged.
pub struct BuildPromptTask;

#[async_trait]
impl Task for BuildPromptTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let preferences: Preferences = context
            .get(context_keys::PREFERENCES)
            .await
            .ok_or_else(|| GraphError::ContextError("preferences not found".to_string()))?;
        let exclusion: Vec<String> = context
            .get(context_keys::EXCLUSION)
            .await
            .unwrap_or_default();
        let language: Language = context
            .get(context_keys::LANGUAGE)
            .await
            .unwrap_or_default();

        let prompt = build_prompt(&preferences, &exclusion, language);
        info!(
            language = language.code(),
            excluded = exclusion.len(),
            "Prompt built"
        );

        context.set(context_keys::PROMPT, prompt).await;
        context.set(context_keys::ATTEMPT, 0u32).await;

        Ok(TaskResult::new(None, NextAction::Continue))
    }
}
