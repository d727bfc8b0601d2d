use bookbot_flow::Context;
use tracing::warn;

use crate::error::StageFailure;

/// Context keys shared by the pipeline tasks.
pub mod context_keys {
    pub const PREFERENCES: &str = "preferences";
    pub const EXCLUSION: &str = "exclusion";
    pub const LANGUAGE: &str = "language";
    pub const PROMPT: &str = "prompt";
    pub const ATTEMPT: &str = "attempt";
    pub const RAW_OUTPUT: &str = "raw_output";
    pub const PARSED_PAYLOAD: &str = "parsed_payload";
    pub const VALIDATED: &str = "validated";
    pub const RESULT_SET: &str = "result_set";
    pub const STAGE_FAILURE: &str = "stage_failure";
}

/// Keys written during one attempt and discarded before the next.
pub const ATTEMPT_KEYS: [&str; 4] = [
    context_keys::RAW_OUTPUT,
    context_keys::PARSED_PAYLOAD,
    context_keys::VALIDATED,
    context_keys::STAGE_FAILURE,
];

pub async fn record_failure(context: &Context, failure: StageFailure) {
    warn!(stage = failure.stage(), reason = %failure, "Attempt failed");
    context.set(context_keys::STAGE_FAILURE, failure).await;
}

/// Edge condition: did the task that just ran mark the attempt as failed?
pub fn has_failed(context: &Context) -> bool {
    context.contains_key(context_keys::STAGE_FAILURE)
}
