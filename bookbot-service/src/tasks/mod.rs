// Pipeline stages, one task per state
pub mod build_prompt;
pub mod invoke_model;
pub mod parse_output;
pub mod validate_batch;
pub mod exclude_delivered;
pub mod retry_gate;

// Shared modules
pub mod types;

// Re-export task implementations
pub use build_prompt::BuildPromptTask;
pub use invoke_model::InvokeModelTask;
pub use parse_output::ParseOutputTask;
pub use validate_batch::ValidateBatchTask;
pub use exclude_delivered::ExcludeDeliveredTask;
pub use retry_gate::RetryGateTask;

// Re-export context keys
pub use types::context_keys;
