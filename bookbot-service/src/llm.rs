//! Boundary to the external completion service.
//!
//! [`ModelClient`] is the single call contract; [`OpenRouterModel`] is the
//! production implementation. [`ModelInvoker`] wraps any client with the
//! transport-level retry policy.

use anyhow::anyhow;
use async_trait::async_trait;
use rig::{client::CompletionClient, completion::Prompt, providers::openrouter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::error::TransportFailure;

/// Attempts per invocation, and attempts per pipeline run.
pub const MAX_RETRIES: u32 = 3;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Sampling parameters, fixed for the lifetime of a client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f64,
    pub max_tokens: u64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one system/user instruction pair and return the raw completion text.
    async fn complete(&self, system_text: &str, user_text: &str) -> anyhow::Result<String>;
}

/// Completion client backed by OpenRouter through `rig`.
pub struct OpenRouterModel {
    client: openrouter::Client,
    model: String,
    sampling: SamplingParams,
}

impl OpenRouterModel {
    pub fn new(api_key: &str, model: impl Into<String>, sampling: SamplingParams) -> Self {
        Self {
            client: openrouter::Client::new(api_key),
            model: model.into(),
            sampling,
        }
    }
}

#[async_trait]
impl ModelClient for OpenRouterModel {
    async fn complete(&self, system_text: &str, user_text: &str) -> anyhow::Result<String> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(system_text)
            .temperature(self.sampling.temperature)
            .max_tokens(self.sampling.max_tokens)
            .build();

        let response = agent.prompt(user_text).await?;
        Ok(response)
    }
}

/// Calls a [`ModelClient`] with a bounded number of attempts.
///
/// An attempt is retried when the call errors, times out, or returns a body
/// that is empty after trimming. Cloning shares the client and the
/// concurrency limiter.
#[derive(Clone)]
pub struct ModelInvoker {
    client: Arc<dyn ModelClient>,
    max_retries: u32,
    timeout: Option<Duration>,
    limiter: Option<Arc<Semaphore>>,
}

impl ModelInvoker {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            max_retries: MAX_RETRIES,
            timeout: None,
            limiter: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Abort a single call after `timeout`; the attempt then counts as failed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Allow at most `permits` calls in flight across all clones of this invoker.
    pub fn with_concurrency_limit(mut self, permits: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(permits.max(1))));
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn invoke(
        &self,
        system_text: &str,
        user_text: &str,
    ) -> Result<String, TransportFailure> {
        for attempt in 1..=self.max_retries {
            info!(attempt, "Model call attempt");
            match self.call_once(system_text, user_text).await {
                Ok(raw) if raw.trim().is_empty() => {
                    warn!(attempt, "Empty model response");
                }
                Ok(raw) => {
                    info!(attempt, raw_output = %raw, "Model raw output");
                    return Ok(raw);
                }
                Err(e) => {
                    error!(attempt, error = %e, "Model call error");
                }
            }
        }

        error!(attempts = self.max_retries, "All model call attempts failed");
        Err(TransportFailure {
            attempts: self.max_retries,
        })
    }

    async fn call_once(&self, system_text: &str, user_text: &str) -> anyhow::Result<String> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.clone().acquire_owned().await?),
            None => None,
        };

        let call = self.client.complete(system_text, user_text);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| anyhow!("model call timed out after {:?}", limit))?,
            None => call.await,
        }
    }
}
