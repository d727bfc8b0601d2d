use anyhow::{Context as _, anyhow};
use std::time::Duration;

use crate::llm::DEFAULT_MODEL;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Runtime settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub openrouter_api_key: String,
    pub model: String,
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub model_timeout: Option<Duration>,
    pub model_max_concurrency: Option<usize>,
    pub log_format: LogFormat,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let openrouter_api_key =
            get("OPENROUTER_API_KEY").ok_or_else(|| anyhow!("OPENROUTER_API_KEY not set"))?;

        let model_timeout = get("MODEL_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("MODEL_TIMEOUT_SECS is not a number: {raw}"))
            })
            .transpose()?
            .map(Duration::from_secs);

        let model_max_concurrency = get("MODEL_MAX_CONCURRENCY")
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .with_context(|| format!("MODEL_MAX_CONCURRENCY is not a number: {raw}"))
            })
            .transpose()?;

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        Ok(Self {
            openrouter_api_key,
            model: get("BOOKBOT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: get("DATABASE_URL"),
            model_timeout,
            model_max_concurrency,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("OPENROUTER_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.database_url, None);
        assert_eq!(config.model_timeout, None);
        assert_eq!(config.model_max_concurrency, None);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_api_key_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("OPENROUTER_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("BOOKBOT_MODEL", "anthropic/claude-3-haiku"),
            ("MODEL_TIMEOUT_SECS", "30"),
            ("MODEL_MAX_CONCURRENCY", "4"),
            ("LOG_FORMAT", "pretty"),
            ("DATABASE_URL", "postgres://localhost/bookbot"),
        ])
        .unwrap();
        assert_eq!(config.model, "anthropic/claude-3-haiku");
        assert_eq!(config.model_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.model_max_concurrency, Some(4));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.database_url.is_some());
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        assert!(config(&[("OPENROUTER_API_KEY", "k"), ("MODEL_TIMEOUT_SECS", "soon")]).is_err());
    }
}
