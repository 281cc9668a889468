//! Environment configuration, read once at start-up.

use std::time::Duration;

use anyhow::{Context, Result};

use homefix_ai::{ExecutorConfig, RetryPolicy};

pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL_NAME: &str = "gpt-4o-mini";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    /// Unset means model calls fail fast and every task falls back.
    pub model_api_key: Option<String>,
    pub model_base_url: String,
    pub model_name: String,
    pub model_timeout: Duration,
    /// Retries after the first attempt, transient failures only.
    pub model_max_retries: u32,
    pub flag_cache_ttl: Duration,
    pub batch_delay: Duration,
    /// Unset means in-memory stores.
    pub database_url: Option<String>,
    pub bind_addr: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model_api_key: None,
            model_base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_timeout: Duration::from_millis(20_000),
            model_max_retries: 1,
            flag_cache_ttl: Duration::from_secs(30),
            batch_delay: Duration::from_millis(250),
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str| -> Result<Option<u64>> {
            get(key)
                .map(|v| v.parse::<u64>().with_context(|| format!("{key} must be a non-negative integer, got {v:?}")))
                .transpose()
        };

        let defaults = Self::default();
        Ok(Self {
            model_api_key: get("AI_MODEL_API_KEY"),
            model_base_url: get("AI_MODEL_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.model_base_url),
            model_name: get("AI_MODEL_NAME").unwrap_or(defaults.model_name),
            model_timeout: number("AI_MODEL_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.model_timeout),
            model_max_retries: number("AI_MODEL_MAX_RETRIES")?
                .map(|n| u32::try_from(n).context("AI_MODEL_MAX_RETRIES out of range"))
                .transpose()?
                .unwrap_or(defaults.model_max_retries),
            flag_cache_ttl: number("AI_FLAG_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.flag_cache_ttl),
            batch_delay: number("AI_BATCH_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.batch_delay),
            database_url: get("DATABASE_URL"),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
        })
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default()
            .with_timeout(self.model_timeout)
            .with_retry(RetryPolicy::with_retries(self.model_max_retries))
    }
}
