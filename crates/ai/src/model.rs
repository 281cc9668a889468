//! Outbound model invocation seam.
//!
//! The executor only sees [`ModelClient`]; HTTP providers live in `homefix-infra`.
//! Responses are raw text and are treated as untrusted.

use async_trait::async_trait;
use thiserror::Error;

use homefix_core::CorrelationId;

use crate::registry::TaskType;

/// One completion request for a task.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub task_type: TaskType,
    pub correlation_id: CorrelationId,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model client is not configured")]
    NotConfigured,

    #[error("model call timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited by model provider")]
    RateLimited,

    #[error("model provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Timeout | ModelError::Transport(_) | ModelError::RateLimited => true,
            ModelError::Http { status, .. } => *status >= 500,
            ModelError::NotConfigured | ModelError::InvalidResponse(_) => false,
        }
    }
}

/// Hosted text-generation API returning a JSON document as text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError>;

    /// Model/provider label for logs.
    fn name(&self) -> &str {
        "model"
    }
}

/// Client used when no provider credentials are configured: every call fails fast.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredModelClient;

#[async_trait]
impl ModelClient for UnconfiguredModelClient {
    async fn complete(&self, _request: &ModelRequest) -> Result<String, ModelError> {
        Err(ModelError::NotConfigured)
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// Locate the JSON object inside a model response.
///
/// Handles markdown code fences and leading/trailing prose by taking the span
/// from the first `{` to the last `}`.
pub fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_from_code_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(raw), Some("{\"a\": 1}"));
    }

    #[test]
    fn extracts_json_surrounded_by_prose() {
        let raw = "Sure! Here you go: {\"a\": {\"b\": 2}} Let me know.";
        assert_eq!(extract_json(raw), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn no_object_yields_none() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn transient_errors_are_classified() {
        assert!(ModelError::Timeout.is_transient());
        assert!(ModelError::RateLimited.is_transient());
        assert!(ModelError::Http { status: 503, body: String::new() }.is_transient());
        assert!(!ModelError::Http { status: 400, body: String::new() }.is_transient());
        assert!(!ModelError::NotConfigured.is_transient());
    }
}
