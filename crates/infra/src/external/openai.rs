//! OpenAI-compatible chat-completions client implementing [`ModelClient`].
//!
//! HTTP status mapping: 429 -> `RateLimited`, other non-2xx -> `Http` (5xx is
//! transient for the executor's retry policy), connect/read failures ->
//! `Transport`. The executor owns the per-attempt timeout.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use homefix_ai::{ModelClient, ModelError, ModelRequest};

use crate::config::AiConfig;

/// Error bodies are cut to this many chars before they reach logs.
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiModelClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OpenAiModelClient {
    pub fn new(
        api_key: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ModelError::NotConfigured)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>, ModelError> {
        config
            .model_api_key
            .as_deref()
            .map(|key| Self::new(key, &config.model_base_url, &config.model_name))
            .transpose()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());
    message.chars().take(MAX_ERROR_BODY).collect()
}

fn map_status(status: u16, body: &str) -> ModelError {
    match status {
        429 => ModelError::RateLimited,
        _ => ModelError::Http {
            status,
            body: error_message(body),
        },
    }
}

fn map_transport(err: reqwest::Error) -> ModelError {
    if err.is_timeout() {
        ModelError::Timeout
    } else {
        ModelError::Transport(err.to_string())
    }
}

#[async_trait]
impl ModelClient for OpenAiModelClient {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-correlation-id", request.correlation_id.to_string())
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ModelError::InvalidResponse("response has no message content".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_retry_classes() {
        assert_eq!(map_status(429, ""), ModelError::RateLimited);
        assert!(map_status(503, "upstream").is_transient());
        let bad = map_status(400, r#"{"error": {"message": "bad schema", "type": "invalid_request_error"}}"#);
        assert_eq!(
            bad,
            ModelError::Http {
                status: 400,
                body: "bad schema".to_string()
            }
        );
        assert!(!bad.is_transient());
    }

    #[test]
    fn error_bodies_are_truncated() {
        let err = map_status(500, &"x".repeat(5_000));
        match err {
            ModelError::Http { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_key_means_no_client() {
        assert!(OpenAiModelClient::from_config(&AiConfig::default()).unwrap().is_none());

        let cfg = AiConfig {
            model_api_key: Some("sk-test".to_string()),
            model_base_url: "http://localhost:1/v1/".to_string(),
            ..AiConfig::default()
        };
        let client = OpenAiModelClient::from_config(&cfg).unwrap().unwrap();
        assert_eq!(client.endpoint(), "http://localhost:1/v1/chat/completions");
        assert_eq!(client.model(), "gpt-4o-mini");
    }
}
