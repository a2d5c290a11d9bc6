//! Anthropic Claude API client implementation
//!
//! Implements the LlmClient trait for Anthropic's Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, StopReason, TokenUsage};
use crate::config::LlmConfig;

/// Retries after the first attempt for transient errors
const MAX_RETRIES: u32 = 3;

/// First backoff delay; doubles per retry
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Longest wait honored from a `retry-after` header
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(10);

/// Anthropic Claude API client
pub struct AnthropicClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
}

impl AnthropicClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|e| LlmError::NotConfigured(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    /// Build the request body for the Anthropic API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");
        serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens.min(self.max_tokens),
            "system": request.system_prompt,
            "messages": self.convert_messages(&request.messages),
        })
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        debug!(message_count = %messages.len(), "convert_messages: called");
        messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role,
                    "content": msg.content,
                })
            })
            .collect()
    }

    /// Parse the Anthropic API response, joining text blocks
    fn parse_response(&self, api_response: AnthropicResponse) -> CompletionResponse {
        debug!(?api_response.stop_reason, "parse_response: called");
        let text: Vec<String> = api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect();

        CompletionResponse {
            content: if text.is_empty() { None } else { Some(text.join("")) },
            stop_reason: StopReason::from_anthropic(&api_response.stop_reason),
            usage: TokenUsage {
                input_tokens: api_response.usage.input_tokens,
                output_tokens: api_response.usage.output_tokens,
            },
        }
    }

    /// One POST to the Messages API, without retries
    async fn send_once(&self, url: &str, body: &serde_json::Value) -> Result<CompletionResponse, LlmError> {
        let response = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout)
                } else {
                    LlmError::Network(e)
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(5);
            debug!(retry_after, "send_once: rate limited");
            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status, "send_once: API error");
            return Err(LlmError::ApiError { status, message });
        }

        let api_response: AnthropicResponse = response.json().await?;
        Ok(self.parse_response(api_response))
    }
}

/// Wait before retry number `attempt` (0-based)
fn backoff_for(error: &LlmError, attempt: u32) -> Duration {
    match error {
        LlmError::RateLimited { retry_after } => (*retry_after).min(MAX_RATE_LIMIT_WAIT),
        _ => Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt)),
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_request_body(&request);

        let mut attempt = 0;
        loop {
            match self.send_once(&url, &body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let backoff = backoff_for(&e, attempt);
                    warn!(attempt, backoff_ms = backoff.as_millis() as u64, error = %e, "LLM call failed, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// Anthropic API response types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(max_tokens: u32) -> AnthropicClient {
        AnthropicClient {
            model: "claude-sonnet-4".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            http: Client::new(),
            max_tokens,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_build_request_body_basic() {
        let request = CompletionRequest::single("You are a travel assistant", "Hello", 1000);
        let body = client(8192).build_request_body(&request);

        assert_eq!(body["model"], "claude-sonnet-4");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["system"], "You are a travel assistant");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_max_tokens_capped() {
        let request = CompletionRequest::single("Test", "hi", 5000);
        let body = client(1000).build_request_body(&request);

        // Should be capped to client max
        assert_eq!(body["max_tokens"], 1000);
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let raw = serde_json::json!({
            "content": [
                {"type": "text", "text": "{\"intent\": "},
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "\"Find-Hotel\"}"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        });
        let api_response: AnthropicResponse = serde_json::from_value(raw).unwrap();
        let response = client(1000).parse_response(api_response);
        assert_eq!(response.content.as_deref(), Some("{\"intent\": \"Find-Hotel\"}"));
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.output_tokens, 7);
    }

    #[test]
    fn test_backoff_doubles_and_caps_rate_limit() {
        let overloaded = LlmError::ApiError {
            status: 529,
            message: String::new(),
        };
        assert_eq!(backoff_for(&overloaded, 0), Duration::from_millis(1000));
        assert_eq!(backoff_for(&overloaded, 2), Duration::from_millis(4000));

        let limited = LlmError::RateLimited {
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(backoff_for(&limited, 0), MAX_RATE_LIMIT_WAIT);
    }

    #[test]
    fn test_from_config_without_key() {
        let config = LlmConfig {
            api_key_env: "TRIPPLANNER_TEST_MISSING_KEY_VAR".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            AnthropicClient::from_config(&config),
            Err(LlmError::NotConfigured(_))
        ));
    }
}
