//! LLM access
//!
//! A provider-agnostic [`LlmClient`] with an Anthropic implementation, and the
//! two conversation uses of it: the [`Classifier`] that turns a user message
//! into an [`crate::engine::LlmExtraction`], and the [`Composer`] that writes
//! the final answer over fetched data.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
mod classifier;
pub mod client;
mod composer;
mod error;
mod parse;
mod types;

pub use anthropic::AnthropicClient;
pub use classifier::Classifier;
pub use client::LlmClient;
pub use composer::{Composer, describe_day, fallback_reply};
pub use error::LlmError;
pub use parse::{extract_json_object, parse_extraction};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client for the configured provider
///
/// Only "anthropic" is supported; "none" and anything else is an error the
/// caller can fall back from.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "anthropic" => {
            debug!("create_client: creating Anthropic client");
            Ok(Arc::new(AnthropicClient::from_config(config)?))
        }
        "none" => Err(LlmError::NotConfigured("LLM disabled by configuration".to_string())),
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::NotConfigured(format!(
                "Unknown LLM provider: '{}'. Supported: anthropic",
                other
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_rejects_unknown_provider() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            ..LlmConfig::default()
        };
        let err = create_client(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }

    #[test]
    fn test_create_client_disabled() {
        let config = LlmConfig {
            provider: "none".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(create_client(&config), Err(LlmError::NotConfigured(_))));
    }
}
