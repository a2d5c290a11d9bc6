//! Errors raised by outbound collaborators and the router

use std::time::Duration;
use thiserror::Error;

use crate::domain::Intent;
use crate::llm::LlmError;

/// Failure of an external data provider or itinerary generator
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Could not decode provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("No endpoint for {0}")]
    Unsupported(Intent),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout(_) => true,
            ProviderError::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            ProviderError::Llm(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Why the router could not produce a context block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("incomplete location data for {intent}: missing {missing:?}")]
    IncompleteLocationData { intent: Intent, missing: Vec<String> },

    #[error("missing required fields for {intent}: {missing:?}")]
    MissingRequiredField { intent: Intent, missing: Vec<String> },

    #[error("external fetch failed for {intent}: {message}")]
    ExternalFetchFailure { intent: Intent, message: String },
}

impl RouterError {
    /// Fields the user still has to supply, if this error is about fields
    pub fn missing_fields(&self) -> Option<&[String]> {
        match self {
            RouterError::IncompleteLocationData { missing, .. } | RouterError::MissingRequiredField { missing, .. } => {
                Some(missing)
            }
            RouterError::ExternalFetchFailure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(
            ProviderError::Status {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ProviderError::Status {
                status: 404,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!ProviderError::NotConfigured("no url".into()).is_retryable());
    }

    #[test]
    fn test_router_missing_fields() {
        let err = RouterError::IncompleteLocationData {
            intent: Intent::WeatherRequest,
            missing: vec!["country".into()],
        };
        assert_eq!(err.missing_fields(), Some(&["country".to_string()][..]));
        let err = RouterError::ExternalFetchFailure {
            intent: Intent::FindHotel,
            message: "boom".into(),
        };
        assert!(err.missing_fields().is_none());
    }
}
