//! HTTP-backed external data provider
//!
//! POSTs the parameter object as JSON to `{base-url}/{endpoint}` and expects a
//! `{success, ...}` body back. Transient failures are retried with exponential
//! backoff; the router never retries on top of this.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ExternalDataProvider, ProviderError, ProviderResponse};
use crate::config::ProviderConfig;
use crate::domain::Intent;

/// Endpoint path for an intent
pub fn endpoint(intent: Intent) -> Option<&'static str> {
    match intent {
        Intent::WeatherRequest => Some("weather"),
        Intent::FindHotel => Some("hotels"),
        Intent::FindAttractions => Some("attractions"),
        Intent::FindRestaurants => Some("restaurants"),
        Intent::FlightInformation => Some("flights"),
        Intent::LocalEvents => Some("events"),
        Intent::TravelRestrictions => Some("restrictions"),
        Intent::CurrencyConversion => Some("currency"),
        Intent::CostEstimate => Some("cost-estimate"),
        Intent::PublicTransportInfo => Some("transport"),
        Intent::SafetyInformation => Some("safety"),
        Intent::TripBuilding | Intent::ItineraryAdvice | Intent::GeneralQuery => None,
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

pub struct HttpDataProvider {
    base_url: String,
    api_key: Option<String>,
    http: Client,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl HttpDataProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        debug!(?config.base_url, "HttpDataProvider::from_config: called");
        let base_url = config
            .base_url
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("provider.base-url is not set".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let api_key = config.api_key_env.as_ref().and_then(|var| std::env::var(var).ok());
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        info!(%base_url, "External data provider configured");
        Ok(Self {
            base_url,
            api_key,
            http,
            max_retries: config.max_retries,
            initial_backoff_ms: config.initial_backoff_ms,
        })
    }

    fn url_for(&self, intent: Intent) -> Result<String, ProviderError> {
        let path = endpoint(intent).ok_or(ProviderError::Unsupported(intent))?;
        Ok(format!("{}/{}", self.base_url, path))
    }
}

#[async_trait]
impl ExternalDataProvider for HttpDataProvider {
    async fn fetch(&self, intent: Intent, params: &Map<String, Value>) -> Result<ProviderResponse, ProviderError> {
        debug!(%intent, fields = params.len(), "HttpDataProvider::fetch: called");
        let url = self.url_for(intent)?;

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.initial_backoff_ms * 2u64.pow(attempt - 1);
                warn!(%intent, attempt, backoff_ms = backoff, "fetch: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let mut request = self.http.post(url.clone()).json(params);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "fetch: network error");
                    last_error = Some(ProviderError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if is_retryable_status(status) && attempt < self.max_retries {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "fetch: retryable status");
                last_error = Some(ProviderError::Status { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                debug!(status, "fetch: provider error status");
                return Err(ProviderError::Status { status, message: text });
            }

            let body: Value = response.json().await?;
            let parsed: ProviderResponse = serde_json::from_value(body)?;
            debug!(%intent, success = parsed.success, "fetch: done");
            return Ok(parsed);
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Status {
            status: 0,
            message: "max retries exceeded".to_string(),
        }))
    }

    fn supports(&self, intent: Intent) -> bool {
        endpoint(intent).is_some()
    }
}

/// Used when no provider is configured; every fetch fails without I/O
#[derive(Debug, Clone, Default)]
pub struct UnavailableProvider;

#[async_trait]
impl ExternalDataProvider for UnavailableProvider {
    async fn fetch(&self, intent: Intent, _params: &Map<String, Value>) -> Result<ProviderResponse, ProviderError> {
        debug!(%intent, "UnavailableProvider::fetch: called");
        Err(ProviderError::NotConfigured(
            "no external data provider configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_external_intent_has_endpoint() {
        for intent in Intent::ALL {
            assert_eq!(endpoint(intent).is_some(), intent.is_external(), "{intent}");
        }
    }

    #[test]
    fn test_from_config_requires_base_url() {
        let config = ProviderConfig::default();
        assert!(matches!(
            HttpDataProvider::from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_url_for() {
        let config = ProviderConfig {
            base_url: Some("http://localhost:9000/".to_string()),
            ..ProviderConfig::default()
        };
        let provider = HttpDataProvider::from_config(&config).unwrap();
        assert_eq!(
            provider.url_for(Intent::FindHotel).unwrap(),
            "http://localhost:9000/hotels"
        );
        assert!(matches!(
            provider.url_for(Intent::GeneralQuery),
            Err(ProviderError::Unsupported(Intent::GeneralQuery))
        ));
        assert!(!provider.supports(Intent::TripBuilding));
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_after_retries() {
        let config = ProviderConfig {
            base_url: Some("http://127.0.0.1:9".to_string()),
            timeout_ms: 200,
            max_retries: 1,
            initial_backoff_ms: 1,
            ..ProviderConfig::default()
        };
        let provider = HttpDataProvider::from_config(&config).unwrap();
        let err = provider.fetch(Intent::WeatherRequest, &Map::new()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unavailable_provider() {
        let err = UnavailableProvider
            .fetch(Intent::FindHotel, &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
