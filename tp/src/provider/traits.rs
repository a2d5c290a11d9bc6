//! Outbound collaborator traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ProviderError;
use crate::domain::{Intent, StructuredItinerary, TripDraft};

/// What every external call returns: a success flag plus an opaque payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub success: bool,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ProviderResponse {
    pub fn ok(payload: Map<String, Value>) -> Self {
        Self { success: true, payload }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("error".into(), Value::String(message.into()));
        Self { success: false, payload }
    }

    /// Provider-supplied error text, when it sent one
    pub fn error_message(&self) -> Option<&str> {
        self.payload
            .get("error")
            .or_else(|| self.payload.get("message"))
            .and_then(Value::as_str)
    }
}

/// One logical capability per external-data intent
#[async_trait]
pub trait ExternalDataProvider: Send + Sync {
    async fn fetch(&self, intent: Intent, params: &Map<String, Value>) -> Result<ProviderResponse, ProviderError>;

    /// Whether this provider has a capability for the intent at all
    fn supports(&self, intent: Intent) -> bool {
        intent.is_external()
    }
}

/// A generated itinerary: the raw text and its parsed structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedItinerary {
    pub success: bool,
    pub itinerary: StructuredItinerary,
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait ItineraryGenerator: Send + Sync {
    async fn generate(&self, draft: &TripDraft) -> Result<GeneratedItinerary, ProviderError>;
}

/// Storage for the chat transcript
#[async_trait]
pub trait ChatPersistence: Send + Sync {
    async fn save(&self, user_message: &str, ai_response: &str, image_path: Option<&str>) -> Result<(), ProviderError>;
}
