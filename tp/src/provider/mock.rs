//! In-memory collaborators for tests and demos

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{
    ChatPersistence, ExternalDataProvider, GeneratedItinerary, ItineraryGenerator, ProviderError, ProviderResponse,
};
use crate::domain::{Intent, StructuredItinerary, TripDraft};

/// Returns one canned response for every fetch and records the calls
#[derive(Debug)]
pub struct MockProvider {
    response: ProviderResponse,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    calls: Mutex<Vec<(Intent, Map<String, Value>)>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::with_payload(Map::new())
    }
}

impl MockProvider {
    pub fn with_response(response: ProviderResponse) -> Self {
        Self {
            response,
            delay: None,
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_payload(payload: Map<String, Value>) -> Self {
        Self::with_response(ProviderResponse::ok(payload))
    }

    /// Sleep before answering, to exercise timeouts
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(Intent, Map<String, Value>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ExternalDataProvider for MockProvider {
    async fn fetch(&self, intent: Intent, params: &Map<String, Value>) -> Result<ProviderResponse, ProviderError> {
        debug!(%intent, "MockProvider::fetch: called");
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((intent, params.clone()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.response.clone())
    }
}

/// Parses a fixed itinerary text, or fails on demand
#[derive(Debug)]
pub struct MockGenerator {
    text: Option<String>,
    call_count: AtomicUsize,
    drafts: Mutex<Vec<TripDraft>>,
}

impl MockGenerator {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            call_count: AtomicUsize::new(0),
            drafts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            call_count: AtomicUsize::new(0),
            drafts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Drafts the generator was called with
    pub fn drafts(&self) -> Vec<TripDraft> {
        self.drafts.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ItineraryGenerator for MockGenerator {
    async fn generate(&self, draft: &TripDraft) -> Result<GeneratedItinerary, ProviderError> {
        debug!("MockGenerator::generate: called");
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut drafts) = self.drafts.lock() {
            drafts.push(draft.clone());
        }
        let text = self.text.clone().ok_or_else(|| ProviderError::Status {
            status: 503,
            message: "generator unavailable".to_string(),
        })?;
        let itinerary = StructuredItinerary::parse_with_draft(&text, draft);
        Ok(GeneratedItinerary {
            success: !itinerary.days.is_empty(),
            itinerary,
            text,
            metadata: Map::new(),
        })
    }
}

/// Keeps every saved exchange in memory
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    saved: Mutex<Vec<(String, String)>>,
}

impl MemoryPersistence {
    pub fn saved(&self) -> Vec<(String, String)> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatPersistence for MemoryPersistence {
    async fn save(&self, user_message: &str, ai_response: &str, _image_path: Option<&str>) -> Result<(), ProviderError> {
        if let Ok(mut saved) = self.saved.lock() {
            saved.push((user_message.to_string(), ai_response.to_string()));
        }
        Ok(())
    }
}
