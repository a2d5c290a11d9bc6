//! Itinerary generators

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{GeneratedItinerary, ItineraryGenerator, ProviderError};
use crate::domain::{StructuredItinerary, TripDraft};
use crate::llm::{CompletionRequest, LlmClient};
use crate::normalize::parse_date;
use crate::prompts::{ItineraryContext, PromptLoader};

/// Asks the LLM for a day-by-day plan and parses the reply
pub struct LlmItineraryGenerator {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl LlmItineraryGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }
}

#[async_trait]
impl ItineraryGenerator for LlmItineraryGenerator {
    async fn generate(&self, draft: &TripDraft) -> Result<GeneratedItinerary, ProviderError> {
        debug!(destination = ?draft.vacation_location, "LlmItineraryGenerator::generate: called");
        let system_prompt = self
            .prompts
            .render("itinerary", &ItineraryContext::from_draft(draft))
            .map_err(|e| ProviderError::Prompt(e.to_string()))?;
        let request = CompletionRequest::single(system_prompt, "Write the itinerary now.", self.max_tokens);

        let response = self.llm.complete(request).await?;
        let text = response.content.unwrap_or_default();
        let itinerary = StructuredItinerary::parse_with_draft(&text, draft);
        let success = !itinerary.days.is_empty();
        if !success {
            warn!(len = text.len(), "Itinerary reply had no day sections");
        }

        let mut metadata = Map::new();
        metadata.insert("generator".into(), Value::String("llm".into()));
        metadata.insert("generatedAt".into(), Value::String(Utc::now().to_rfc3339()));
        metadata.insert("outputTokens".into(), Value::from(response.usage.output_tokens));
        info!(days = itinerary.days.len(), "Itinerary generated");

        Ok(GeneratedItinerary {
            success,
            itinerary,
            text,
            metadata,
        })
    }
}

/// Builds a plain skeleton plan from the draft, with no network
#[derive(Debug, Clone, Default)]
pub struct OfflineItineraryGenerator;

impl OfflineItineraryGenerator {
    fn skeleton(draft: &TripDraft) -> String {
        let destination = draft.vacation_location.clone().unwrap_or_else(|| "your destination".to_string());
        let days = draft.duration.unwrap_or(1).clamp(1, 30);
        let start = draft
            .dates
            .as_ref()
            .and_then(|d| d.from.as_deref())
            .and_then(parse_date);

        let mut text = format!("{}-Day Trip to {}\n", days, destination);
        let _ = writeln!(text, "Destination: {}", destination);
        if let Some(start) = start {
            let end = start + Duration::days(i64::from(days) - 1);
            let _ = writeln!(text, "Dates: {} to {}", start, end);
        }
        let place = draft.city.clone().unwrap_or_else(|| destination.clone());
        for n in 1..=days {
            let _ = writeln!(text);
            let _ = writeln!(text, "Day {}: {}", n, Self::theme(n, days, &place));
            if let Some(date) = start.map(|s: NaiveDate| s + Duration::days(i64::from(n) - 1)) {
                let _ = writeln!(text, "Date: {}", date);
            }
            let _ = writeln!(text, "Location: {}", place);
            for activity in Self::activities(n, days) {
                let _ = writeln!(text, "- {}", activity);
            }
        }
        if let Some(budget) = &draft.budget {
            let _ = writeln!(text);
            let _ = writeln!(text, "Additional Info: planned for a {} budget", budget);
        }
        text
    }

    fn theme(n: u32, days: u32, place: &str) -> String {
        match n {
            1 => format!("Arrival in {}", place),
            n if n == days && days > 1 => "Last day and departure".to_string(),
            _ => format!("Exploring {}", place),
        }
    }

    fn activities(n: u32, days: u32) -> &'static [&'static str] {
        match n {
            1 => &["Check in and settle", "Short walk around the neighborhood", "Dinner nearby"],
            n if n == days && days > 1 => &["Breakfast and packing", "Last stroll or souvenir shopping", "Transfer out"],
            _ => &["Morning sightseeing", "Lunch at a local spot", "Afternoon museum or park", "Evening free"],
        }
    }
}

#[async_trait]
impl ItineraryGenerator for OfflineItineraryGenerator {
    async fn generate(&self, draft: &TripDraft) -> Result<GeneratedItinerary, ProviderError> {
        debug!("OfflineItineraryGenerator::generate: called");
        let text = Self::skeleton(draft);
        let itinerary = StructuredItinerary::parse_with_draft(&text, draft);
        let mut metadata = Map::new();
        metadata.insert("generator".into(), Value::String("offline".into()));
        Ok(GeneratedItinerary {
            success: !itinerary.days.is_empty(),
            itinerary,
            text,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DateRange;
    use crate::llm::client::mock::MockLlmClient;

    fn draft() -> TripDraft {
        let mut draft = TripDraft::new();
        draft.vacation_location = Some("Rome, Italy".into());
        draft.duration = Some(3);
        draft.dates = Some(DateRange::new("2025-09-01", Some("2025-09-03".into())));
        draft.set_budget("moderate");
        draft
    }

    #[tokio::test]
    async fn test_offline_generator_builds_days() {
        let generated = OfflineItineraryGenerator.generate(&draft()).await.unwrap();
        assert!(generated.success);
        let days = &generated.itinerary.days;
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date.as_deref(), Some("2025-09-01"));
        assert_eq!(days[2].date.as_deref(), Some("2025-09-03"));
        assert_eq!(days[1].location.as_deref(), Some("Rome, Italy"));
        assert_eq!(generated.itinerary.dates.from.as_deref(), Some("2025-09-01"));
    }

    #[tokio::test]
    async fn test_llm_generator_parses_reply() {
        let reply = "Roman Holiday\nDestination: Rome, Italy\n\nDay 1: Arrival\n- Colosseum\n\nDay 2: Vatican\n- St Peter's\n";
        let llm = Arc::new(MockLlmClient::with_texts(&[reply]));
        let generator = LlmItineraryGenerator::new(llm.clone(), Arc::new(PromptLoader::embedded_only()), 2048);
        let generated = generator.generate(&draft()).await.unwrap();
        assert!(generated.success);
        assert_eq!(generated.itinerary.days.len(), 2);
        assert_eq!(generated.itinerary.title, "Roman Holiday");
        assert!(llm.requests()[0].system_prompt.contains("Destination: Rome, Italy"));
    }

    #[tokio::test]
    async fn test_llm_generator_without_days_is_unsuccessful() {
        let llm = Arc::new(MockLlmClient::with_texts(&["Sorry, I can't help with that."]));
        let generator = LlmItineraryGenerator::new(llm, Arc::new(PromptLoader::embedded_only()), 2048);
        assert!(!generator.generate(&draft()).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_llm_generator_error_propagates() {
        let generator = LlmItineraryGenerator::new(
            Arc::new(MockLlmClient::failing()),
            Arc::new(PromptLoader::embedded_only()),
            2048,
        );
        assert!(matches!(generator.generate(&draft()).await, Err(ProviderError::Llm(_))));
    }
}
