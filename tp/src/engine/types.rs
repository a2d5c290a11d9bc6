//! Engine inputs and outputs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{
    AdviceRequest, ConversationState, Intent, MissingFieldsState, Mode, StructuredItinerary, TripDraft,
};
use crate::itinerary::DayResolution;
use crate::machine::Transition;
use crate::memory::ConversationMemory;

fn object_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ),
        Some(Value::String(s)) if !s.trim().is_empty() => {
            Some(s.split(',').map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect())
        }
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

/// What the classifier made of one user message
///
/// Every field is optional on the wire; malformed parts deserialize to empty
/// rather than failing the whole extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmExtraction {
    #[serde(default)]
    pub intent: Value,

    #[serde(default, deserialize_with = "object_or_empty")]
    pub data: Map<String, Value>,

    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(
        default,
        rename = "missingFields",
        alias = "missing_fields",
        deserialize_with = "lenient_strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub missing_fields: Option<Vec<String>>,

    #[serde(
        default,
        alias = "nextState",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_state: Option<String>,

    #[serde(
        default,
        alias = "nextAction",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_action: Option<String>,
}

impl LlmExtraction {
    pub fn new(intent: Intent, data: Map<String, Value>) -> Self {
        Self {
            intent: Value::String(intent.as_str().to_string()),
            data,
            ..Self::default()
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_next_state(mut self, state: ConversationState) -> Self {
        self.next_state = Some(state.as_str().to_string());
        self
    }

    pub fn with_missing(mut self, fields: &[&str]) -> Self {
        self.missing_fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Model-written reply, if it wrote a non-blank one
    pub fn reply(&self) -> Option<&str> {
        self.response.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }
}

/// A question parked in AWAITING_MISSING_INFO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInfo {
    pub intent: Intent,
    pub fields: Vec<String>,
    pub question: String,
}

/// Everything the engine keeps for one conversation between turns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub state: ConversationState,
    pub draft: TripDraft,
    /// Frozen copy shown to the user for confirmation
    pub draft_snapshot: Option<TripDraft>,
    pub awaiting_confirmation: bool,
    pub memory: ConversationMemory,
    /// The single in-flight field collection
    pub missing: Option<MissingFieldsState>,
    pub advice: Option<AdviceRequest>,
    pub itinerary: Option<StructuredItinerary>,
    pub itinerary_text: Option<String>,
    pub last_intent: Option<Intent>,
    pub mode: Option<Mode>,
    pub last_day_context: Option<DayResolution>,
    pub pending_info: Option<PendingInfo>,
}

impl SessionState {
    pub fn new(memory: ConversationMemory) -> Self {
        Self {
            memory,
            ..Self::default()
        }
    }

    /// Drop the trip, any collection and the itinerary; memory survives
    pub fn start_over(&mut self) {
        self.draft = TripDraft::new();
        self.draft_snapshot = None;
        self.awaiting_confirmation = false;
        self.missing = None;
        self.advice = None;
        self.itinerary = None;
        self.itinerary_text = None;
        self.last_intent = None;
        self.mode = None;
        self.last_day_context = None;
        self.pending_info = None;
    }

    /// Drop any in-flight collection
    pub fn clear_collection(&mut self) {
        self.missing = None;
        self.advice = None;
        self.pending_info = None;
    }
}

/// Recoverable problems met during a turn
///
/// None of these end the turn; each comes with a valid next state and a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnError {
    #[error("missing required fields: {}", fields.join(", "))]
    MissingRequiredField { fields: Vec<String> },

    #[error("incomplete location data for {intent}")]
    IncompleteLocationData { intent: Intent },

    #[error("unrecognized intent '{raw}', treated as General-Query")]
    UnknownIntent { raw: String },

    #[error("external fetch failed: {message}")]
    ExternalFetchFailure { message: String },

    #[error("itinerary generation failed: {message}")]
    ItineraryGenerationFailure { message: String },

    #[error("unrecognized next state '{name}', derived locally")]
    StateTransitionAmbiguous { name: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnFlags {
    pub beyond_forecast_horizon: bool,
    /// The external provider was actually called
    pub fetched: bool,
    /// A day's date rests on a guessed year
    pub needs_year_confirmation: bool,
}

/// Result of one processed turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub next_state: ConversationState,
    pub response: String,
    pub intent: Intent,
    pub transitions: Vec<Transition>,
    pub updated_draft: TripDraft,
    pub updated_memory: ConversationMemory,
    /// Normalized data the turn acted on
    pub data: Map<String, Value>,
    /// Prompt-ready block for the composer
    pub external_context: Option<String>,
    pub missing_fields: Vec<String>,
    pub advice: Option<AdviceRequest>,
    pub day_context: Option<DayResolution>,
    pub itinerary: Option<StructuredItinerary>,
    pub errors: Vec<TurnError>,
    pub duplicate_suppressed: bool,
    pub flags: TurnFlags,
}

impl TurnOutcome {
    pub fn has_error(&self, pred: impl Fn(&TurnError) -> bool) -> bool {
        self.errors.iter().any(pred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extraction_from_model_json() {
        let raw = json!({
            "intent": "Weather-Request",
            "data": {"city": "Paris", "time": "tomorrow"},
            "response": "Which country?",
            "missingFields": ["country"],
            "next_state": "ASK_MISSING_FIELDS"
        });
        let extraction: LlmExtraction = serde_json::from_value(raw).unwrap();
        assert_eq!(extraction.intent, json!("Weather-Request"));
        assert_eq!(extraction.data["city"], "Paris");
        assert_eq!(extraction.missing_fields, Some(vec!["country".to_string()]));
        assert_eq!(extraction.next_state.as_deref(), Some("ASK_MISSING_FIELDS"));
        assert_eq!(extraction.reply(), Some("Which country?"));
    }

    #[test]
    fn test_extraction_is_lenient() {
        let raw = json!({
            "intent": 7,
            "data": null,
            "response": "  ",
            "missing_fields": "city, country",
            "nextState": 3
        });
        let extraction: LlmExtraction = serde_json::from_value(raw).unwrap();
        assert!(extraction.data.is_empty());
        assert_eq!(extraction.reply(), None);
        assert_eq!(
            extraction.missing_fields,
            Some(vec!["city".to_string(), "country".to_string()])
        );
        assert!(extraction.next_state.is_none());

        let empty: LlmExtraction = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, LlmExtraction::default());
    }

    #[test]
    fn test_start_over_keeps_memory() {
        let mut session = SessionState::default();
        session.draft.vacation_location = Some("Rome".into());
        session.awaiting_confirmation = true;
        session.memory.record(Intent::FindHotel, &Map::new(), chrono::Utc::now());
        session.start_over();
        assert!(session.draft.vacation_location.is_none());
        assert!(!session.awaiting_confirmation);
        assert!(!session.memory.is_empty());
    }

    #[test]
    fn test_turn_error_serializes_with_kind() {
        let err = TurnError::MissingRequiredField {
            fields: vec!["country".into()],
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "missing_required_field");
        assert_eq!(err.to_string(), "missing required fields: country");
    }
}
