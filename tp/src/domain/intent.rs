//! Intent vocabulary and sanitization

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::matcher::{KeywordTable, Normalized, intent_label_keywords};

/// Closed set of intents the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "Weather-Request")]
    WeatherRequest,
    #[serde(rename = "Find-Hotel")]
    FindHotel,
    #[serde(rename = "Find-Attractions")]
    FindAttractions,
    #[serde(rename = "Find-Restaurants")]
    FindRestaurants,
    #[serde(rename = "Flight-Information")]
    FlightInformation,
    #[serde(rename = "Local-Events")]
    LocalEvents,
    #[serde(rename = "Travel-Restrictions")]
    TravelRestrictions,
    #[serde(rename = "Currency-Conversion")]
    CurrencyConversion,
    #[serde(rename = "Cost-Estimate")]
    CostEstimate,
    #[serde(rename = "Public-Transport-Info")]
    PublicTransportInfo,
    #[serde(rename = "Safety-Information")]
    SafetyInformation,
    #[serde(rename = "Trip-Building")]
    TripBuilding,
    #[serde(rename = "Itinerary-Advice")]
    ItineraryAdvice,
    #[serde(rename = "General-Query")]
    GeneralQuery,
}

/// Coarse grouping of intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "Trip-Building")]
    TripBuilding,
    #[serde(rename = "Advice")]
    Advice,
    #[serde(rename = "Itinerary-Advice")]
    ItineraryAdvice,
    #[serde(rename = "General")]
    General,
}

impl Intent {
    pub const ALL: [Intent; 14] = [
        Intent::WeatherRequest,
        Intent::FindHotel,
        Intent::FindAttractions,
        Intent::FindRestaurants,
        Intent::FlightInformation,
        Intent::LocalEvents,
        Intent::TravelRestrictions,
        Intent::CurrencyConversion,
        Intent::CostEstimate,
        Intent::PublicTransportInfo,
        Intent::SafetyInformation,
        Intent::TripBuilding,
        Intent::ItineraryAdvice,
        Intent::GeneralQuery,
    ];

    /// Canonical label
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::WeatherRequest => "Weather-Request",
            Intent::FindHotel => "Find-Hotel",
            Intent::FindAttractions => "Find-Attractions",
            Intent::FindRestaurants => "Find-Restaurants",
            Intent::FlightInformation => "Flight-Information",
            Intent::LocalEvents => "Local-Events",
            Intent::TravelRestrictions => "Travel-Restrictions",
            Intent::CurrencyConversion => "Currency-Conversion",
            Intent::CostEstimate => "Cost-Estimate",
            Intent::PublicTransportInfo => "Public-Transport-Info",
            Intent::SafetyInformation => "Safety-Information",
            Intent::TripBuilding => "Trip-Building",
            Intent::ItineraryAdvice => "Itinerary-Advice",
            Intent::GeneralQuery => "General-Query",
        }
    }

    /// Exact match against canonical labels
    pub fn from_label(label: &str) -> Option<Intent> {
        Self::ALL.into_iter().find(|i| i.as_str() == label)
    }

    /// Answered with data from an external provider
    pub fn is_external(&self) -> bool {
        !matches!(
            self,
            Intent::TripBuilding | Intent::ItineraryAdvice | Intent::GeneralQuery
        )
    }

    pub fn mode(&self) -> Mode {
        match self {
            Intent::TripBuilding => Mode::TripBuilding,
            Intent::ItineraryAdvice => Mode::ItineraryAdvice,
            Intent::GeneralQuery => Mode::General,
            _ => Mode::Advice,
        }
    }

    /// Short human label used in prompts and replies
    pub fn describe(&self) -> &'static str {
        match self {
            Intent::WeatherRequest => "weather",
            Intent::FindHotel => "hotels",
            Intent::FindAttractions => "attractions",
            Intent::FindRestaurants => "restaurants",
            Intent::FlightInformation => "flights",
            Intent::LocalEvents => "local events",
            Intent::TravelRestrictions => "travel restrictions",
            Intent::CurrencyConversion => "currency conversion",
            Intent::CostEstimate => "cost estimate",
            Intent::PublicTransportInfo => "public transport",
            Intent::SafetyInformation => "safety information",
            Intent::TripBuilding => "trip planning",
            Intent::ItineraryAdvice => "itinerary advice",
            Intent::GeneralQuery => "general question",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn label_table() -> &'static KeywordTable<Intent> {
    static TABLE: OnceLock<KeywordTable<Intent>> = OnceLock::new();
    TABLE.get_or_init(intent_label_keywords)
}

/// Map a raw intent label onto the closed intent set
///
/// Exact match first, then a keyword scan of the lowercased label, then
/// `General-Query`. Never fails.
pub fn sanitize_intent(raw: &str) -> Intent {
    debug!(%raw, "sanitize_intent: called");
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        debug!("sanitize_intent: empty label");
        return Intent::GeneralQuery;
    }
    if let Some(intent) = Intent::from_label(trimmed) {
        debug!(%intent, "sanitize_intent: exact match");
        return intent;
    }
    if let Some(intent) = label_table().first_match(&Normalized::new(trimmed)) {
        debug!(%intent, "sanitize_intent: keyword match");
        return intent;
    }
    warn!(%raw, "Unrecognized intent, defaulting to General-Query");
    Intent::GeneralQuery
}

/// [`sanitize_intent`] over an arbitrary JSON value (non-strings default)
pub fn sanitize_intent_value(raw: &Value) -> Intent {
    match raw {
        Value::String(s) => sanitize_intent(s),
        other => {
            warn!(?other, "Non-string intent, defaulting to General-Query");
            Intent::GeneralQuery
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_labels() {
        for intent in Intent::ALL {
            assert_eq!(sanitize_intent(intent.as_str()), intent);
        }
        assert_eq!(sanitize_intent("  Find-Hotel "), Intent::FindHotel);
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(sanitize_intent("hotel_search"), Intent::FindHotel);
        assert_eq!(sanitize_intent("WeatherForecast"), Intent::WeatherRequest);
        assert_eq!(sanitize_intent("visa-requirements"), Intent::TravelRestrictions);
        assert_eq!(sanitize_intent("plan_trip"), Intent::TripBuilding);
    }

    #[test]
    fn test_default_general_query() {
        assert_eq!(sanitize_intent(""), Intent::GeneralQuery);
        assert_eq!(sanitize_intent("smalltalk"), Intent::GeneralQuery);
        assert_eq!(sanitize_intent_value(&Value::Null), Intent::GeneralQuery);
        assert_eq!(sanitize_intent_value(&serde_json::json!(42)), Intent::GeneralQuery);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Intent::PublicTransportInfo).unwrap();
        assert_eq!(json, "\"Public-Transport-Info\"");
        let back: Intent = serde_json::from_str("\"Cost-Estimate\"").unwrap();
        assert_eq!(back, Intent::CostEstimate);
    }

    #[test]
    fn test_modes() {
        assert_eq!(Intent::TripBuilding.mode(), Mode::TripBuilding);
        assert_eq!(Intent::FindHotel.mode(), Mode::Advice);
        assert!(Intent::WeatherRequest.is_external());
        assert!(!Intent::GeneralQuery.is_external());
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(raw in ".{0,40}") {
            let once = sanitize_intent(&raw);
            prop_assert_eq!(sanitize_intent(once.as_str()), once);
        }
    }
}
