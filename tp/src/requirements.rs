//! Field requirement registry
//!
//! Static required/optional field tables per intent, plus the missing-field
//! computation the state machine uses to decide between asking and acting.

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::Intent;

/// Required fields for an intent, in the order they are asked for
pub fn required_fields(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::WeatherRequest => &["city", "country", "time"],
        Intent::FindHotel => &["city", "country", "budget_level"],
        Intent::FindAttractions => &["city", "country"],
        Intent::FindRestaurants => &["city", "country"],
        Intent::FlightInformation => &["origin", "destination", "date"],
        Intent::LocalEvents => &["city", "country", "time"],
        Intent::TravelRestrictions => &["country"],
        Intent::CurrencyConversion => &["from_currency", "to_currency"],
        Intent::CostEstimate => &["city", "country"],
        Intent::PublicTransportInfo => &["city", "country"],
        Intent::SafetyInformation => &["country"],
        Intent::TripBuilding => &["vacation_location", "duration", "dates", "budget"],
        Intent::ItineraryAdvice | Intent::GeneralQuery => &[],
    }
}

/// Optional fields an intent can use when present
pub fn optional_fields(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::WeatherRequest => &["timeContext", "date"],
        Intent::FindHotel => &["dates", "travelers"],
        Intent::FindAttractions => &["time", "interests"],
        Intent::FindRestaurants => &["cuisine", "budget_level"],
        Intent::FlightInformation => &["return_date", "travelers"],
        Intent::LocalEvents => &["timeContext", "date"],
        Intent::TravelRestrictions => &["nationality"],
        Intent::CurrencyConversion => &["amount"],
        Intent::CostEstimate => &["duration", "budget_level", "travelers"],
        Intent::PublicTransportInfo => &["origin", "destination"],
        Intent::SafetyInformation => &["city"],
        Intent::TripBuilding => &["travelers", "notes", "city", "country"],
        Intent::ItineraryAdvice | Intent::GeneralQuery => &[],
    }
}

/// Does the intent have a registry entry at all
pub fn has_requirements(intent: Intent) -> bool {
    !required_fields(intent).is_empty()
}

/// Null, empty string, empty array/object, or an object whose values are all empty
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.iter().all(is_empty_value),
        Value::Object(o) => o.values().all(is_empty_value),
        _ => false,
    }
}

/// Required fields whose value in `data` is absent or empty, in registry order
pub fn compute_missing(intent: Intent, data: &Map<String, Value>) -> Vec<String> {
    let missing: Vec<String> = required_fields(intent)
        .iter()
        .filter(|field| data.get(**field).is_none_or(is_empty_value))
        .map(|field| field.to_string())
        .collect();
    debug!(%intent, ?missing, "compute_missing: done");
    missing
}

/// Is a budget already known from the data (any of its spellings)
pub fn budget_resolvable(data: &Map<String, Value>) -> bool {
    let present = |key: &str| data.get(key).is_some_and(|v| !is_empty_value(v));
    present("budget")
        || present("budget_level")
        || data
            .get("constraints")
            .and_then(|c| c.get("budget"))
            .is_some_and(|v| !is_empty_value(v))
}

/// Apply the date/budget batching rule to a missing-field list
///
/// For trip building, whenever dates are being asked for, the budget is asked
/// for in the same turn unless the data already resolves it.
pub fn enhance_missing(intent: Intent, missing: &[String], data: &Map<String, Value>) -> Vec<String> {
    let mut enhanced = missing.to_vec();
    if intent != Intent::TripBuilding {
        return enhanced;
    }
    let asks_dates = enhanced.iter().any(|f| f == "dates" || f == "date");
    let has_budget = enhanced.iter().any(|f| f == "budget");
    if asks_dates && !has_budget && !budget_resolvable(data) {
        debug!("enhance_missing: batching budget with dates");
        enhanced.push("budget".to_string());
    }
    enhanced
}

/// Human wording for a field name
pub fn field_label(field: &str) -> &str {
    match field {
        "city" => "which city",
        "country" => "which country",
        "time" => "when (today, tomorrow, a date...)",
        "budget_level" | "budget" => "your budget (cheap, moderate or luxury)",
        "vacation_location" => "where you'd like to go",
        "duration" => "how many days",
        "dates" | "date" => "your travel dates",
        "origin" => "where you're flying from",
        "destination" => "where you're flying to",
        "from_currency" => "the currency you have",
        "to_currency" => "the currency you need",
        other => other,
    }
}
