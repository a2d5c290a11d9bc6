//! Field normalization for extracted data
//!
//! Pure functions over JSON-shaped extraction data. Each returns a new map and
//! leaves its input untouched.

use serde_json::{Map, Value};
use tracing::debug;

use super::location::{canonical_country, split_country_suffix};
use crate::domain::BudgetLevel;

/// Budget synonyms per canonical level
const BUDGET_SYNONYMS: &[(BudgetLevel, &[&str])] = &[
    (
        BudgetLevel::Cheap,
        &[
            "cheap",
            "budget",
            "affordable",
            "economical",
            "economy",
            "low",
            "low-cost",
            "low cost",
            "inexpensive",
            "backpacker",
            "זול",
            "חסכוני",
        ],
    ),
    (
        BudgetLevel::Moderate,
        &[
            "moderate",
            "mid",
            "mid-range",
            "midrange",
            "medium",
            "average",
            "standard",
            "reasonable",
            "normal",
            "בינוני",
        ],
    ),
    (
        BudgetLevel::Luxury,
        &[
            "luxury",
            "luxurious",
            "expensive",
            "high",
            "high-end",
            "premium",
            "upscale",
            "deluxe",
            "lavish",
            "5-star",
            "five star",
            "יוקרתי",
            "יקר",
        ],
    ),
];

/// Map a budget synonym onto its canonical level
pub fn budget_level_for(value: &str) -> Option<BudgetLevel> {
    let lower = value.trim().to_lowercase();
    BUDGET_SYNONYMS
        .iter()
        .find(|(_, words)| words.contains(&lower.as_str()))
        .map(|(level, _)| *level)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Split a combined `location` into `city`/`country`
///
/// Only runs when `location` is a string and both `city` and `country` are
/// absent. "City, Country" splits on the comma; otherwise trailing words that
/// name a known country become the country; otherwise the whole string is the
/// city. `location` itself is kept.
pub fn split_location(data: &Map<String, Value>) -> Map<String, Value> {
    let mut out = data.clone();
    let Some(location) = data.get("location").and_then(Value::as_str) else {
        return out;
    };
    if !is_blank(data.get("city")) || !is_blank(data.get("country")) {
        debug!("split_location: city or country already present");
        return out;
    }
    let location = location.trim();
    if location.is_empty() {
        return out;
    }

    if let Some((city, country)) = location.split_once(',') {
        let city = city.trim();
        let country = country.trim();
        debug!(%city, %country, "split_location: comma split");
        if !city.is_empty() {
            out.insert("city".into(), Value::String(city.to_string()));
        }
        if !country.is_empty() {
            let country = canonical_country(country).map(str::to_string).unwrap_or(country.to_string());
            out.insert("country".into(), Value::String(country));
        }
    } else if let Some((city, country)) = split_country_suffix(location) {
        debug!(%city, %country, "split_location: country suffix");
        out.insert("city".into(), Value::String(city));
        out.insert("country".into(), Value::String(country.to_string()));
    } else {
        debug!(%location, "split_location: whole string as city");
        out.insert("city".into(), Value::String(location.to_string()));
    }
    out
}

/// Canonicalize budget vocabulary in `budget_level`, `budget` and
/// `constraints.budget`
///
/// Recognized synonyms become `cheap`/`moderate`/`luxury`; anything else
/// passes through unchanged.
pub fn standardize_budget(data: &Map<String, Value>) -> Map<String, Value> {
    let mut out = data.clone();
    for key in ["budget_level", "budget"] {
        if let Some(Value::String(raw)) = data.get(key)
            && let Some(level) = budget_level_for(raw)
        {
            debug!(%key, %raw, %level, "standardize_budget: canonicalized");
            out.insert(key.into(), Value::String(level.as_str().to_string()));
        }
    }
    if let Some(Value::Object(constraints)) = data.get("constraints") {
        out.insert("constraints".into(), Value::Object(standardize_budget(constraints)));
    }
    out
}

/// Drop null/empty values recursively
///
/// Removes keys whose value is null or an empty string, filters empty
/// elements out of arrays, and drops objects/arrays that end up empty.
pub fn validate_and_clean(data: &Map<String, Value>) -> Map<String, Value> {
    data.iter()
        .filter_map(|(k, v)| clean_value(v).map(|v| (k.clone(), v)))
        .collect()
}

fn clean_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::Array(items) => {
            let cleaned: Vec<Value> = items.iter().filter_map(clean_value).collect();
            (!cleaned.is_empty()).then_some(Value::Array(cleaned))
        }
        Value::Object(map) => {
            let cleaned = validate_and_clean(map);
            (!cleaned.is_empty()).then_some(Value::Object(cleaned))
        }
        other => Some(other.clone()),
    }
}

/// Full normalization pass: clean, split location, canonicalize budget
pub fn normalize(data: &Map<String, Value>) -> Map<String, Value> {
    standardize_budget(&split_location(&validate_and_clean(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_split_location_comma() {
        let out = split_location(&map(json!({"location": "Rome, Italy"})));
        assert_eq!(out["city"], json!("Rome"));
        assert_eq!(out["country"], json!("Italy"));
        assert_eq!(out["location"], json!("Rome, Italy"));
    }

    #[test]
    fn test_split_location_country_suffix() {
        let out = split_location(&map(json!({"location": "Tel Aviv Israel"})));
        assert_eq!(out["city"], json!("Tel Aviv"));
        assert_eq!(out["country"], json!("Israel"));
    }

    #[test]
    fn test_split_location_whole_string_city() {
        let out = split_location(&map(json!({"location": "Springfield"})));
        assert_eq!(out["city"], json!("Springfield"));
        assert!(out.get("country").is_none());

        let out = split_location(&map(json!({"location": "France"})));
        assert_eq!(out["city"], json!("France"));
        assert!(out.get("country").is_none());
    }

    #[test]
    fn test_split_location_skipped_when_city_present() {
        let out = split_location(&map(json!({"location": "Rome, Italy", "city": "Milan"})));
        assert_eq!(out["city"], json!("Milan"));
        assert!(out.get("country").is_none());
    }

    #[test]
    fn test_standardize_budget_synonyms() {
        let out = standardize_budget(&map(json!({"budget_level": "expensive"})));
        assert_eq!(out["budget_level"], json!("luxury"));
        let out = standardize_budget(&map(json!({"budget": "Affordable"})));
        assert_eq!(out["budget"], json!("cheap"));
        let out = standardize_budget(&map(json!({"constraints": {"budget": "mid-range"}})));
        assert_eq!(out["constraints"]["budget"], json!("moderate"));
    }

    #[test]
    fn test_standardize_budget_is_stable() {
        let once = standardize_budget(&map(json!({"budget_level": "expensive"})));
        let twice = standardize_budget(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_standardize_budget_passes_unknown_through() {
        let out = standardize_budget(&map(json!({"budget": "2000 USD", "budget_level": 3})));
        assert_eq!(out["budget"], json!("2000 USD"));
        assert_eq!(out["budget_level"], json!(3));
    }

    #[test]
    fn test_validate_and_clean() {
        let input = map(json!({
            "city": "Paris",
            "country": "",
            "time": null,
            "tags": ["", "museum", null],
            "dates": {"from": null, "to": ""},
            "travelers": 0
        }));
        let out = validate_and_clean(&input);
        assert_eq!(out["city"], json!("Paris"));
        assert_eq!(out["tags"], json!(["museum"]));
        assert_eq!(out["travelers"], json!(0));
        assert!(out.get("country").is_none());
        assert!(out.get("time").is_none());
        assert!(out.get("dates").is_none());
        // input untouched
        assert_eq!(input["country"], json!(""));
    }
}
