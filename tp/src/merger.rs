//! TripDraftMerger - folds extracted trip fields into the session's draft
//!
//! Merging is incremental: a field changes only when the incoming data carries
//! a usable value for it. Nothing is cleared by omission.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::{DateRange, TripDraft};
use crate::normalize::{Location, parse_date, split_country_suffix};
use crate::requirements::is_empty_value;

/// Fields whose values come from model extraction rather than raw user answers
pub const MODEL_MANAGED_FIELDS: &[&str] = &["vacation_location", "city", "country", "dates", "duration"];

/// Where incoming data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeSource {
    /// Structured extraction attributed to the model
    Model,
    /// A direct answer to a missing-field question
    User,
}

/// Merge behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MergeRules {
    /// Explicit nulls are ignored instead of clearing the field
    pub preserve_context: bool,
    /// User answers may overwrite model-managed fields that already hold a value
    pub merge_user_data: bool,
}

impl Default for MergeRules {
    fn default() -> Self {
        Self {
            preserve_context: true,
            merge_user_data: true,
        }
    }
}

/// Which fields a merge touched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub changed: Vec<String>,
    pub cleared: Vec<String>,
    pub skipped: Vec<String>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.cleared.is_empty()
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Leading integer of a number or a string such as "5 days"
fn as_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            if s == "a week" || s == "one week" || s == "week" {
                return Some(7);
            }
            let digits: String = s.chars().take_while(char::is_ascii_digit).collect();
            let n: u32 = digits.parse().ok()?;
            if s.contains("week") { Some(n * 7) } else { Some(n) }
        }
        _ => None,
    }
}

/// Dates from `{from, to}`, "A to B", "A - B" or a single date string
fn as_dates(value: &Value) -> Option<DateRange> {
    match value {
        Value::Object(obj) => {
            let from = obj.get("from").or_else(|| obj.get("start")).and_then(as_text)?;
            let to = obj.get("to").or_else(|| obj.get("end")).and_then(as_text);
            Some(DateRange::new(from, to))
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            for sep in [" to ", " until ", " - ", " – ", " עד "] {
                if let Some((from, to)) = s.split_once(sep) {
                    return Some(DateRange::new(normalize_date(from), Some(normalize_date(to))));
                }
            }
            Some(DateRange::new(normalize_date(s), None))
        }
        _ => None,
    }
}

fn normalize_date(value: &str) -> String {
    parse_date(value)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| value.trim().to_string())
}

fn incoming_budget(data: &Map<String, Value>) -> Option<String> {
    data.get("budget")
        .and_then(as_text)
        .or_else(|| data.get("budget_level").and_then(as_text))
        .or_else(|| data.get("constraints").and_then(|c| c.get("budget")).and_then(as_text))
}

/// Merge extracted fields into the draft
///
/// Only keys present in `data` with a usable value change the draft, and each
/// changes only its own field. With `preserve_context` off an explicit null
/// clears the field.
pub fn merge_into_draft(draft: &mut TripDraft, data: &Map<String, Value>, rules: MergeRules, source: MergeSource) -> MergeReport {
    debug!(fields = data.len(), ?rules, ?source, "merge_into_draft: called");
    let mut report = MergeReport::default();

    let blocked = |field: &str, already_set: bool| {
        source == MergeSource::User && !rules.merge_user_data && already_set && MODEL_MANAGED_FIELDS.contains(&field)
    };

    // location aliases the model uses interchangeably
    let location = data
        .get("vacation_location")
        .or_else(|| data.get("destination").filter(|_| !data.contains_key("origin")))
        .or_else(|| data.get("location"));

    macro_rules! merge_field {
        ($name:literal, $slot:expr, $incoming:expr, $raw:expr) => {{
            let raw: Option<&Value> = $raw;
            match $incoming {
                Some(value) => {
                    if blocked($name, $slot.is_some()) {
                        debug!(field = $name, "merge_into_draft: user data blocked on model-managed field");
                        report.skipped.push($name.to_string());
                    } else if $slot.as_ref() != Some(&value) {
                        $slot = Some(value);
                        report.changed.push($name.to_string());
                    }
                }
                None => {
                    if !rules.preserve_context && matches!(raw, Some(Value::Null)) && $slot.is_some() {
                        $slot = None;
                        report.cleared.push($name.to_string());
                    }
                }
            }
        }};
    }

    merge_field!("vacation_location", draft.vacation_location, location.and_then(as_text), location);
    merge_field!("city", draft.city, data.get("city").and_then(as_text), data.get("city"));
    merge_field!("country", draft.country, data.get("country").and_then(as_text), data.get("country"));
    merge_field!("duration", draft.duration, data.get("duration").and_then(as_count), data.get("duration"));
    merge_field!("dates", draft.dates, data.get("dates").and_then(as_dates), data.get("dates"));
    merge_field!("travelers", draft.travelers, data.get("travelers").and_then(as_count), data.get("travelers"));
    merge_field!("notes", draft.notes, data.get("notes").and_then(as_text), data.get("notes"));

    if let Some(budget) = incoming_budget(data) {
        if draft.budget.as_deref() != Some(budget.as_str()) {
            draft.set_budget(budget);
            report.changed.push("budget".to_string());
        }
    } else if !rules.preserve_context && matches!(data.get("budget"), Some(Value::Null)) && draft.budget.is_some() {
        draft.budget = None;
        draft.budget_level = None;
        draft.constraints.budget = None;
        report.cleared.push("budget".to_string());
    }

    derive_location(draft, &mut report);
    debug!(?report, "merge_into_draft: done");
    report
}

/// Keep `vacation_location` and `city`/`country` consistent when only one
/// side is known. Never invents a country for a bare city.
fn derive_location(draft: &mut TripDraft, report: &mut MergeReport) {
    if draft.vacation_location.is_none() && (draft.city.is_some() || draft.country.is_some()) {
        let loc = Location {
            city: draft.city.clone(),
            country: draft.country.clone(),
        };
        draft.vacation_location = Some(loc.display());
        report.changed.push("vacation_location".to_string());
        return;
    }
    if let Some(loc) = &draft.vacation_location
        && draft.city.is_none()
        && draft.country.is_none()
    {
        let (city, country) = match loc.split_once(',') {
            Some((city, country)) => (city.trim().to_string(), Some(country.trim().to_string())),
            None => match split_country_suffix(loc) {
                Some((city, country)) => (city, Some(country.to_string())),
                None => (loc.trim().to_string(), None),
            },
        };
        if !city.is_empty() {
            draft.city = Some(city);
            report.changed.push("city".to_string());
        }
        if let Some(country) = country.filter(|c| !c.is_empty()) {
            draft.country = Some(country);
            report.changed.push("country".to_string());
        }
    }
}

/// Merge with default rules from model extraction
pub fn merge(draft: &mut TripDraft, data: &Map<String, Value>) -> MergeReport {
    merge_into_draft(draft, data, MergeRules::default(), MergeSource::Model)
}

/// Does the map carry anything the draft would take
pub fn has_trip_fields(data: &Map<String, Value>) -> bool {
    [
        "vacation_location",
        "destination",
        "location",
        "duration",
        "dates",
        "budget",
        "budget_level",
        "travelers",
    ]
    .iter()
    .any(|k| data.get(*k).is_some_and(|v| !is_empty_value(v)))
}
