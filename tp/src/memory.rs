//! ConversationMemory - per-session recall of recent intents and entities
//!
//! Keeps a bounded most-recent-first intent history, the last known value of
//! each entity sub-field, and a per-intent interaction record. Everything is
//! dropped on reset or once the memory has not been touched for the TTL.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

use crate::domain::Intent;
use crate::requirements::is_empty_value;

pub const DEFAULT_CAPACITY: usize = 10;
pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationEntity {
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntity {
    pub time: Option<String>,
    pub time_context: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetEntity {
    pub budget: Option<String>,
    pub budget_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripEntity {
    pub vacation_location: Option<String>,
    pub duration: Option<Value>,
    pub dates: Option<Value>,
}

/// Last known value per entity sub-field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    pub location: LocationEntity,
    pub time: TimeEntity,
    pub budget: BudgetEntity,
    pub trip: TripEntity,
}

/// What was last seen for one intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentContext {
    pub data: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMemory {
    intents: VecDeque<Intent>,
    entities: Entities,
    context: HashMap<Intent, IntentContext>,
    last_updated: Option<DateTime<Utc>>,
    #[serde(skip, default = "default_capacity")]
    capacity: usize,
    #[serde(skip, default = "default_ttl")]
    ttl: Duration,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_ttl() -> Duration {
    Duration::hours(DEFAULT_TTL_HOURS)
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL_HOURS)
    }
}

fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_field(data: &Map<String, Value>, key: &str) -> Option<Value> {
    data.get(key).filter(|v| !is_empty_value(v)).cloned()
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl ConversationMemory {
    pub fn new(capacity: usize, ttl_hours: i64) -> Self {
        Self {
            intents: VecDeque::with_capacity(capacity),
            entities: Entities::default(),
            context: HashMap::new(),
            last_updated: None,
            capacity: capacity.max(1),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Recent intents, most recent first
    pub fn intents(&self) -> impl Iterator<Item = Intent> + '_ {
        self.intents.iter().copied()
    }

    pub fn last_intent(&self) -> Option<Intent> {
        self.intents.front().copied()
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub fn context_for(&self, intent: Intent) -> Option<&IntentContext> {
        self.context.get(&intent)
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn is_empty(&self) -> bool {
        self.last_updated.is_none()
    }

    /// Record one turn's intent and extracted data
    pub fn record(&mut self, intent: Intent, data: &Map<String, Value>, now: DateTime<Utc>) {
        debug!(%intent, fields = data.len(), "ConversationMemory::record: called");
        self.intents.push_front(intent);
        self.intents.truncate(self.capacity);
        self.update_entities(data);

        let entry = self.context.entry(intent).or_insert_with(|| IntentContext {
            data: Map::new(),
            timestamp: now,
            count: 0,
        });
        for (k, v) in data {
            if !is_empty_value(v) {
                entry.data.insert(k.clone(), v.clone());
            }
        }
        entry.timestamp = now;
        entry.count += 1;
        self.last_updated = Some(now);
    }

    /// Last-write-wins per sub-field; absent values never clear a sub-field
    fn update_entities(&mut self, data: &Map<String, Value>) {
        let e = &mut self.entities;
        overwrite(&mut e.location.city, string_field(data, "city"));
        overwrite(&mut e.location.country, string_field(data, "country"));
        overwrite(&mut e.time.time, string_field(data, "time"));
        overwrite(&mut e.time.time_context, string_field(data, "timeContext"));
        overwrite(&mut e.time.date, string_field(data, "date"));
        overwrite(&mut e.budget.budget, string_field(data, "budget"));
        overwrite(&mut e.budget.budget_level, string_field(data, "budget_level"));
        overwrite(&mut e.trip.vacation_location, string_field(data, "vacation_location"));
        overwrite(&mut e.trip.duration, value_field(data, "duration"));
        overwrite(&mut e.trip.dates, value_field(data, "dates"));
    }

    /// Remembered values useful for an intent, keyed by field name
    ///
    /// Location comes back as a unit: both city and country, or neither.
    pub fn relevant_context(&self, intent: Intent) -> Map<String, Value> {
        let mut out = Map::new();
        let e = &self.entities;
        let needs = |field: &str| {
            crate::requirements::required_fields(intent).contains(&field)
                || crate::requirements::optional_fields(intent).contains(&field)
        };

        if needs("city")
            && let (Some(city), Some(country)) = (&e.location.city, &e.location.country)
        {
            out.insert("city".into(), Value::String(city.clone()));
            out.insert("country".into(), Value::String(country.clone()));
        }
        if needs("budget_level")
            && let Some(level) = e.budget.budget_level.as_ref().or(e.budget.budget.as_ref())
        {
            out.insert("budget_level".into(), Value::String(level.clone()));
        }
        if intent == Intent::TripBuilding {
            if let Some(loc) = &e.trip.vacation_location {
                out.insert("vacation_location".into(), Value::String(loc.clone()));
            }
            if let Some(d) = &e.trip.duration {
                out.insert("duration".into(), d.clone());
            }
            if let Some(d) = &e.trip.dates {
                out.insert("dates".into(), d.clone());
            }
            if let Some(b) = &e.budget.budget {
                out.insert("budget".into(), Value::String(b.clone()));
            }
        }
        debug!(%intent, fields = out.len(), "ConversationMemory::relevant_context: done");
        out
    }

    /// Untouched for longer than the TTL
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.last_updated.is_some_and(|t| now - t > self.ttl)
    }

    /// Reset when stale; returns whether it did
    pub fn expire_if_stale(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_stale(now) {
            info!(last_updated = ?self.last_updated, "ConversationMemory: stale, resetting");
            self.reset();
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        debug!("ConversationMemory::reset: called");
        self.intents.clear();
        self.entities = Entities::default();
        self.context.clear();
        self.last_updated = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_intents_capped_most_recent_first() {
        let mut memory = ConversationMemory::default();
        for i in 0..12 {
            let intent = if i % 2 == 0 { Intent::FindHotel } else { Intent::WeatherRequest };
            memory.record(intent, &Map::new(), t0());
        }
        let intents: Vec<Intent> = memory.intents().collect();
        assert_eq!(intents.len(), 10);
        assert_eq!(intents[0], Intent::WeatherRequest);
        assert_eq!(memory.context_for(Intent::FindHotel).unwrap().count, 6);
    }

    #[test]
    fn test_entities_last_write_wins_per_subfield() {
        let mut memory = ConversationMemory::default();
        memory.record(Intent::WeatherRequest, &map(json!({"city": "Paris", "country": "France"})), t0());
        memory.record(Intent::FindHotel, &map(json!({"city": "Lyon", "budget_level": "cheap"})), t0());
        let loc = &memory.entities().location;
        assert_eq!(loc.city.as_deref(), Some("Lyon"));
        assert_eq!(loc.country.as_deref(), Some("France"));
        assert_eq!(memory.entities().budget.budget_level.as_deref(), Some("cheap"));
    }

    #[test]
    fn test_relevant_context_location_as_unit() {
        let mut memory = ConversationMemory::default();
        memory.record(Intent::WeatherRequest, &map(json!({"city": "Paris"})), t0());
        assert!(memory.relevant_context(Intent::FindAttractions).is_empty());

        memory.record(Intent::WeatherRequest, &map(json!({"country": "France"})), t0());
        let ctx = memory.relevant_context(Intent::FindHotel);
        assert_eq!(ctx["city"], json!("Paris"));
        assert_eq!(ctx["country"], json!("France"));
    }

    #[test]
    fn test_relevant_context_budget_only_where_used() {
        let mut memory = ConversationMemory::default();
        memory.record(Intent::FindHotel, &map(json!({"budget_level": "luxury"})), t0());
        assert_eq!(memory.relevant_context(Intent::FindHotel)["budget_level"], json!("luxury"));
        assert!(memory.relevant_context(Intent::SafetyInformation).get("budget_level").is_none());
    }

    #[test]
    fn test_staleness_resets() {
        let mut memory = ConversationMemory::default();
        memory.record(Intent::FindHotel, &map(json!({"city": "Rome"})), t0());
        assert!(!memory.expire_if_stale(t0() + Duration::hours(23)));
        assert!(memory.expire_if_stale(t0() + Duration::hours(25)));
        assert!(memory.is_empty());
        assert!(memory.entities().location.city.is_none());
    }
}
