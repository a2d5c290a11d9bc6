//! Offline extraction
//!
//! Builds an [`LlmExtraction`] from the raw message with keyword tables and a
//! handful of patterns, for when no model is configured or its reply is
//! unusable. It only reports what the text literally says: a city never gets
//! a country here.

use regex::Regex;
use serde_json::{Map, Value, json};
use std::sync::OnceLock;
use tracing::debug;

use crate::domain::{ConversationState, Intent};
use crate::engine::LlmExtraction;
use crate::matcher::{Matchers, Normalized};
use crate::normalize::{budget_level_for, infer_from_text, normalize_time_context};
use crate::requirements::{compute_missing, enhance_missing, has_requirements};

/// Time phrases, longest first so "next week" wins over "week"
const TIME_PHRASES: &[&str] = &[
    "the day after tomorrow",
    "day after tomorrow",
    "next weekend",
    "this weekend",
    "next week",
    "next month",
    "right now",
    "this morning",
    "this afternoon",
    "this evening",
    "tomorrow",
    "tonight",
    "today",
    "now",
    "weekend",
    "morning",
    "afternoon",
    "evening",
    "סוף השבוע הבא",
    "בשבוע הבא",
    "סוף השבוע",
    "מחרתיים",
    "עכשיו",
    "כרגע",
    "היום",
    "מחר",
];

const CURRENCIES: &[(&str, &[&str])] = &[
    ("USD", &["usd", "dollar", "dollars", "דולר", "דולרים"]),
    ("EUR", &["eur", "euro", "euros", "יורו"]),
    ("GBP", &["gbp", "pound", "pounds", "sterling"]),
    ("ILS", &["ils", "nis", "shekel", "shekels", "שקל", "שקלים"]),
    ("JPY", &["jpy", "yen"]),
    ("CHF", &["chf", "franc", "francs"]),
    ("CAD", &["cad"]),
    ("AUD", &["aud"]),
    ("THB", &["thb", "baht"]),
];

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("valid iso date regex"))
}

fn in_days_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bin\s+(\d{1,2})\s+days?\b").expect("valid in-days regex"))
}

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,3})\s*-?\s*(days?|nights?|weeks?|ימים|לילות|שבועות)").expect("valid duration regex")
    })
}

fn travelers_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,2})\s+(?:people|persons|travell?ers|adults|guests|of us|אנשים|מבוגרים)")
            .expect("valid travelers regex")
    })
}

fn money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:[$€£₪]\s?\d[\d,]*(?:\.\d+)?|\d[\d,]*(?:\.\d+)?\s?(?:usd|eur|dollars|euros|shekels|nis|₪))")
            .expect("valid money regex")
    })
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d+(?:\.\d+)?)\b").expect("valid amount regex"))
}

fn route_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bfrom\s+([\p{L}][\p{L} ]*?)\s+to\s+([\p{L}][\p{L} ]*?)(?:\s+(?:on|in|at|for|next|this|tomorrow|today)\b|[,.?!]|$)")
            .expect("valid route regex")
    })
}

fn place_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:to|in|visit|visiting)\s+(\p{Lu}\p{L}+(?:\s+\p{Lu}\p{L}+)*)").expect("valid place regex")
    })
}

/// First phrase whose tokens appear consecutively in the input
fn find_phrase<'a>(input: &Normalized, phrases: &[&'a str]) -> Option<&'a str> {
    phrases.iter().copied().find(|phrase| {
        let needle = Normalized::new(phrase);
        !needle.tokens.is_empty()
            && input
                .tokens
                .windows(needle.tokens.len())
                .any(|w| w == needle.tokens.as_slice())
    })
}

fn currency_mentions(input: &Normalized) -> Vec<&'static str> {
    let mut found = Vec::new();
    for token in &input.tokens {
        if let Some((code, _)) = CURRENCIES.iter().find(|(_, aliases)| aliases.contains(&token.as_str()))
            && found.last() != Some(code)
        {
            found.push(*code);
        }
    }
    found
}

fn budget_level(input: &Normalized) -> Option<&'static str> {
    let singles = input.tokens.iter().map(|t| t.to_string());
    let pairs = input.tokens.windows(2).flat_map(|w| [format!("{} {}", w[0], w[1]), format!("{}-{}", w[0], w[1])]);
    pairs
        .chain(singles)
        .find_map(|candidate| budget_level_for(&candidate))
        .map(|level| level.as_str())
}

/// Keyword and pattern based extraction
#[derive(Debug, Clone, Default)]
pub struct OfflineExtractor {
    matchers: Matchers,
}

impl OfflineExtractor {
    pub fn new(matchers: Matchers) -> Self {
        Self { matchers }
    }

    /// Extract intent, data, missing fields and a suggested next state
    pub fn extract(&self, message: &str, state: ConversationState) -> LlmExtraction {
        debug!(%state, len = message.len(), "OfflineExtractor::extract: called");
        let input = Normalized::new(message);

        let intent = if self.matchers.intents.matches(Intent::TripBuilding, &input) {
            Intent::TripBuilding
        } else {
            self.matchers.guess_intent(message).unwrap_or(Intent::GeneralQuery)
        };
        let trip_context = intent == Intent::TripBuilding
            || (intent == Intent::GeneralQuery
                && matches!(
                    state,
                    ConversationState::TripBuildingMode | ConversationState::AwaitingUserTripConfirmation
                ));

        let data = if trip_context {
            self.trip_data(message, &input)
        } else {
            self.advice_data(intent, message, &input)
        };

        let mut extraction = LlmExtraction::new(intent, data);
        if intent.is_external() && has_requirements(intent) {
            let missing = enhance_missing(intent, &compute_missing(intent, &extraction.data), &extraction.data);
            let next = if missing.is_empty() {
                ConversationState::FetchingExternalData
            } else {
                ConversationState::AskMissingFields
            };
            debug!(%intent, ?missing, %next, "OfflineExtractor::extract: external intent");
            extraction.missing_fields = Some(missing);
            extraction.next_state = Some(next.as_str().to_string());
        }
        extraction
    }

    fn advice_data(&self, intent: Intent, message: &str, input: &Normalized) -> Map<String, Value> {
        let mut data = Map::new();

        match intent {
            Intent::FlightInformation => {
                if let Some(caps) = route_re().captures(message) {
                    data.insert("origin".into(), json!(caps[1].trim()));
                    data.insert("destination".into(), json!(caps[2].trim()));
                }
            }
            Intent::CurrencyConversion => {
                let currencies = currency_mentions(input);
                if let Some(from) = currencies.first() {
                    data.insert("from_currency".into(), json!(from));
                }
                if let Some(to) = currencies.get(1) {
                    data.insert("to_currency".into(), json!(to));
                }
                if let Some(caps) = amount_re().captures(message) {
                    data.insert("amount".into(), json!(&caps[1]));
                }
            }
            _ => {
                if let Some(location) = infer_from_text(message) {
                    if let Some(city) = location.city {
                        data.insert("city".into(), json!(city));
                    }
                    if let Some(country) = location.country {
                        data.insert("country".into(), json!(country));
                    }
                } else if let Some(caps) = place_re().captures(message) {
                    debug!(place = &caps[1], "advice_data: unknown place taken as city");
                    data.insert("city".into(), json!(&caps[1]));
                }
            }
        }

        let date = iso_date_re().captures(message).map(|c| c[1].to_string());
        let time = find_phrase(input, TIME_PHRASES)
            .map(str::to_string)
            .or_else(|| in_days_re().find(message).map(|m| m.as_str().to_lowercase()));
        match (time, date) {
            (Some(time), date) => {
                data.insert("timeContext".into(), json!(normalize_time_context(&time)));
                data.insert("time".into(), json!(time));
                if let Some(date) = date {
                    data.insert("date".into(), json!(date));
                }
            }
            (None, Some(date)) => {
                data.insert("time".into(), json!(date));
                data.insert("date".into(), json!(date));
            }
            (None, None) => {}
        }
        if intent == Intent::FlightInformation
            && !data.contains_key("date")
            && let Some(time) = data.get("time").cloned()
        {
            data.insert("date".into(), time);
        }

        if let Some(level) = budget_level(input) {
            data.insert("budget_level".into(), json!(level));
        }
        data
    }

    fn trip_data(&self, message: &str, input: &Normalized) -> Map<String, Value> {
        let mut data = Map::new();

        let location = infer_from_text(message)
            .map(|l| l.display())
            .or_else(|| place_re().captures(message).map(|c| c[1].to_string()));
        if let Some(location) = location.filter(|l| !l.is_empty()) {
            data.insert("vacation_location".into(), json!(location));
        }

        if let Some(caps) = duration_re().captures(message) {
            let n: u32 = caps[1].parse().unwrap_or(0);
            let unit = caps[2].to_lowercase();
            let days = if unit.starts_with("week") || unit == "שבועות" { n * 7 } else { n };
            if days > 0 {
                data.insert("duration".into(), json!(days));
            }
        } else if find_phrase(input, &["a week", "one week", "שבוע"]).is_some() {
            data.insert("duration".into(), json!(7));
        }

        let dates: Vec<String> = iso_date_re()
            .captures_iter(message)
            .map(|c| c[1].to_string())
            .collect();
        match dates.as_slice() {
            [] => {}
            [from] => {
                data.insert("dates".into(), json!({"from": from}));
            }
            [from, to, ..] => {
                data.insert("dates".into(), json!({"from": from, "to": to}));
            }
        }

        if let Some(m) = money_re().find(message) {
            data.insert("budget".into(), json!(m.as_str().trim()));
        } else if let Some(level) = budget_level(input) {
            data.insert("budget".into(), json!(level));
        }

        if let Some(caps) = travelers_re().captures(message)
            && let Ok(n) = caps[1].parse::<u32>()
        {
            data.insert("travelers".into(), json!(n));
        }
        debug!(fields = data.len(), "trip_data: done");
        data
    }
}
