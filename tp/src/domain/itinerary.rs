//! Structured itinerary parsed from the model's free-text itinerary

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

use super::{DateRange, TripDraft};

/// One day of an itinerary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub day_number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Parsed itinerary; read-only after parsing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredItinerary {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default)]
    pub dates: DateRange,
    #[serde(default)]
    pub days: Vec<ItineraryDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

fn day_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:#+\s*)?(?:\*\*)?\s*(?:day|יום)\s+(\d{1,2})\b\s*[:.\-–—]?\s*(.*?)\s*(?:\*\*)?\s*$")
            .expect("valid day header regex")
    })
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("valid iso date regex"))
}

fn field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:[-*•]\s*)?(?:\*\*)?(destination|duration|dates?|location|additional info|tips|notes)(?:\*\*)?\s*:\s*(?:\*\*)?\s*(.*)$")
            .expect("valid field regex")
    })
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.*)$").expect("valid bullet regex"))
}

fn clean_heading(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Header,
    Day,
    Additional,
}

impl StructuredItinerary {
    /// Parse free text into a structured itinerary
    ///
    /// Recognizes `Day N` headers (English or Hebrew, optionally markdown
    /// headings or bold), `Destination:`/`Dates:`/`Duration:` metadata lines,
    /// per-day `Date:`/`Location:` lines, bullets as activities, and an
    /// `Additional Info`/`Tips`/`Notes` trailer.
    pub fn parse(text: &str) -> Self {
        debug!(len = text.len(), "StructuredItinerary::parse: called");
        let mut itinerary = StructuredItinerary::default();
        let mut section = Section::Header;
        let mut additional: Vec<String> = Vec::new();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = day_header_re().captures(line) {
                let day_number = caps[1].parse().unwrap_or(itinerary.days.len() as u32 + 1);
                let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                let date = iso_date_re().captures(rest).map(|c| c[1].to_string());
                debug!(day_number, ?date, "StructuredItinerary::parse: day header");
                itinerary.days.push(ItineraryDay {
                    day_number,
                    title: clean_heading(line),
                    date,
                    activities: Vec::new(),
                    location: None,
                });
                section = Section::Day;
                continue;
            }

            if let Some(caps) = field_re().captures(line) {
                let key = caps[1].to_lowercase();
                let value = caps[2].trim().trim_matches('*').trim().to_string();
                match (key.as_str(), section) {
                    ("additional info" | "tips" | "notes", _) => {
                        section = Section::Additional;
                        if !value.is_empty() {
                            additional.push(value);
                        }
                        continue;
                    }
                    ("destination", Section::Header) => {
                        itinerary.destination = Some(value);
                        continue;
                    }
                    ("duration", Section::Header) => {
                        itinerary.duration = value.split_whitespace().next().and_then(|n| n.parse().ok());
                        continue;
                    }
                    ("dates" | "date", Section::Header) => {
                        let found: Vec<String> = iso_date_re()
                            .captures_iter(&value)
                            .map(|c| c[1].to_string())
                            .collect();
                        itinerary.dates.from = found.first().cloned();
                        itinerary.dates.to = found.get(1).cloned();
                        continue;
                    }
                    ("date" | "dates", Section::Day) => {
                        if let Some(day) = itinerary.days.last_mut() {
                            day.date = Some(value);
                        }
                        continue;
                    }
                    ("location", Section::Day) => {
                        if let Some(day) = itinerary.days.last_mut() {
                            day.location = Some(value);
                        }
                        continue;
                    }
                    _ => {}
                }
            }

            match section {
                Section::Header => {
                    if itinerary.title.is_empty() {
                        itinerary.title = clean_heading(line);
                    } else {
                        additional.push(line.to_string());
                    }
                }
                Section::Day => {
                    let activity = bullet_re()
                        .captures(line)
                        .map(|c| c[1].trim().to_string())
                        .unwrap_or_else(|| line.to_string());
                    if let Some(day) = itinerary.days.last_mut() {
                        day.activities.push(activity);
                    }
                }
                Section::Additional => additional.push(line.to_string()),
            }
        }

        if !additional.is_empty() {
            itinerary.additional_info = Some(additional.join("\n"));
        }
        if itinerary.duration.is_none() && !itinerary.days.is_empty() {
            itinerary.duration = Some(itinerary.days.len() as u32);
        }
        debug!(days = itinerary.days.len(), "StructuredItinerary::parse: done");
        itinerary
    }

    /// Parse text, then fill metadata the text left out from the trip draft
    pub fn parse_with_draft(text: &str, draft: &TripDraft) -> Self {
        let mut itinerary = Self::parse(text);
        if itinerary.destination.is_none() {
            itinerary.destination = draft.vacation_location.clone();
        }
        if itinerary.dates.is_empty()
            && let Some(dates) = &draft.dates
        {
            itinerary.dates = dates.clone();
        }
        if itinerary.duration.is_none() {
            itinerary.duration = draft.duration;
        }
        itinerary
    }

    /// All free text carried by the itinerary (used for year scanning)
    pub fn free_text(&self) -> String {
        let mut parts = vec![self.title.clone()];
        for day in &self.days {
            parts.push(day.title.clone());
            parts.extend(day.activities.iter().cloned());
        }
        if let Some(info) = &self.additional_info {
            parts.push(info.clone());
        }
        parts.join("\n")
    }

    /// Render back to readable text
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        if let Some(dest) = &self.destination {
            out.push_str(&format!("Destination: {}\n", dest));
        }
        for day in &self.days {
            out.push('\n');
            out.push_str(&day.title);
            out.push('\n');
            for activity in &day.activities {
                out.push_str(&format!("- {}\n", activity));
            }
        }
        if let Some(info) = &self.additional_info {
            out.push_str(&format!("\nAdditional Info: {}\n", info));
        }
        out
    }
}
