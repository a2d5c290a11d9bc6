//! ItineraryDayResolver - turn "day 3" into a concrete date and place
//!
//! Dates and years are resolved through ordered fallback tiers. Any tier past
//! the explicit one is logged and flagged so the caller can ask the user to
//! confirm.

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::domain::{ItineraryDay, StructuredItinerary};
use crate::matcher::parse_day_reference;
use crate::normalize::parse_date;

/// Where a resolved date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// The day's own date field
    Explicit,
    /// Month name and day number in the day's title or date text
    MonthDay,
    /// Trip start date plus the day index
    TripStartOffset,
    /// Nothing to go on
    Unresolved,
}

/// Where the year of a reconstructed date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearSource {
    /// Year of the itinerary's metadata dates
    Explicit,
    /// First plausible year found in the itinerary text
    TextScan,
    /// Month/day already passed this year, so next year
    AssumedNextYear,
    CurrentYear,
}

impl YearSource {
    pub fn is_fallback(&self) -> bool {
        *self != YearSource::Explicit
    }
}

/// A day reference resolved against an itinerary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayResolution {
    pub day_number: u32,
    /// ISO date
    pub date: Option<String>,
    pub location: Option<String>,
    pub date_source: DateSource,
    pub year_source: Option<YearSource>,
    /// A heuristic tier supplied the year
    pub needs_confirmation: bool,
}

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
    ("ינואר", 1),
    ("פברואר", 2),
    ("מרץ", 3),
    ("אפריל", 4),
    ("מאי", 5),
    ("יוני", 6),
    ("יולי", 7),
    ("אוגוסט", 8),
    ("ספטמבר", 9),
    ("אוקטובר", 10),
    ("נובמבר", 11),
    ("דצמבר", 12),
];

const MONTH_PATTERN: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?|ינואר|פברואר|מרץ|אפריל|מאי|יוני|יולי|אוגוסט|ספטמבר|אוקטובר|נובמבר|דצמבר";

fn month_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b({MONTH_PATTERN})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b"))
            .expect("valid month-first regex")
    })
}

fn day_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?ב?({MONTH_PATTERN})\b"))
            .expect("valid day-first regex")
    })
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(20\d{2})\b").expect("valid year regex"))
}

fn place_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:in|at|to)\s+(\p{Lu}[\p{L}'.-]*(?:\s+(?:de\s+|del\s+)?\p{Lu}[\p{L}'.-]*)*)")
            .expect("valid place regex")
    })
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTHS.iter().find(|(m, _)| *m == lower).map(|(_, n)| *n)
}

/// Month and day named in free text
pub fn find_month_day(text: &str) -> Option<(u32, u32)> {
    let (month, day) = if let Some(caps) = month_first_re().captures(text) {
        (month_number(&caps[1])?, caps[2].parse().ok()?)
    } else {
        let caps = day_first_re().captures(text)?;
        (month_number(&caps[2])?, caps[1].parse().ok()?)
    };
    (1..=31).contains(&day).then_some((month, day))
}

/// Resolve the trip year through the fallback tiers
///
/// Explicit metadata dates, then a year in the itinerary text, then next
/// year. The current year is used only when `month_day` does not exist next
/// year (February 29).
pub fn resolve_year(itinerary: &StructuredItinerary, month_day: Option<(u32, u32)>, today: NaiveDate) -> (i32, YearSource) {
    let explicit = [&itinerary.dates.from, &itinerary.dates.to]
        .into_iter()
        .flatten()
        .find_map(|d| parse_date(d));
    if let Some(date) = explicit {
        debug!(year = date.year(), "resolve_year: explicit");
        return (date.year(), YearSource::Explicit);
    }

    if let Some(caps) = year_re().captures(&itinerary.free_text())
        && let Ok(year) = caps[1].parse::<i32>()
    {
        warn!(year, "resolve_year: year taken from itinerary text");
        return (year, YearSource::TextScan);
    }

    let current = today.year();
    let next_exists = month_day.is_none_or(|(month, day)| NaiveDate::from_ymd_opt(current + 1, month, day).is_some());
    if next_exists {
        warn!(year = current + 1, "resolve_year: assuming next year");
        return (current + 1, YearSource::AssumedNextYear);
    }

    warn!(year = current, "resolve_year: falling back to current year");
    (current, YearSource::CurrentYear)
}

/// Trip start date: ISO metadata, or a month/day in the metadata with a resolved year
fn trip_start(itinerary: &StructuredItinerary, today: NaiveDate) -> Option<(NaiveDate, Option<YearSource>)> {
    let from = itinerary.dates.from.as_deref()?;
    if let Some(date) = parse_date(from) {
        return Some((date, None));
    }
    let (month, day) = find_month_day(from)?;
    let (year, source) = resolve_year(itinerary, Some((month, day)), today);
    NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, Some(source)))
}

fn day_location(itinerary: &StructuredItinerary, day: &ItineraryDay) -> Option<String> {
    if let Some(loc) = day.location.as_ref().filter(|l| !l.trim().is_empty()) {
        return Some(loc.trim().to_string());
    }
    if let Some(caps) = place_re().captures(&day.title) {
        return Some(caps[1].trim_end_matches(['.', '-']).to_string());
    }
    itinerary.destination.clone()
}

/// Resolve a natural-language day reference against an itinerary
///
/// Returns None when the text names no day or the day is out of range.
pub fn resolve_day_reference(itinerary: &StructuredItinerary, day_ref: &str, today: NaiveDate) -> Option<DayResolution> {
    debug!(%day_ref, days = itinerary.days.len(), "resolve_day_reference: called");
    let reference = parse_day_reference(day_ref)?;
    let Some(index) = reference.index_in(itinerary.days.len()) else {
        debug!(?reference, "resolve_day_reference: out of range");
        return None;
    };
    let day = &itinerary.days[index];
    let location = day_location(itinerary, day);

    let explicit = day.date.as_deref().and_then(parse_date);
    let month_day = day
        .date
        .as_deref()
        .and_then(find_month_day)
        .or_else(|| find_month_day(&day.title));

    let (date, date_source, year_source) = if let Some(date) = explicit {
        (Some(date), DateSource::Explicit, None)
    } else if let Some((month, dom)) = month_day {
        let (year, source) = resolve_year(itinerary, Some((month, dom)), today);
        match NaiveDate::from_ymd_opt(year, month, dom) {
            Some(date) => (Some(date), DateSource::MonthDay, Some(source)),
            None => (None, DateSource::Unresolved, None),
        }
    } else if let Some((start, source)) = trip_start(itinerary, today) {
        (Some(start + Duration::days(index as i64)), DateSource::TripStartOffset, source)
    } else {
        (None, DateSource::Unresolved, None)
    };

    let needs_confirmation = year_source.is_some_and(|s| s.is_fallback());
    let resolution = DayResolution {
        day_number: day.day_number.max(1),
        date: date.map(|d| d.format("%Y-%m-%d").to_string()),
        location,
        date_source,
        year_source,
        needs_confirmation,
    };
    debug!(?resolution, "resolve_day_reference: done");
    Some(resolution)
}
