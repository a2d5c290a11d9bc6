//! Relative date resolution and forecast horizon

use chrono::{DateTime, Datelike, Duration, Local, Months, NaiveDate, Utc, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Source of "now" for everything date dependent
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;

    /// Local calendar date, midnight aligned
    fn today(&self) -> NaiveDate;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Noon UTC on the given day
    pub fn on(date: NaiveDate) -> Self {
        let now = date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc();
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

pub const ISO_FORMAT: &str = "%Y-%m-%d";

const GENERIC_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

fn in_days_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^in\s+(\d{1,3})\s+days?$").expect("valid in-days regex"))
}

/// Parse a strict `YYYY-MM-DD`
pub fn parse_iso(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), ISO_FORMAT).ok()
}

/// Parse ISO or one of the common written formats
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    parse_iso(value).or_else(|| {
        GENERIC_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    })
}

/// Upcoming Saturday; today when today is already the weekend
fn upcoming_weekend(today: NaiveDate) -> NaiveDate {
    match today.weekday() {
        Weekday::Sat | Weekday::Sun => today,
        day => today + Duration::days(5 - day.num_days_from_monday() as i64),
    }
}

/// The following weekend's Saturday
fn next_weekend(today: NaiveDate) -> NaiveDate {
    let this = upcoming_weekend(today);
    let saturday = if this.weekday() == Weekday::Sun {
        this - Duration::days(1)
    } else {
        this
    };
    saturday + Duration::days(7)
}

fn relative_date(term: &str, today: NaiveDate) -> Option<NaiveDate> {
    let date = match term {
        "today" | "now" | "tonight" | "היום" => today,
        "tomorrow" | "מחר" => today + Duration::days(1),
        "day after tomorrow" | "the day after tomorrow" | "מחרתיים" => today + Duration::days(2),
        "next week" | "בשבוע הבא" | "שבוע הבא" => today + Duration::days(7),
        "next month" | "בחודש הבא" | "חודש הבא" => today.checked_add_months(Months::new(1))?,
        "weekend" | "this weekend" | "the weekend" | "סוף השבוע" | "סופ\"ש" | "בסוף השבוע" => {
            upcoming_weekend(today)
        }
        "next weekend" | "סוף השבוע הבא" | "בסוף השבוע הבא" => next_weekend(today),
        _ => {
            let days: i64 = in_days_re().captures(term)?[1].parse().ok()?;
            today + Duration::days(days)
        }
    };
    Some(date)
}

/// Resolve a relative time expression to an ISO date
///
/// Known vocabulary resolves against `today`. ISO input is returned as-is,
/// other recognizable dates are reformatted as ISO, and anything else comes
/// back unchanged.
pub fn resolve_relative(term: &str, today: NaiveDate) -> String {
    let lower = term.trim().to_lowercase();
    if let Some(date) = relative_date(&lower, today) {
        debug!(%term, %date, "resolve_relative: vocabulary");
        return date.format(ISO_FORMAT).to_string();
    }
    if parse_iso(term).is_some() {
        return term.trim().to_string();
    }
    if let Some(date) = parse_date(term) {
        debug!(%term, %date, "resolve_relative: generic parse");
        return date.format(ISO_FORMAT).to_string();
    }
    debug!(%term, "resolve_relative: unresolved, passing through");
    term.to_string()
}

/// Resolve to a date, or None when the term is not a date at all
pub fn resolve_date(term: &str, today: NaiveDate) -> Option<NaiveDate> {
    parse_iso(&resolve_relative(term, today))
}

const TIME_CONTEXT_SYNONYMS: &[(&str, &[&str])] = &[
    ("current", &["current", "right now", "currently", "at the moment", "עכשיו", "כרגע"]),
    ("today", &["today", "this day", "היום"]),
    ("tomorrow", &["tomorrow", "מחר"]),
    (
        "weekend",
        &["weekend", "this weekend", "the weekend", "סוף השבוע", "סופ\"ש"],
    ),
    ("morning", &["morning", "this morning", "בבוקר", "בוקר"]),
    ("afternoon", &["afternoon", "this afternoon", "אחר הצהריים", "צהריים"]),
    ("evening", &["evening", "this evening", "בערב", "ערב"]),
    ("night", &["night", "tonight", "overnight", "בלילה", "לילה"]),
    ("all_day", &["all day", "all-day", "whole day", "full day", "כל היום"]),
];

/// Canonical time-context token for a term; unknown terms pass through
pub fn normalize_time_context(term: &str) -> String {
    let lower = term.trim().to_lowercase();
    TIME_CONTEXT_SYNONYMS
        .iter()
        .find(|(_, words)| words.contains(&lower.as_str()))
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or_else(|| term.to_string())
}

/// How far a date lies ahead of today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastHorizon {
    pub beyond_limit: bool,
    pub days_in_future: i64,
}

/// Compare `date` to `today` in whole days; beyond when more than
/// `horizon_days` ahead
pub fn compute_forecast_horizon(date: NaiveDate, today: NaiveDate, horizon_days: i64) -> ForecastHorizon {
    let days_in_future = (date - today).num_days();
    let horizon = ForecastHorizon {
        beyond_limit: days_in_future > horizon_days,
        days_in_future,
    };
    debug!(%date, %today, ?horizon, "compute_forecast_horizon: done");
    horizon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_iso(s).unwrap()
    }

    // 2025-06-11 is a Wednesday
    const WED: &str = "2025-06-11";

    #[test]
    fn test_resolve_relative_vocabulary() {
        let today = d(WED);
        assert_eq!(resolve_relative("today", today), "2025-06-11");
        assert_eq!(resolve_relative("Tomorrow", today), "2025-06-12");
        assert_eq!(resolve_relative("day after tomorrow", today), "2025-06-13");
        assert_eq!(resolve_relative("next week", today), "2025-06-18");
        assert_eq!(resolve_relative("next month", today), "2025-07-11");
        assert_eq!(resolve_relative("this weekend", today), "2025-06-14");
        assert_eq!(resolve_relative("next weekend", today), "2025-06-21");
        assert_eq!(resolve_relative("מחר", today), "2025-06-12");
        assert_eq!(resolve_relative("in 3 days", today), "2025-06-14");
    }

    #[test]
    fn test_weekend_on_weekend_days() {
        let saturday = d("2025-06-14");
        let sunday = d("2025-06-15");
        assert_eq!(resolve_relative("weekend", saturday), "2025-06-14");
        assert_eq!(resolve_relative("weekend", sunday), "2025-06-15");
        assert_eq!(resolve_relative("next weekend", sunday), "2025-06-21");
    }

    #[test]
    fn test_resolve_relative_fallbacks() {
        let today = d(WED);
        assert_eq!(resolve_relative("2025-08-01", today), "2025-08-01");
        assert_eq!(resolve_relative("August 3, 2025", today), "2025-08-03");
        assert_eq!(resolve_relative("03/08/2025", today), "2025-08-03");
        assert_eq!(resolve_relative("sometime soon", today), "sometime soon");
    }

    #[test]
    fn test_normalize_time_context() {
        assert_eq!(normalize_time_context("right now"), "current");
        assert_eq!(normalize_time_context("Tonight"), "night");
        assert_eq!(normalize_time_context("all-day"), "all_day");
        assert_eq!(normalize_time_context("now"), "now");
        assert_eq!(normalize_time_context("whenever"), "whenever");
    }

    #[test]
    fn test_forecast_horizon() {
        let today = d(WED);
        let h = compute_forecast_horizon(d("2025-06-16"), today, 5);
        assert_eq!(h.days_in_future, 5);
        assert!(!h.beyond_limit);
        let h = compute_forecast_horizon(d("2025-06-17"), today, 5);
        assert!(h.beyond_limit);
        let h = compute_forecast_horizon(d("2025-06-10"), today, 5);
        assert_eq!(h.days_in_future, -1);
        assert!(!h.beyond_limit);
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::on(d(WED));
        assert_eq!(clock.today(), d(WED));
    }
}
