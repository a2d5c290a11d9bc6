//! Day references inside an itinerary ("day 3", "the second day", "ביום האחרון")

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

use super::{Matcher, Normalized};

/// Which itinerary day a message points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayRef {
    /// Zero-based day index
    Index(usize),
    Last,
}

impl DayRef {
    /// Zero-based index into a list of `len` days, None when out of range
    pub fn index_in(&self, len: usize) -> Option<usize> {
        match *self {
            DayRef::Index(i) if i < len => Some(i),
            DayRef::Last if len > 0 => Some(len - 1),
            _ => None,
        }
    }
}

fn numbered_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:\bday|יום)\s*#?\s*(\d{1,2})\b").expect("valid numbered day regex"))
}

fn suffixed_ordinal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\s+day\b").expect("valid ordinal day regex"))
}

const ENGLISH_ORDINALS: &[&str] = &[
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

const ENGLISH_CARDINALS: &[&str] = &["one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten"];

const HEBREW_ORDINALS: &[&str] = &[
    "ראשון", "שני", "שלישי", "רביעי", "חמישי", "שישי", "שביעי", "שמיני", "תשיעי", "עשירי",
];

const ENGLISH_LAST: &[&str] = &["last", "final"];
const HEBREW_LAST: &str = "אחרון";

const HEBREW_DAY_WORDS: &[&str] = &["יום", "ביום", "היום", "ליום", "מהיום"];

fn hebrew_ordinal(token: &str) -> Option<usize> {
    let bare = token.strip_prefix('ה').unwrap_or(token);
    HEBREW_ORDINALS.iter().position(|o| *o == bare)
}

/// Parse a day reference out of free text
pub fn parse_day_reference(text: &str) -> Option<DayRef> {
    debug!(%text, "parse_day_reference: called");
    if let Some(caps) = numbered_day_re().captures(text) {
        let n: usize = caps[1].parse().ok()?;
        return n.checked_sub(1).map(DayRef::Index);
    }
    if let Some(caps) = suffixed_ordinal_re().captures(text) {
        let n: usize = caps[1].parse().ok()?;
        return n.checked_sub(1).map(DayRef::Index);
    }

    let input = Normalized::new(text);
    for pair in input.tokens.windows(2) {
        let (a, b) = (pair[0].as_str(), pair[1].as_str());
        if b == "day" {
            if ENGLISH_LAST.contains(&a) {
                return Some(DayRef::Last);
            }
            if let Some(i) = ENGLISH_ORDINALS.iter().position(|o| *o == a) {
                return Some(DayRef::Index(i));
            }
        }
        if a == "day"
            && let Some(i) = ENGLISH_CARDINALS.iter().position(|c| *c == b)
        {
            return Some(DayRef::Index(i));
        }
        if HEBREW_DAY_WORDS.contains(&a) {
            if b.strip_prefix('ה').unwrap_or(b) == HEBREW_LAST {
                return Some(DayRef::Last);
            }
            if let Some(i) = hebrew_ordinal(b) {
                return Some(DayRef::Index(i));
            }
        }
    }
    None
}

/// [`Matcher`] wrapper over [`parse_day_reference`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DayMatcher;

impl Matcher for DayMatcher {
    type Output = DayRef;

    fn detect(&self, text: &str) -> Option<DayRef> {
        parse_day_reference(text)
    }
}
