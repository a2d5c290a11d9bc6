//! Default keyword tables (English + Hebrew)

use tracing::debug;

use super::{KeywordTable, Locale, MatchKind, Matcher, Normalized};
use crate::domain::Intent;

use Locale::{English, Hebrew};
use MatchKind::{Prefix, Substring, Token};

/// How a user answered the trip-confirmation question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Confirm,
    Edit,
    Cancel,
}

/// Confirmation/edit/cancel detection
///
/// Checked in the order confirm, edit, cancel. A confirmation is rejected when
/// the message also carries a negation ("not ok", "לא בסדר").
#[derive(Debug, Clone)]
pub struct ReplyMatcher {
    pub table: KeywordTable<ReplyKind>,
    pub negations: KeywordTable<()>,
}

impl Default for ReplyMatcher {
    fn default() -> Self {
        let table = KeywordTable::new()
            .with(
                ReplyKind::Confirm,
                English,
                Token,
                &[
                    "yes",
                    "yep",
                    "yeah",
                    "sure",
                    "ok",
                    "okay",
                    "looks good",
                    "sounds good",
                    "looks great",
                    "go ahead",
                    "let's go",
                    "lets go",
                    "do it",
                    "perfect",
                    "great",
                    "correct",
                    "proceed",
                    "approve",
                    "approved",
                ],
            )
            .with(ReplyKind::Confirm, English, Prefix, &["confirm"])
            .with(
                ReplyKind::Confirm,
                Hebrew,
                Token,
                &["כן", "מאשר", "מאשרת", "אישור", "נשמע טוב", "מעולה", "יאללה", "בסדר", "סבבה", "תתחיל"],
            )
            .with(
                ReplyKind::Edit,
                English,
                Token,
                &["change", "edit", "modify", "update", "adjust", "instead", "different", "tweak"],
            )
            .with(
                ReplyKind::Edit,
                Hebrew,
                Token,
                &["שנה", "תשנה", "לשנות", "עריכה", "לערוך", "תעדכן", "לעדכן", "במקום"],
            )
            .with(
                ReplyKind::Cancel,
                English,
                Token,
                &[
                    "cancel",
                    "no",
                    "nope",
                    "stop",
                    "abort",
                    "forget it",
                    "never mind",
                    "nevermind",
                    "not interested",
                ],
            )
            .with(
                ReplyKind::Cancel,
                Hebrew,
                Token,
                &["לא", "בטל", "ביטול", "תבטל", "עזוב", "לא מעוניין", "לא מעוניינת"],
            );

        let negations = KeywordTable::new()
            .with((), English, Token, &["no", "not", "don't", "dont", "nope", "never", "isn't", "wrong"])
            .with((), Hebrew, Token, &["לא", "אל"]);

        Self { table, negations }
    }
}

impl Matcher for ReplyMatcher {
    type Output = ReplyKind;

    fn detect(&self, text: &str) -> Option<ReplyKind> {
        debug!(%text, "ReplyMatcher::detect: called");
        let input = Normalized::new(text);
        if self.table.matches(ReplyKind::Confirm, &input) && !self.negations.any_match(&input) {
            debug!("ReplyMatcher::detect: confirm");
            return Some(ReplyKind::Confirm);
        }
        if self.table.matches(ReplyKind::Edit, &input) {
            debug!("ReplyMatcher::detect: edit");
            return Some(ReplyKind::Edit);
        }
        if self.table.matches(ReplyKind::Cancel, &input) {
            debug!("ReplyMatcher::detect: cancel");
            return Some(ReplyKind::Cancel);
        }
        debug!("ReplyMatcher::detect: no reply keyword");
        None
    }
}

/// Acknowledgment detection: short, not a question, has an ack keyword and no
/// travel keyword
#[derive(Debug, Clone)]
pub struct AckMatcher {
    pub table: KeywordTable<()>,
    pub travel: KeywordTable<()>,
    pub max_tokens: usize,
}

impl AckMatcher {
    pub fn new(max_tokens: usize) -> Self {
        let table = KeywordTable::new()
            .with(
                (),
                English,
                Token,
                &[
                    "thanks",
                    "thank you",
                    "thx",
                    "ty",
                    "ok",
                    "okay",
                    "cool",
                    "great",
                    "awesome",
                    "perfect",
                    "nice",
                    "got it",
                    "alright",
                    "cheers",
                    "appreciate it",
                ],
            )
            .with((), Hebrew, Token, &["תודה", "תודה רבה", "סבבה", "אחלה", "מעולה", "יופי", "בסדר"]);

        Self {
            table,
            travel: travel_keywords(),
            max_tokens,
        }
    }
}

impl Default for AckMatcher {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Matcher for AckMatcher {
    type Output = ();

    fn detect(&self, text: &str) -> Option<()> {
        debug!(%text, "AckMatcher::detect: called");
        if text.contains('?') {
            debug!("AckMatcher::detect: question, not an acknowledgment");
            return None;
        }
        let input = Normalized::new(text);
        if input.token_count() == 0 || input.token_count() > self.max_tokens {
            debug!(tokens = input.token_count(), "AckMatcher::detect: length out of range");
            return None;
        }
        if self.travel.any_match(&input) {
            debug!("AckMatcher::detect: travel keyword present");
            return None;
        }
        self.table.any_match(&input).then_some(())
    }
}

/// Label-level intent table (substring match against lowercased labels)
pub fn intent_label_keywords() -> KeywordTable<Intent> {
    KeywordTable::new()
        .with(Intent::WeatherRequest, English, Substring, &["weather", "forecast", "temperature", "climate"])
        .with(Intent::FindHotel, English, Substring, &["hotel", "accommodation", "lodging", "hostel"])
        .with(Intent::FindRestaurants, English, Substring, &["restaurant", "dining", "food", "cuisine"])
        .with(Intent::FindAttractions, English, Substring, &["attraction", "sightseeing", "landmark", "activities"])
        .with(Intent::FlightInformation, English, Substring, &["flight", "airline", "airport"])
        .with(Intent::LocalEvents, English, Substring, &["event", "festival", "concert"])
        .with(Intent::TravelRestrictions, English, Substring, &["restriction", "visa", "entry"])
        .with(Intent::CurrencyConversion, English, Substring, &["currency", "exchange"])
        .with(Intent::PublicTransportInfo, English, Substring, &["transport", "transit"])
        .with(Intent::SafetyInformation, English, Substring, &["safety", "security"])
        .with(Intent::CostEstimate, English, Substring, &["cost", "price", "estimate"])
        .with(Intent::ItineraryAdvice, English, Substring, &["itinerary"])
        .with(Intent::TripBuilding, English, Substring, &["trip", "vacation", "holiday", "plan"])
}

/// Sentence-level intent table (token/prefix match against user messages)
pub fn intent_keywords() -> KeywordTable<Intent> {
    KeywordTable::new()
        .with(
            Intent::WeatherRequest,
            English,
            Prefix,
            &["weather", "forecast", "temperature", "sunny", "rain"],
        )
        .with(Intent::WeatherRequest, Hebrew, Prefix, &["מזג אוויר", "תחזית", "גשם"])
        .with(
            Intent::FindHotel,
            English,
            Prefix,
            &["hotel", "accommodation", "lodging", "hostel", "place to stay", "where to stay"],
        )
        .with(Intent::FindHotel, Hebrew, Prefix, &["מלון", "לינה"])
        .with(
            Intent::FindRestaurants,
            English,
            Prefix,
            &["restaurant", "where to eat", "dinner", "lunch", "breakfast", "cuisine"],
        )
        .with(Intent::FindRestaurants, English, Token, &["food", "eat"])
        .with(Intent::FindRestaurants, Hebrew, Prefix, &["מסעד", "אוכל"])
        .with(
            Intent::FindAttractions,
            English,
            Prefix,
            &[
                "attraction",
                "sightseeing",
                "museum",
                "things to do",
                "what to do",
                "places to visit",
                "landmark",
            ],
        )
        .with(Intent::FindAttractions, Hebrew, Prefix, &["אטרקצי", "מה לעשות"])
        .with(Intent::FlightInformation, English, Prefix, &["flight", "airline", "airport"])
        .with(Intent::FlightInformation, English, Token, &["fly"])
        .with(Intent::FlightInformation, Hebrew, Prefix, &["טיס"])
        .with(Intent::LocalEvents, English, Prefix, &["event", "concert", "festival"])
        .with(Intent::LocalEvents, Hebrew, Prefix, &["אירוע", "הופע", "פסטיבל"])
        .with(
            Intent::TravelRestrictions,
            English,
            Prefix,
            &["visa", "restriction", "entry requirement", "passport"],
        )
        .with(Intent::TravelRestrictions, Hebrew, Prefix, &["ויזה", "הגבל"])
        .with(Intent::CurrencyConversion, English, Prefix, &["currency", "exchange rate", "convert"])
        .with(Intent::CurrencyConversion, Hebrew, Prefix, &["מטבע", "שער"])
        .with(Intent::PublicTransportInfo, English, Prefix, &["transport", "metro", "subway"])
        .with(Intent::PublicTransportInfo, English, Token, &["bus", "train", "tram"])
        .with(Intent::PublicTransportInfo, Hebrew, Prefix, &["תחבורה", "רכבת", "אוטובוס"])
        .with(Intent::SafetyInformation, English, Prefix, &["safety", "crime", "danger"])
        .with(Intent::SafetyInformation, English, Token, &["safe"])
        .with(Intent::SafetyInformation, Hebrew, Prefix, &["בטיחות", "בטוח"])
        .with(Intent::CostEstimate, English, Prefix, &["how much", "cost", "price"])
        .with(Intent::CostEstimate, Hebrew, Prefix, &["כמה עולה", "עלות"])
        .with(Intent::ItineraryAdvice, English, Prefix, &["itinerar"])
        .with(Intent::ItineraryAdvice, Hebrew, Prefix, &["מסלול"])
        .with(
            Intent::TripBuilding,
            English,
            Prefix,
            &["trip", "vacation", "holiday", "plan a", "getaway"],
        )
        .with(Intent::TripBuilding, Hebrew, Prefix, &["טיול", "חופשה"])
}

/// Anything that makes a short message travel-related
pub fn travel_keywords() -> KeywordTable<()> {
    let mut table = KeywordTable::new()
        .with(
            (),
            English,
            Token,
            &["day", "days", "budget", "city", "country", "date", "dates", "destination"],
        )
        .with((), Hebrew, Token, &["יום", "ימים", "תקציב", "עיר", "מדינה", "תאריך"]);
    table.merge_untagged(&intent_keywords());
    table
}

/// All matchers the engine uses
#[derive(Debug, Clone)]
pub struct Matchers {
    pub replies: ReplyMatcher,
    pub acks: AckMatcher,
    pub start_over: KeywordTable<()>,
    pub intents: KeywordTable<Intent>,
    pub intent_labels: KeywordTable<Intent>,
}

impl Matchers {
    pub fn new(ack_max_tokens: usize) -> Self {
        let start_over = KeywordTable::new()
            .with(
                (),
                English,
                Token,
                &["start over", "start again", "restart", "from scratch", "new trip"],
            )
            .with((), Hebrew, Token, &["מההתחלה", "להתחיל מחדש", "התחל מחדש"]);

        Self {
            replies: ReplyMatcher::default(),
            acks: AckMatcher::new(ack_max_tokens),
            start_over,
            intents: intent_keywords(),
            intent_labels: intent_label_keywords(),
        }
    }

    pub fn is_start_over(&self, text: &str) -> bool {
        self.start_over.any_match(&Normalized::new(text))
    }

    pub fn is_acknowledgment(&self, text: &str) -> bool {
        self.acks.detect(text).is_some()
    }

    /// Guess an intent from a user sentence
    pub fn guess_intent(&self, text: &str) -> Option<Intent> {
        self.intents.first_match(&Normalized::new(text))
    }
}

impl Default for Matchers {
    fn default() -> Self {
        Self::new(6)
    }
}
