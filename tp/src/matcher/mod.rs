//! Keyword matching
//!
//! Locale-tagged keyword tables used for every free-text decision the engine
//! makes on its own: confirmation replies, acknowledgments, start-over
//! requests, intent guessing and travel-keyword detection.
//!
//! Matching is token based. A single-word keyword matches a whole token, a
//! multi-word keyword matches a run of consecutive tokens. Substring matching
//! exists for intent labels only, where the input is a machine label such as
//! `find_hotel` rather than a user sentence.

use tracing::debug;

mod days;
mod tables;

pub use days::{DayMatcher, DayRef, parse_day_reference};
pub use tables::{
    AckMatcher, Matchers, ReplyKind, ReplyMatcher, intent_keywords, intent_label_keywords, travel_keywords,
};

/// Language a keyword belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    English,
    Hebrew,
}

/// How a keyword is compared against the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Whole token (or consecutive tokens for multi-word keywords)
    Token,
    /// Token starts with the keyword ("confirm" matches "confirmed")
    Prefix,
    /// Raw lowercase substring of the whole input
    Substring,
}

/// A single keyword entry
#[derive(Debug, Clone)]
pub struct Keyword {
    pub text: String,
    pub locale: Locale,
    pub kind: MatchKind,
    tokens: Vec<String>,
}

impl Keyword {
    pub fn new(text: impl Into<String>, locale: Locale, kind: MatchKind) -> Self {
        let text = text.into().to_lowercase();
        let tokens = tokenize(&text);
        Self {
            text,
            locale,
            kind,
            tokens,
        }
    }

    /// Check this keyword against normalized input
    pub fn matches(&self, input: &Normalized) -> bool {
        match self.kind {
            MatchKind::Substring => input.lower.contains(&self.text),
            MatchKind::Token | MatchKind::Prefix => {
                if self.tokens.is_empty() || self.tokens.len() > input.tokens.len() {
                    return false;
                }
                input.tokens.windows(self.tokens.len()).any(|window| {
                    window
                        .iter()
                        .zip(&self.tokens)
                        .enumerate()
                        .all(|(i, (token, kw))| {
                            let last = i + 1 == self.tokens.len();
                            token_matches(token, kw, self.locale, self.kind == MatchKind::Prefix && last)
                        })
                })
            }
        }
    }
}

/// Hebrew attaches single-letter prefixes (and, the, in, to, from, that) to words
const HEBREW_PREFIXES: &[char] = &['ו', 'ה', 'ב', 'ל', 'מ', 'ש', 'כ'];

fn token_matches(token: &str, keyword: &str, locale: Locale, prefix: bool) -> bool {
    let direct = if prefix {
        token.starts_with(keyword)
    } else {
        token == keyword
    };
    if direct {
        return true;
    }
    if locale == Locale::Hebrew {
        let mut chars = token.chars();
        if let Some(first) = chars.next()
            && HEBREW_PREFIXES.contains(&first)
        {
            let rest = chars.as_str();
            return if prefix { rest.starts_with(keyword) } else { rest == keyword };
        }
    }
    false
}

/// Lowercased input plus its tokens
#[derive(Debug, Clone)]
pub struct Normalized {
    pub lower: String,
    pub tokens: Vec<String>,
}

impl Normalized {
    pub fn new(text: &str) -> Self {
        let lower = text.trim().to_lowercase();
        let tokens = tokenize(&lower);
        Self { lower, tokens }
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Split on anything that is not a letter, digit or apostrophe
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Ordered keyword table mapping keywords to a tag
///
/// Entries are checked in insertion order, so the first tag added wins when
/// several keywords match.
#[derive(Debug, Clone)]
pub struct KeywordTable<T> {
    entries: Vec<(T, Keyword)>,
}

impl<T> Default for KeywordTable<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Copy + PartialEq + std::fmt::Debug> KeywordTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`KeywordTable::add`]
    pub fn with(mut self, tag: T, locale: Locale, kind: MatchKind, words: &[&str]) -> Self {
        self.add(tag, locale, kind, words);
        self
    }

    /// Add keywords for a tag
    pub fn add(&mut self, tag: T, locale: Locale, kind: MatchKind, words: &[&str]) {
        for word in words {
            self.entries.push((tag, Keyword::new(*word, locale, kind)));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First tag whose keyword matches
    pub fn first_match(&self, input: &Normalized) -> Option<T> {
        let hit = self.entries.iter().find(|(_, kw)| kw.matches(input));
        if let Some((tag, kw)) = hit {
            debug!(?tag, keyword = %kw.text, "KeywordTable::first_match: matched");
        }
        hit.map(|(tag, _)| *tag)
    }

    /// Does any keyword for `tag` match
    pub fn matches(&self, tag: T, input: &Normalized) -> bool {
        self.entries.iter().any(|(t, kw)| *t == tag && kw.matches(input))
    }

    /// Does any keyword at all match
    pub fn any_match(&self, input: &Normalized) -> bool {
        self.entries.iter().any(|(_, kw)| kw.matches(input))
    }
}

impl KeywordTable<()> {
    /// Copy every keyword of another table in, dropping its tags
    pub fn merge_untagged<T>(&mut self, other: &KeywordTable<T>) {
        for (_, kw) in &other.entries {
            self.entries.push(((), kw.clone()));
        }
    }
}

/// A pluggable detector over user text
pub trait Matcher: Send + Sync {
    type Output;

    fn detect(&self, text: &str) -> Option<Self::Output>;
}
