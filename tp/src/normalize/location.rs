//! Location resolution from a static city/country table

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matcher::Normalized;

/// A resolved city/country pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Location {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            country: Some(country.into()),
        }
    }

    /// "City, Country", or whichever part is known
    pub fn display(&self) -> String {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => format!("{}, {}", city, country),
            (Some(city), None) => city.clone(),
            (None, Some(country)) => country.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Known cities with their country. Aliases map to the canonical city name.
const CITIES: &[(&str, &str, &[&str])] = &[
    ("Tel Aviv", "Israel", &["tel aviv", "tel-aviv", "tlv", "תל אביב"]),
    ("Jerusalem", "Israel", &["jerusalem", "ירושלים"]),
    ("Haifa", "Israel", &["haifa", "חיפה"]),
    ("Eilat", "Israel", &["eilat", "אילת"]),
    ("Paris", "France", &["paris", "פריז"]),
    ("Lyon", "France", &["lyon"]),
    ("London", "United Kingdom", &["london", "לונדון"]),
    ("Edinburgh", "United Kingdom", &["edinburgh"]),
    ("Rome", "Italy", &["rome", "roma", "רומא"]),
    ("Milan", "Italy", &["milan", "milano", "מילאנו"]),
    ("Florence", "Italy", &["florence", "firenze"]),
    ("Venice", "Italy", &["venice", "venezia"]),
    ("Barcelona", "Spain", &["barcelona", "ברצלונה"]),
    ("Madrid", "Spain", &["madrid", "מדריד"]),
    ("Lisbon", "Portugal", &["lisbon", "lisboa", "ליסבון"]),
    ("Porto", "Portugal", &["porto"]),
    ("Berlin", "Germany", &["berlin", "ברלין"]),
    ("Munich", "Germany", &["munich", "münchen"]),
    ("Amsterdam", "Netherlands", &["amsterdam", "אמסטרדם"]),
    ("Brussels", "Belgium", &["brussels"]),
    ("Vienna", "Austria", &["vienna", "wien", "וינה"]),
    ("Prague", "Czech Republic", &["prague", "praha", "פראג"]),
    ("Budapest", "Hungary", &["budapest", "בודפשט"]),
    ("Athens", "Greece", &["athens", "אתונה"]),
    ("Istanbul", "Turkey", &["istanbul", "איסטנבול"]),
    ("Zurich", "Switzerland", &["zurich", "zürich"]),
    ("Geneva", "Switzerland", &["geneva"]),
    ("Copenhagen", "Denmark", &["copenhagen"]),
    ("Stockholm", "Sweden", &["stockholm"]),
    ("Oslo", "Norway", &["oslo"]),
    ("Dublin", "Ireland", &["dublin"]),
    ("New York", "United States", &["new york", "nyc", "ניו יורק"]),
    ("Los Angeles", "United States", &["los angeles"]),
    ("San Francisco", "United States", &["san francisco"]),
    ("Miami", "United States", &["miami"]),
    ("Chicago", "United States", &["chicago"]),
    ("Las Vegas", "United States", &["las vegas"]),
    ("Toronto", "Canada", &["toronto"]),
    ("Vancouver", "Canada", &["vancouver"]),
    ("Mexico City", "Mexico", &["mexico city"]),
    ("Cancun", "Mexico", &["cancun"]),
    ("Rio de Janeiro", "Brazil", &["rio de janeiro", "rio"]),
    ("Buenos Aires", "Argentina", &["buenos aires"]),
    ("Tokyo", "Japan", &["tokyo", "טוקיו"]),
    ("Kyoto", "Japan", &["kyoto"]),
    ("Osaka", "Japan", &["osaka"]),
    ("Seoul", "South Korea", &["seoul"]),
    ("Beijing", "China", &["beijing"]),
    ("Shanghai", "China", &["shanghai"]),
    ("Hong Kong", "China", &["hong kong"]),
    ("Bangkok", "Thailand", &["bangkok", "בנגקוק"]),
    ("Singapore", "Singapore", &["singapore"]),
    ("Bali", "Indonesia", &["bali"]),
    ("Dubai", "United Arab Emirates", &["dubai", "דובאי"]),
    ("Cairo", "Egypt", &["cairo"]),
    ("Marrakech", "Morocco", &["marrakech", "marrakesh"]),
    ("Cape Town", "South Africa", &["cape town"]),
    ("Sydney", "Australia", &["sydney"]),
    ("Melbourne", "Australia", &["melbourne"]),
    ("Auckland", "New Zealand", &["auckland"]),
    ("Delhi", "India", &["delhi", "new delhi"]),
    ("Mumbai", "India", &["mumbai"]),
];

/// Known countries with aliases
const COUNTRIES: &[(&str, &[&str])] = &[
    ("Israel", &["israel", "ישראל"]),
    ("France", &["france", "צרפת"]),
    ("United Kingdom", &["united kingdom", "uk", "england", "britain", "great britain", "אנגליה"]),
    ("Italy", &["italy", "איטליה"]),
    ("Spain", &["spain", "ספרד"]),
    ("Portugal", &["portugal", "פורטוגל"]),
    ("Germany", &["germany", "גרמניה"]),
    ("Netherlands", &["netherlands", "holland", "הולנד"]),
    ("Belgium", &["belgium"]),
    ("Austria", &["austria", "אוסטריה"]),
    ("Czech Republic", &["czech republic", "czechia"]),
    ("Hungary", &["hungary", "הונגריה"]),
    ("Greece", &["greece", "יוון"]),
    ("Turkey", &["turkey", "türkiye", "טורקיה"]),
    ("Switzerland", &["switzerland", "שוויץ"]),
    ("Denmark", &["denmark"]),
    ("Sweden", &["sweden"]),
    ("Norway", &["norway"]),
    ("Ireland", &["ireland"]),
    ("United States", &["united states", "usa", "america", "ארצות הברית", "ארה\"ב"]),
    ("Canada", &["canada"]),
    ("Mexico", &["mexico"]),
    ("Brazil", &["brazil"]),
    ("Argentina", &["argentina"]),
    ("Japan", &["japan", "יפן"]),
    ("South Korea", &["south korea", "korea"]),
    ("China", &["china"]),
    ("Thailand", &["thailand", "תאילנד"]),
    ("Singapore", &["singapore"]),
    ("Indonesia", &["indonesia"]),
    ("United Arab Emirates", &["united arab emirates", "uae"]),
    ("Egypt", &["egypt", "מצרים"]),
    ("Morocco", &["morocco"]),
    ("South Africa", &["south africa"]),
    ("Australia", &["australia"]),
    ("New Zealand", &["new zealand"]),
    ("India", &["india", "הודו"]),
];

/// Canonical country name for an alias (case-insensitive, exact)
pub fn canonical_country(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_lowercase();
    COUNTRIES
        .iter()
        .find(|(_, aliases)| aliases.contains(&lower.as_str()))
        .map(|(country, _)| *country)
}

/// Canonical city + country for an alias (case-insensitive, exact)
fn exact_city(name: &str) -> Option<Location> {
    let lower = name.trim().to_lowercase();
    CITIES
        .iter()
        .find(|(_, _, aliases)| aliases.contains(&lower.as_str()))
        .map(|(city, country, _)| Location::new(*city, *country))
}

/// Does a token sequence contain the alias as whole tokens
fn contains_alias(haystack: &Normalized, alias: &str) -> bool {
    let needle = Normalized::new(alias);
    !needle.tokens.is_empty()
        && haystack
            .tokens
            .windows(needle.tokens.len())
            .any(|w| w == needle.tokens.as_slice())
}

/// Resolve a single city name to city + country
///
/// Exact alias match first, then the first known city whose alias appears as
/// whole words inside the input ("downtown Paris").
pub fn resolve_city(name: &str) -> Option<Location> {
    debug!(%name, "resolve_city: called");
    if let Some(loc) = exact_city(name) {
        debug!(?loc, "resolve_city: exact match");
        return Some(loc);
    }
    let input = Normalized::new(name);
    let found = longest_city_in(&input);
    debug!(?found, "resolve_city: substring fallback");
    found
}

fn longest_city_in(input: &Normalized) -> Option<Location> {
    CITIES
        .iter()
        .flat_map(|(city, country, aliases)| aliases.iter().map(move |a| (*city, *country, *a)))
        .filter(|(_, _, alias)| contains_alias(input, alias))
        .max_by_key(|(_, _, alias)| alias.len())
        .map(|(city, country, _)| Location::new(city, country))
}

fn longest_country_in(input: &Normalized) -> Option<&'static str> {
    COUNTRIES
        .iter()
        .flat_map(|(country, aliases)| aliases.iter().map(move |a| (*country, *a)))
        .filter(|(_, alias)| contains_alias(input, alias))
        .max_by_key(|(_, alias)| alias.len())
        .map(|(country, _)| country)
}

/// Find whatever location is literally mentioned in free text
///
/// The city is taken from the text, and the country only when the text names
/// one. A city alone never gets its country filled in here; use
/// [`resolve_city`] for that.
pub fn infer_from_text(text: &str) -> Option<Location> {
    debug!(%text, "infer_from_text: called");
    let input = Normalized::new(text);
    let city = longest_city_in(&input).and_then(|l| l.city);
    let country = longest_country_in(&input).map(str::to_string);
    // "Singapore" is both; count it once as the city
    let country = match (&city, country) {
        (Some(c), Some(k)) if *c == k => None,
        (_, k) => k,
    };
    if city.is_none() && country.is_none() {
        debug!("infer_from_text: nothing found");
        return None;
    }
    Some(Location { city, country })
}

/// Split "City Country" when the trailing words are a known country
pub fn split_country_suffix(text: &str) -> Option<(String, &'static str)> {
    let words: Vec<&str> = text.split_whitespace().collect();
    for take in (1..=words.len().min(4)).rev() {
        if take == words.len() {
            continue;
        }
        let suffix = words[words.len() - take..].join(" ");
        if let Some(country) = canonical_country(&suffix) {
            let city = words[..words.len() - take].join(" ");
            return Some((city, country));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_city_exact() {
        assert_eq!(resolve_city("paris"), Some(Location::new("Paris", "France")));
        assert_eq!(resolve_city("תל אביב"), Some(Location::new("Tel Aviv", "Israel")));
        assert_eq!(resolve_city(" NYC "), Some(Location::new("New York", "United States")));
    }

    #[test]
    fn test_resolve_city_substring_fallback() {
        assert_eq!(resolve_city("downtown Barcelona"), Some(Location::new("Barcelona", "Spain")));
        assert_eq!(resolve_city("Atlantis"), None);
    }

    #[test]
    fn test_infer_from_text_city_and_country() {
        let loc = infer_from_text("weather in Tel Aviv Israel now").unwrap();
        assert_eq!(loc.city.as_deref(), Some("Tel Aviv"));
        assert_eq!(loc.country.as_deref(), Some("Israel"));
    }

    #[test]
    fn test_infer_from_text_does_not_fill_country() {
        let loc = infer_from_text("Weather tomorrow in Paris").unwrap();
        assert_eq!(loc.city.as_deref(), Some("Paris"));
        assert_eq!(loc.country, None);
    }

    #[test]
    fn test_infer_from_text_country_only() {
        let loc = infer_from_text("is Japan safe?").unwrap();
        assert_eq!(loc.city, None);
        assert_eq!(loc.country.as_deref(), Some("Japan"));
    }

    #[test]
    fn test_infer_from_text_city_state() {
        let loc = infer_from_text("hotels in Singapore").unwrap();
        assert_eq!(loc.city.as_deref(), Some("Singapore"));
        assert_eq!(loc.country, None);
    }

    #[test]
    fn test_split_country_suffix() {
        assert_eq!(
            split_country_suffix("Tel Aviv Israel"),
            Some(("Tel Aviv".to_string(), "Israel"))
        );
        assert_eq!(
            split_country_suffix("Auckland New Zealand"),
            Some(("Auckland".to_string(), "New Zealand"))
        );
        assert_eq!(split_country_suffix("Israel"), None);
        assert_eq!(split_country_suffix("Old Town"), None);
    }

    #[test]
    fn test_canonical_country_aliases() {
        assert_eq!(canonical_country("UK"), Some("United Kingdom"));
        assert_eq!(canonical_country("usa"), Some("United States"));
        assert_eq!(canonical_country("Narnia"), None);
    }
}
