//! Canned replies, English and Hebrew
//!
//! Used whenever the model did not supply a reply of its own, and for the
//! fixed confirmation and failure messages.

use crate::domain::Intent;
use crate::matcher::Locale;
use crate::requirements::field_label;

/// Hebrew when the message has Hebrew letters, otherwise the default
pub fn locale_for(message: &str, default: Locale) -> Locale {
    if message.chars().any(|c| ('\u{05D0}'..='\u{05EA}').contains(&c)) {
        Locale::Hebrew
    } else if message.chars().any(char::is_alphabetic) {
        Locale::English
    } else {
        default
    }
}

fn hebrew_field(field: &str) -> &str {
    match field {
        "city" => "באיזו עיר",
        "country" => "באיזו מדינה",
        "time" => "מתי (היום, מחר, תאריך...)",
        "budget_level" | "budget" => "מה התקציב (זול, בינוני או יוקרתי)",
        "vacation_location" => "לאן תרצו לנסוע",
        "duration" => "לכמה ימים",
        "dates" | "date" => "מה תאריכי הנסיעה",
        "origin" => "מאיפה אתם טסים",
        "destination" => "לאן אתם טסים",
        other => other,
    }
}

fn list(locale: Locale, fields: &[String]) -> String {
    let labels: Vec<&str> = fields
        .iter()
        .map(|f| match locale {
            Locale::English => field_label(f),
            Locale::Hebrew => hebrew_field(f),
        })
        .collect();
    match (locale, labels.as_slice()) {
        (_, []) => String::new(),
        (_, [one]) => one.to_string(),
        (Locale::English, [init @ .., last]) => format!("{} and {}", init.join(", "), last),
        (Locale::Hebrew, [init @ .., last]) => format!("{} ו{}", init.join(", "), last),
    }
}

pub fn ask_for_fields(locale: Locale, intent: Intent, fields: &[String]) -> String {
    match locale {
        Locale::English => format!(
            "To look up {} I still need to know {}.",
            intent.describe(),
            list(locale, fields)
        ),
        Locale::Hebrew => format!("כדי לעזור, אני צריך לדעת {}.", list(locale, fields)),
    }
}

pub fn ask_trip_fields(locale: Locale, fields: &[String]) -> String {
    match locale {
        Locale::English => format!("Let's plan your trip! Tell me {}.", list(locale, fields)),
        Locale::Hebrew => format!("בואו נתכנן את הטיול! ספרו לי {}.", list(locale, fields)),
    }
}

pub fn confirm_trip(locale: Locale, summary: &str) -> String {
    match locale {
        Locale::English => format!(
            "Here's your trip so far:\n{}\n\nShall I create the itinerary? You can also change something or cancel.",
            summary
        ),
        Locale::Hebrew => format!("זה הטיול שלך עד עכשיו:\n{}\n\nליצור את המסלול? אפשר גם לשנות או לבטל.", summary),
    }
}

pub fn confirm_again(locale: Locale) -> String {
    match locale {
        Locale::English => "Please reply yes to create the itinerary, tell me what to change, or cancel.".to_string(),
        Locale::Hebrew => "ענו כן כדי ליצור את המסלול, ספרו מה לשנות, או בטלו.".to_string(),
    }
}

pub fn what_to_change(locale: Locale) -> String {
    match locale {
        Locale::English => "Sure, what would you like to change?".to_string(),
        Locale::Hebrew => "בטח, מה תרצו לשנות?".to_string(),
    }
}

pub fn trip_cancelled(locale: Locale) -> String {
    match locale {
        Locale::English => "No problem, I've cancelled this trip. Let me know whenever you want to plan another."
            .to_string(),
        Locale::Hebrew => "אין בעיה, ביטלתי את הטיול. ספרו לי כשתרצו לתכנן טיול אחר.".to_string(),
    }
}

pub fn generation_failed(locale: Locale) -> String {
    match locale {
        Locale::English => "Sorry, I couldn't create the itinerary right now. Your trip details are saved; \
                            say the word and I'll try again."
            .to_string(),
        Locale::Hebrew => "מצטער, לא הצלחתי ליצור את המסלול כרגע. פרטי הטיול נשמרו, אפשר לנסות שוב.".to_string(),
    }
}

pub fn edit_failed(locale: Locale) -> String {
    match locale {
        Locale::English => "Sorry, I couldn't update the itinerary. The previous version is still here.".to_string(),
        Locale::Hebrew => "מצטער, לא הצלחתי לעדכן את המסלול. הגרסה הקודמת נשמרה.".to_string(),
    }
}

pub fn fetch_failed(locale: Locale, intent: Intent) -> String {
    match locale {
        Locale::English => format!(
            "Sorry, I couldn't get live {} information right now. Please try again in a little while.",
            intent.describe()
        ),
        Locale::Hebrew => "מצטער, לא הצלחתי להביא מידע עדכני כרגע. נסו שוב בעוד מעט.".to_string(),
    }
}

pub fn fetched(locale: Locale, intent: Intent) -> String {
    match locale {
        Locale::English => format!("Here's the {} information I found.", intent.describe()),
        Locale::Hebrew => "הנה המידע שמצאתי.".to_string(),
    }
}

pub fn acknowledged(locale: Locale) -> String {
    match locale {
        Locale::English => "You're welcome! Anything else I can help with?".to_string(),
        Locale::Hebrew => "בשמחה! יש עוד משהו שאפשר לעזור בו?".to_string(),
    }
}

pub fn start_over(locale: Locale) -> String {
    match locale {
        Locale::English => "Starting fresh. Where would you like to go?".to_string(),
        Locale::Hebrew => "מתחילים מחדש. לאן תרצו לנסוע?".to_string(),
    }
}

pub fn noted(locale: Locale) -> String {
    match locale {
        Locale::English => "Got it, thanks.".to_string(),
        Locale::Hebrew => "קיבלתי, תודה.".to_string(),
    }
}

pub fn general(locale: Locale) -> String {
    match locale {
        Locale::English => "I can help with trip planning, weather, hotels, attractions, restaurants and more. \
                            What would you like to know?"
            .to_string(),
        Locale::Hebrew => "אפשר לעזור בתכנון טיול, מזג אוויר, מלונות, אטרקציות, מסעדות ועוד. במה לעזור?".to_string(),
    }
}

pub fn day_summary(locale: Locale, day_number: u32, date: Option<&str>, location: Option<&str>) -> String {
    match locale {
        Locale::English => {
            let mut s = format!("Day {}", day_number);
            if let Some(loc) = location {
                s.push_str(&format!(" is in {}", loc));
            }
            if let Some(date) = date {
                s.push_str(&format!(" on {}", date));
            }
            s.push('.');
            s
        }
        Locale::Hebrew => {
            let mut s = format!("יום {}", day_number);
            if let Some(loc) = location {
                s.push_str(&format!(" ב{}", loc));
            }
            if let Some(date) = date {
                s.push_str(&format!(", {}", date));
            }
            s.push('.');
            s
        }
    }
}

pub fn no_such_day(locale: Locale) -> String {
    match locale {
        Locale::English => "I couldn't find that day in your itinerary.".to_string(),
        Locale::Hebrew => "לא מצאתי את היום הזה במסלול.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_detection() {
        assert_eq!(locale_for("מה המצב", Locale::English), Locale::Hebrew);
        assert_eq!(locale_for("hello", Locale::Hebrew), Locale::English);
        assert_eq!(locale_for("👍", Locale::Hebrew), Locale::Hebrew);
    }

    #[test]
    fn test_field_lists() {
        let fields = vec!["city".to_string(), "country".to_string(), "time".to_string()];
        assert_eq!(
            ask_for_fields(Locale::English, Intent::WeatherRequest, &fields[1..2]),
            "To look up weather I still need to know which country."
        );
        let text = ask_for_fields(Locale::English, Intent::WeatherRequest, &fields);
        assert!(text.contains("which city, which country and when"));
        assert!(ask_trip_fields(Locale::Hebrew, &fields[..2]).contains("באיזו עיר ובאיזו מדינה"));
    }
}
