//! Pull the extraction JSON out of a model reply

use tracing::{debug, warn};

use super::LlmError;
use crate::engine::LlmExtraction;

/// First balanced `{...}` in `text`, skipping braces inside strings
///
/// Models wrap JSON in prose or code fences often enough that the reply is
/// scanned rather than parsed whole.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a model reply into an extraction
pub fn parse_extraction(text: &str) -> Result<LlmExtraction, LlmError> {
    debug!(len = text.len(), "parse_extraction: called");
    let Some(json) = extract_json_object(text) else {
        warn!("Model reply contained no JSON object");
        return Err(LlmError::InvalidResponse("no JSON object in model reply".to_string()));
    };
    let extraction: LlmExtraction = serde_json::from_str(json)?;
    debug!(intent = %extraction.intent, "parse_extraction: done");
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_reply() {
        let reply = "Sure!\n```json\n{\"intent\": \"Weather-Request\", \"data\": {\"city\": \"Paris\"}}\n```";
        let ex = parse_extraction(reply).unwrap();
        assert_eq!(ex.intent, json!("Weather-Request"));
        assert_eq!(ex.data["city"], json!("Paris"));
    }

    #[test]
    fn test_braces_inside_strings() {
        let reply = r#"{"intent": "General-Query", "response": "use {curly} \"quotes\""} trailing"#;
        assert_eq!(
            extract_json_object(reply),
            Some(r#"{"intent": "General-Query", "response": "use {curly} \"quotes\""}"#)
        );
    }

    #[test]
    fn test_lenient_fields() {
        let reply = r#"{"intent": "Find-Hotel", "data": null, "missingFields": "budget_level, city", "nextState": "ASK_MISSING_FIELDS"}"#;
        let ex = parse_extraction(reply).unwrap();
        assert!(ex.data.is_empty());
        assert_eq!(
            ex.missing_fields,
            Some(vec!["budget_level".to_string(), "city".to_string()])
        );
        assert_eq!(ex.next_state.as_deref(), Some("ASK_MISSING_FIELDS"));
    }

    #[test]
    fn test_no_json() {
        assert!(matches!(
            parse_extraction("I could not understand that."),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(extract_json_object("{ unterminated").is_none());
    }
}
