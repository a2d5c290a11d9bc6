//! Advice requests and in-flight missing-field collections

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::Intent;
use crate::requirements;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdviceStatus {
    Complete,
    Incomplete,
}

/// One advice/external-data question and what has been collected for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    pub intent: Intent,
    pub required_fields: Vec<String>,
    pub collected_fields: Map<String, Value>,
    pub missing_fields: Vec<String>,
    pub status: AdviceStatus,
}

impl AdviceRequest {
    pub fn new(intent: Intent, collected: Map<String, Value>) -> Self {
        debug!(%intent, fields = collected.len(), "AdviceRequest::new: called");
        let required_fields = requirements::required_fields(intent)
            .iter()
            .map(|f| f.to_string())
            .collect();
        let mut request = Self {
            intent,
            required_fields,
            collected_fields: collected,
            missing_fields: Vec::new(),
            status: AdviceStatus::Incomplete,
        };
        request.recompute();
        request
    }

    /// Merge newly supplied values over the collected ones
    pub fn absorb(&mut self, data: &Map<String, Value>) {
        debug!(fields = data.len(), "AdviceRequest::absorb: called");
        for (k, v) in data {
            if !requirements::is_empty_value(v) {
                self.collected_fields.insert(k.clone(), v.clone());
            }
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        self.missing_fields = requirements::compute_missing(self.intent, &self.collected_fields);
        self.status = if self.missing_fields.is_empty() {
            AdviceStatus::Complete
        } else {
            AdviceStatus::Incomplete
        };
    }

    pub fn is_complete(&self) -> bool {
        self.status == AdviceStatus::Complete
    }
}

/// A pending form-like request for one or more fields
///
/// At most one exists per session (`SessionState::missing`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingFieldsState {
    pub fields: Vec<String>,
    pub values: Map<String, Value>,
    pub message_id: String,
    pub intent: Intent,
    pub submitted: bool,
}

impl MissingFieldsState {
    pub fn new(intent: Intent, fields: Vec<String>, values: Map<String, Value>) -> Self {
        debug!(%intent, ?fields, "MissingFieldsState::new: called");
        Self {
            fields,
            values,
            message_id: Uuid::now_v7().to_string(),
            intent,
            submitted: false,
        }
    }

    /// Same intent and same field set, still waiting for an answer
    pub fn is_same_request(&self, intent: Intent, fields: &[String]) -> bool {
        if self.submitted || self.intent != intent || self.fields.len() != fields.len() {
            return false;
        }
        fields.iter().all(|f| self.fields.contains(f))
    }

    pub fn mark_submitted(&mut self) {
        debug!(message_id = %self.message_id, "MissingFieldsState::mark_submitted: called");
        self.submitted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_advice_request_incomplete_then_complete() {
        let mut req = AdviceRequest::new(
            Intent::WeatherRequest,
            map(json!({"city": "Paris", "time": "tomorrow"})),
        );
        assert_eq!(req.status, AdviceStatus::Incomplete);
        assert_eq!(req.missing_fields, vec!["country"]);

        req.absorb(&map(json!({"country": "France", "city": ""})));
        assert!(req.is_complete());
        assert_eq!(req.collected_fields["city"], json!("Paris"));
    }

    #[test]
    fn test_missing_fields_same_request() {
        let mut state = MissingFieldsState::new(
            Intent::FindHotel,
            vec!["country".into(), "budget_level".into()],
            Map::new(),
        );
        assert!(state.is_same_request(Intent::FindHotel, &["budget_level".into(), "country".into()]));
        assert!(!state.is_same_request(Intent::WeatherRequest, &["country".into(), "budget_level".into()]));
        state.mark_submitted();
        assert!(!state.is_same_request(Intent::FindHotel, &["country".into(), "budget_level".into()]));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = MissingFieldsState::new(Intent::FindHotel, vec![], Map::new());
        let b = MissingFieldsState::new(Intent::FindHotel, vec![], Map::new());
        assert_ne!(a.message_id, b.message_id);
    }
}
