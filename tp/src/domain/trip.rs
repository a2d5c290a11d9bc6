//! Trip draft - the accumulating record of trip-planning fields

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::Intent;
use crate::requirements;

/// Canonical budget vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Cheap,
    Moderate,
    Luxury,
}

impl BudgetLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheap => "cheap",
            Self::Moderate => "moderate",
            Self::Luxury => "luxury",
        }
    }

    /// Parse canonical spelling only; synonyms go through the field normalizer
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cheap" => Some(Self::Cheap),
            "moderate" => Some(Self::Moderate),
            "luxury" => Some(Self::Luxury),
            _ => None,
        }
    }
}

impl std::fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trip dates (ISO strings)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl DateRange {
    pub fn new(from: impl Into<String>, to: Option<String>) -> Self {
        Self {
            from: Some(from.into()),
            to,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from.as_deref().is_none_or(str::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
}

/// Mutable trip-planning record, one per session
///
/// Fields are merged in turn by turn and never replaced wholesale; see
/// [`crate::merger`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vacation_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_level: Option<BudgetLevel>,
    #[serde(default)]
    pub constraints: TripConstraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travelers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TripDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the budget and keep `budget_level` and `constraints.budget` in step
    pub fn set_budget(&mut self, value: impl Into<String>) {
        let value = value.into();
        debug!(%value, "TripDraft::set_budget: called");
        self.budget_level = BudgetLevel::parse(&value);
        self.constraints.budget = Some(value.clone());
        self.budget = Some(value);
    }

    /// Flatten into the JSON shape the requirement registry reads
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(v) = &self.vacation_location {
            map.insert("vacation_location".into(), json!(v));
        }
        if let Some(v) = &self.city {
            map.insert("city".into(), json!(v));
        }
        if let Some(v) = &self.country {
            map.insert("country".into(), json!(v));
        }
        if let Some(v) = self.duration {
            map.insert("duration".into(), json!(v));
        }
        if let Some(d) = &self.dates
            && !d.is_empty()
        {
            map.insert("dates".into(), json!(d));
        }
        let budget = self
            .budget
            .clone()
            .or_else(|| self.budget_level.map(|l| l.as_str().to_string()));
        if let Some(b) = budget {
            map.insert("budget".into(), json!(b));
        }
        if let Some(l) = self.budget_level {
            map.insert("budget_level".into(), json!(l));
        }
        if let Some(t) = self.travelers {
            map.insert("travelers".into(), json!(t));
        }
        if let Some(n) = &self.notes {
            map.insert("notes".into(), json!(n));
        }
        map
    }

    /// Required trip fields still missing, in registry order
    pub fn missing_fields(&self) -> Vec<String> {
        requirements::compute_missing(Intent::TripBuilding, &self.to_fields())
    }

    /// Complete iff location, duration, dates and budget are all present
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// One-line-per-field summary for the confirmation message
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(loc) = &self.vacation_location {
            lines.push(format!("Destination: {}", loc));
        }
        if let Some(d) = self.duration {
            lines.push(format!("Duration: {} days", d));
        }
        if let Some(dates) = &self.dates {
            match (&dates.from, &dates.to) {
                (Some(from), Some(to)) => lines.push(format!("Dates: {} to {}", from, to)),
                (Some(from), None) => lines.push(format!("Dates: from {}", from)),
                _ => {}
            }
        }
        if let Some(b) = &self.budget {
            lines.push(format!("Budget: {}", b));
        }
        if let Some(t) = self.travelers {
            lines.push(format!("Travelers: {}", t));
        }
        if let Some(n) = &self.notes {
            lines.push(format!("Notes: {}", n));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> TripDraft {
        let mut draft = TripDraft::new();
        draft.vacation_location = Some("Rome, Italy".to_string());
        draft.duration = Some(5);
        draft.dates = Some(DateRange::new("2025-06-15", Some("2025-06-20".to_string())));
        draft.set_budget("moderate");
        draft
    }

    #[test]
    fn test_complete_draft() {
        let draft = complete_draft();
        assert!(draft.is_complete());
        assert!(draft.missing_fields().is_empty());
    }

    #[test]
    fn test_each_missing_field_breaks_completeness() {
        let mut d = complete_draft();
        d.vacation_location = None;
        assert_eq!(d.missing_fields(), vec!["vacation_location"]);

        let mut d = complete_draft();
        d.duration = None;
        assert!(!d.is_complete());

        let mut d = complete_draft();
        d.dates = Some(DateRange::default());
        assert_eq!(d.missing_fields(), vec!["dates"]);

        let mut d = complete_draft();
        d.budget = None;
        d.budget_level = None;
        assert_eq!(d.missing_fields(), vec!["budget"]);
    }

    #[test]
    fn test_set_budget_mirrors() {
        let mut d = TripDraft::new();
        d.set_budget("luxury");
        assert_eq!(d.budget_level, Some(BudgetLevel::Luxury));
        assert_eq!(d.constraints.budget.as_deref(), Some("luxury"));

        d.set_budget("2000 EUR");
        assert_eq!(d.budget_level, None);
        assert_eq!(d.budget.as_deref(), Some("2000 EUR"));
    }

    #[test]
    fn test_summary_lists_fields() {
        let summary = complete_draft().summary();
        assert!(summary.contains("Rome, Italy"));
        assert!(summary.contains("5 days"));
        assert!(summary.contains("2025-06-15 to 2025-06-20"));
    }
}
