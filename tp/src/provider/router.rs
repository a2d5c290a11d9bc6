//! ExternalDataRouter
//!
//! Validates a completed intent's parameters, fills in what can be inferred,
//! gates weather requests on the forecast horizon, calls the provider and turns
//! its payload into a text block ready to be put in a prompt.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ExternalDataProvider, RouterError};
use crate::domain::Intent;
use crate::normalize::{ForecastHorizon, compute_forecast_horizon, parse_iso, resolve_city, resolve_relative};
use crate::requirements::{compute_missing, is_empty_value};

/// Parameters checked and completed, ready to dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedRequest {
    pub intent: Intent,
    pub params: Map<String, Value>,
    pub forecast: Option<ForecastHorizon>,
}

impl PreparedRequest {
    pub fn beyond_forecast_horizon(&self) -> bool {
        self.forecast.is_some_and(|f| f.beyond_limit)
    }
}

/// Result of routing one request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedData {
    pub intent: Intent,
    /// Prompt-ready text
    pub block: String,
    pub beyond_forecast_horizon: bool,
    /// False when no capability exists for the intent
    pub implemented: bool,
    pub payload: Map<String, Value>,
}

fn uses_location(intent: Intent) -> bool {
    matches!(
        intent,
        Intent::WeatherRequest | Intent::FindHotel | Intent::FindAttractions | Intent::FindRestaurants
    )
}

fn text(params: &Map<String, Value>, key: &str) -> Option<String> {
    params
        .get(key)
        .filter(|v| !is_empty_value(v))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

pub struct ExternalDataRouter {
    provider: Arc<dyn ExternalDataProvider>,
    horizon_days: i64,
}

impl ExternalDataRouter {
    pub fn new(provider: Arc<dyn ExternalDataProvider>, horizon_days: i64) -> Self {
        Self { provider, horizon_days }
    }

    pub fn horizon_days(&self) -> i64 {
        self.horizon_days
    }

    /// Check and complete the parameters for `intent`
    ///
    /// A known city with no country gets its country filled in; an unknown
    /// one fails with `IncompleteLocationData`. Weather dates are resolved to
    /// ISO and measured against the forecast horizon.
    pub fn prepare(&self, intent: Intent, params: &Map<String, Value>, today: NaiveDate) -> Result<PreparedRequest, RouterError> {
        debug!(%intent, fields = params.len(), "ExternalDataRouter::prepare: called");
        let mut params = params.clone();

        if uses_location(intent) {
            let city = text(&params, "city");
            let country = text(&params, "country");
            match (city, country) {
                (Some(city), None) => match resolve_city(&city) {
                    Some(location) => {
                        let country = location.country.unwrap_or_default();
                        info!(%city, %country, "Inferred country from known city");
                        if let Some(canonical) = location.city {
                            params.insert("city".into(), Value::String(canonical));
                        }
                        params.insert("country".into(), Value::String(country));
                    }
                    None => {
                        warn!(%intent, %city, "Cannot infer country for unknown city");
                        return Err(RouterError::IncompleteLocationData {
                            intent,
                            missing: vec!["country".to_string()],
                        });
                    }
                },
                (None, _) => {
                    let missing = compute_missing(intent, &params)
                        .into_iter()
                        .filter(|f| f == "city" || f == "country")
                        .collect();
                    return Err(RouterError::IncompleteLocationData { intent, missing });
                }
                (Some(_), Some(_)) => {}
            }
        }

        let missing = compute_missing(intent, &params);
        if !missing.is_empty() {
            debug!(%intent, ?missing, "prepare: required fields missing");
            return Err(RouterError::MissingRequiredField { intent, missing });
        }

        let mut forecast = None;
        if intent == Intent::WeatherRequest {
            let term = text(&params, "date").or_else(|| text(&params, "time")).unwrap_or_default();
            let resolved = resolve_relative(&term, today);
            if let Some(date) = parse_iso(&resolved) {
                let horizon = compute_forecast_horizon(date, today, self.horizon_days);
                debug!(%date, ?horizon, "prepare: weather date resolved");
                params.insert("date".into(), Value::String(resolved));
                forecast = Some(horizon);
            } else {
                debug!(%term, "prepare: weather time is not a date, using current forecast");
            }
        }

        Ok(PreparedRequest {
            intent,
            params,
            forecast,
        })
    }

    /// Call the provider for a prepared request
    ///
    /// Never retries; `success: false` and transport errors both become
    /// `ExternalFetchFailure`.
    pub async fn dispatch(&self, prepared: &PreparedRequest) -> Result<RoutedData, RouterError> {
        let intent = prepared.intent;
        debug!(%intent, "ExternalDataRouter::dispatch: called");

        if !intent.is_external() || !self.provider.supports(intent) {
            info!(%intent, "No external capability for intent");
            let mut payload = Map::new();
            payload.insert("success".into(), Value::Bool(false));
            payload.insert("error".into(), Value::String("not implemented".into()));
            return Ok(RoutedData {
                intent,
                block: format!("No external data source is available for {}.", intent.describe()),
                beyond_forecast_horizon: false,
                implemented: false,
                payload,
            });
        }

        if let Some(horizon) = prepared.forecast.filter(|f| f.beyond_limit) {
            info!(%intent, days = horizon.days_in_future, "Date beyond forecast horizon, using advisory response");
            let mut payload = Map::new();
            payload.insert("advisory".into(), Value::Bool(true));
            payload.insert("daysInFuture".into(), Value::from(horizon.days_in_future));
            return Ok(RoutedData {
                intent,
                block: advisory_block(&prepared.params, horizon, self.horizon_days),
                beyond_forecast_horizon: true,
                implemented: true,
                payload,
            });
        }

        match self.provider.fetch(intent, &prepared.params).await {
            Ok(response) if response.success => {
                debug!(%intent, "dispatch: provider success");
                Ok(RoutedData {
                    intent,
                    block: format_block(intent, &prepared.params, &response.payload),
                    beyond_forecast_horizon: false,
                    implemented: true,
                    payload: response.payload,
                })
            }
            Ok(response) => {
                let message = response.error_message().unwrap_or("provider reported failure").to_string();
                warn!(%intent, %message, "External provider reported failure");
                Err(RouterError::ExternalFetchFailure { intent, message })
            }
            Err(e) => {
                warn!(%intent, error = %e, "External fetch failed");
                Err(RouterError::ExternalFetchFailure {
                    intent,
                    message: e.to_string(),
                })
            }
        }
    }

    /// `prepare` then `dispatch`
    pub async fn route(&self, intent: Intent, params: &Map<String, Value>, today: NaiveDate) -> Result<RoutedData, RouterError> {
        let prepared = self.prepare(intent, params, today)?;
        self.dispatch(&prepared).await
    }
}

fn location_line(params: &Map<String, Value>) -> Option<String> {
    match (text(params, "city"), text(params, "country")) {
        (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
        (Some(one), None) | (None, Some(one)) => Some(one),
        (None, None) => None,
    }
}

fn advisory_block(params: &Map<String, Value>, horizon: ForecastHorizon, horizon_days: i64) -> String {
    let mut block = String::from("[Weather advisory]\n");
    if let Some(loc) = location_line(params) {
        let _ = writeln!(block, "Location: {}", loc);
    }
    if let Some(date) = text(params, "date") {
        let _ = writeln!(block, "Date: {}", date);
    }
    let _ = writeln!(
        block,
        "The date is {} days ahead, beyond the {}-day live forecast window. \
         Describe typical seasonal conditions instead of a forecast and say so.",
        horizon.days_in_future, horizon_days
    );
    block
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Render a provider payload as a compact text block
pub fn format_block(intent: Intent, params: &Map<String, Value>, payload: &Map<String, Value>) -> String {
    let mut block = format!("[External data: {}]\n", intent.as_str());
    if let Some(loc) = location_line(params) {
        let _ = writeln!(block, "Location: {}", loc);
    }
    if let Some(date) = text(params, "date").or_else(|| text(params, "time")) {
        let _ = writeln!(block, "When: {}", date);
    }
    for (key, value) in payload {
        if key == "success" {
            continue;
        }
        match value {
            Value::Array(items) => {
                let _ = writeln!(block, "{}:", key);
                for item in items {
                    let line = match item {
                        Value::Object(obj) => obj
                            .get("name")
                            .or_else(|| obj.get("title"))
                            .and_then(scalar)
                            .map(|name| {
                                let rest: Vec<String> = obj
                                    .iter()
                                    .filter(|(k, _)| *k != "name" && *k != "title")
                                    .filter_map(|(k, v)| scalar(v).map(|v| format!("{}: {}", k, v)))
                                    .collect();
                                if rest.is_empty() { name } else { format!("{} ({})", name, rest.join(", ")) }
                            })
                            .unwrap_or_else(|| item.to_string()),
                        other => scalar(other).unwrap_or_else(|| other.to_string()),
                    };
                    let _ = writeln!(block, "- {}", line);
                }
            }
            Value::Object(_) => {
                let _ = writeln!(block, "{}: {}", key, value);
            }
            other => {
                if let Some(v) = scalar(other) {
                    let _ = writeln!(block, "{}: {}", key, v);
                }
            }
        }
    }
    block
}
