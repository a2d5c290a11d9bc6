//! Normalization of extracted data: locations, field vocabulary, dates

pub mod datetime;
pub mod fields;
pub mod location;

pub use datetime::{
    Clock, FixedClock, ForecastHorizon, SystemClock, compute_forecast_horizon, normalize_time_context, parse_date,
    parse_iso, resolve_date, resolve_relative,
};
pub use fields::{budget_level_for, normalize, split_location, standardize_budget, validate_and_clean};
pub use location::{Location, canonical_country, infer_from_text, resolve_city, split_country_suffix};
