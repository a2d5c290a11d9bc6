//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Intent/data extraction prompt
pub const CLASSIFY: &str = include_str!("../../prompts/classify.pmt");

/// Answer composition over fetched travel data
pub const COMPOSE: &str = include_str!("../../prompts/compose.pmt");

/// Day-by-day itinerary generation
pub const ITINERARY: &str = include_str!("../../prompts/itinerary.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "classify" => Some(CLASSIFY),
        "compose" => Some(COMPOSE),
        "itinerary" => Some(ITINERARY),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
