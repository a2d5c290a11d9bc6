//! Outbound collaborators: external data, itinerary generation, persistence
//!
//! The engine only sees the traits; the HTTP provider, the LLM generator and
//! the transcript writers are the concrete implementations the binary wires
//! up.

mod error;
mod generator;
mod http;
pub mod mock;
mod persistence;
mod router;
mod traits;

pub use error::{ProviderError, RouterError};
pub use generator::{LlmItineraryGenerator, OfflineItineraryGenerator};
pub use http::{HttpDataProvider, UnavailableProvider, endpoint};
pub use persistence::{JsonlTranscript, TracingPersistence};
pub use router::{ExternalDataRouter, PreparedRequest, RoutedData, format_block};
pub use traits::{ChatPersistence, ExternalDataProvider, GeneratedItinerary, ItineraryGenerator, ProviderResponse};
