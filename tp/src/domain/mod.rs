//! Domain types for the trip planner
//!
//! Intents, conversation states, the trip draft, advice requests and the
//! structured itinerary. Everything here is plain data plus the small amount of
//! logic that keeps each type's invariants.

mod advice;
mod intent;
mod itinerary;
mod state;
mod trip;

pub use advice::{AdviceRequest, AdviceStatus, MissingFieldsState};
pub use intent::{Intent, Mode, sanitize_intent, sanitize_intent_value};
pub use itinerary::{ItineraryDay, StructuredItinerary};
pub use state::ConversationState;
pub use trip::{BudgetLevel, DateRange, TripConstraints, TripDraft};
