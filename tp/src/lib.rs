//! Trip Planner - conversational travel assistant core
//!
//! Reconciles what a language model says about a user's message with locally
//! enforced rules: allowed intents, required fields per intent, an explicit
//! conversation state machine, and normalization of locations, dates and
//! budgets. The model proposes; the engine decides.
//!
//! # Core Concepts
//!
//! - **Sanitized intents**: model labels outside the allowed set are coerced
//! - **Required fields**: external data is only fetched once a request is complete
//! - **Explicit transitions**: every state change goes through the transition table
//! - **Itinerary follow-ups**: "day 3" resolves to a concrete date and place
//!
//! # Modules
//!
//! - [`engine`] - One conversation turn, end to end
//! - [`machine`] - Conversation state machine
//! - [`session`] - Per-conversation actors
//! - [`assistant`] - Classification, engine, composition and persistence together
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`provider`] - External data, itinerary generation and transcript storage
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod assistant;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod extract;
pub mod itinerary;
pub mod llm;
pub mod machine;
pub mod matcher;
pub mod memory;
pub mod merger;
pub mod normalize;
pub mod prompts;
pub mod provider;
pub mod repl;
pub mod requirements;
pub mod session;

pub use assistant::{Assistant, ExtractionSource, Reply};
pub use config::{Config, LlmConfig};
pub use domain::{ConversationState, Intent, Mode, StructuredItinerary, TripDraft};
pub use engine::{Engine, EngineSettings, LlmExtraction, SessionState, TurnError, TurnOutcome};
pub use extract::OfflineExtractor;
pub use itinerary::{DayResolution, resolve_day_reference};
pub use llm::{AnthropicClient, LlmClient, LlmError, create_client};
pub use machine::{StateMachine, Transition, TransitionError, Trigger};
pub use prompts::PromptLoader;
pub use session::{SessionError, SessionManager};
