//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files.
//!
//! Template loading chain:
//! 1. `{prompts.dir}/{name}.pmt` (user override, from config)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{ClassifyContext, ComposeContext, IntentEntry, ItineraryContext, PromptLoader};
