//! Interactive chat for the trip planner
//!
//! A readline loop over one [`crate::assistant::Assistant`] session, with
//! slash commands to inspect and reset the conversation.

mod session;

pub use session::{ReplSession, SlashResult, parse_slash};

use eyre::Result;

use crate::assistant::Assistant;
use crate::config::Config;

/// Run the interactive chat
///
/// This is the main entry point for `tp chat`.
pub async fn run_interactive(config: &Config, initial_message: Option<String>) -> Result<()> {
    let assistant = Assistant::from_config(config)?;
    let mut session = ReplSession::new(assistant);
    session.run(initial_message).await
}
