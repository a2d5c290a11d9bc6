//! REPL session management

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;
use uuid::Uuid;

use crate::assistant::{Assistant, ExtractionSource};
use crate::engine::SessionState;

/// Result of handling a slash command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashResult {
    Help,
    State,
    Draft,
    Reset,
    Quit,
    Unknown,
}

/// Map a `/command` line to what it asks for
pub fn parse_slash(input: &str) -> SlashResult {
    match input.split_whitespace().next().unwrap_or("") {
        "/help" | "/h" => SlashResult::Help,
        "/state" | "/s" => SlashResult::State,
        "/draft" | "/d" => SlashResult::Draft,
        "/reset" | "/r" => SlashResult::Reset,
        "/quit" | "/q" | "/exit" => SlashResult::Quit,
        _ => SlashResult::Unknown,
    }
}

/// Interactive chat over one conversation
pub struct ReplSession {
    assistant: Assistant,
    session_id: String,
}

impl ReplSession {
    pub fn new(assistant: Assistant) -> Self {
        let session_id = Uuid::now_v7().to_string();
        debug!(%session_id, "ReplSession::new: called");
        Self { assistant, session_id }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial_message: Option<String>) -> Result<()> {
        self.print_welcome();

        if let Some(message) = initial_message {
            println!("{} {}", ">".bright_green(), message);
            self.process_user_input(&message).await?;
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            match rl.readline(&format!("{} ", ">".bright_green())) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        if self.handle_slash_command(input).await? == SlashResult::Quit {
                            break;
                        }
                    } else {
                        self.process_user_input(input).await?;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        self.assistant.sessions().shutdown_all().await;
        println!("Safe travels!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Trip Planner".bright_cyan().bold());
        let mode = if self.assistant.uses_model() {
            "model classification"
        } else {
            "offline extraction"
        };
        println!("Running with {}", mode.dimmed());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn handle_slash_command(&mut self, input: &str) -> Result<SlashResult> {
        let result = parse_slash(input);
        match result {
            SlashResult::Help => self.print_help(),
            SlashResult::State => match self.state().await {
                Some(state) => print_state(&state),
                None => println!("{}", "No conversation yet.".dimmed()),
            },
            SlashResult::Draft => match self.state().await {
                Some(state) if !state.draft.summary().is_empty() => {
                    println!();
                    println!("{}", "Trip draft:".bright_cyan());
                    println!("{}", state.draft.summary());
                    println!();
                }
                _ => println!("{}", "The trip draft is empty.".dimmed()),
            },
            SlashResult::Reset => {
                if self.assistant.sessions().reset(&self.session_id).await.is_err() {
                    debug!("handle_slash_command: nothing to reset");
                }
                println!("{}", "Conversation reset.".dimmed());
            }
            SlashResult::Quit => {}
            SlashResult::Unknown => {
                let cmd = input.split_whitespace().next().unwrap_or(input);
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        Ok(result)
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Show the conversation state", "/state".yellow());
        println!("  {:14} Show the trip draft", "/draft".yellow());
        println!("  {:14} Forget everything and start fresh", "/reset".yellow());
        println!("  {:14} Exit", "/quit".yellow());
        println!();
        println!("Say {} at any time to drop the current plan.", "\"start over\"".yellow());
        println!();
    }

    async fn state(&self) -> Option<SessionState> {
        self.assistant.sessions().snapshot(&self.session_id).await.ok()
    }

    async fn process_user_input(&mut self, input: &str) -> Result<()> {
        let reply = self
            .assistant
            .respond(&self.session_id, input)
            .await
            .map_err(|e| eyre::eyre!("Conversation failed: {}", e))?;

        println!();
        println!("{}", reply.text);
        if reply.outcome.flags.needs_year_confirmation {
            println!("{}", "(the year of that date was inferred)".dimmed());
        }
        let source = match reply.source {
            ExtractionSource::Model => "model",
            ExtractionSource::Offline => "offline",
        };
        debug!(source, state = %reply.outcome.next_state, "process_user_input: answered");
        println!();
        Ok(())
    }
}

fn print_state(state: &SessionState) {
    println!();
    println!("{}", "Conversation:".bright_cyan());
    println!("  {:12} {}", "state".yellow(), state.state);
    if let Some(mode) = state.mode {
        println!("  {:12} {:?}", "mode".yellow(), mode);
    }
    if let Some(intent) = state.last_intent {
        println!("  {:12} {}", "last intent".yellow(), intent);
    }
    if let Some(missing) = state.missing.as_ref().filter(|m| !m.submitted) {
        println!("  {:12} {}", "waiting for".yellow(), missing.fields.join(", "));
    }
    if let Some(itinerary) = &state.itinerary {
        println!(
            "  {:12} {} ({} days)",
            "itinerary".yellow(),
            itinerary.title,
            itinerary.days.len()
        );
    }
    let remembered: Vec<String> = state.memory.intents().map(|i| i.to_string()).collect();
    if !remembered.is_empty() {
        println!("  {:12} {}", "recent".yellow(), remembered.join(", "));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(parse_slash("/state"), SlashResult::State);
        assert_eq!(parse_slash("/draft please"), SlashResult::Draft);
        assert_eq!(parse_slash("/reset"), SlashResult::Reset);
        assert_eq!(parse_slash("/q"), SlashResult::Quit);
        assert_eq!(parse_slash("/exit"), SlashResult::Quit);
        assert_eq!(parse_slash("/help"), SlashResult::Help);
        assert_eq!(parse_slash("/weather"), SlashResult::Unknown);
    }
}
