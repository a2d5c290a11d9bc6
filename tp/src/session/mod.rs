//! Session management
//!
//! One actor task per conversation serializes that conversation's turns;
//! different conversations run independently.

mod manager;
mod messages;

pub use manager::SessionManager;
pub use messages::{SessionCommand, SessionError, SessionResponse};
