//! Session actor messages

use thiserror::Error;
use tokio::sync::oneshot;

use crate::engine::{LlmExtraction, SessionState, TurnOutcome};
use crate::itinerary::DayResolution;

/// Errors from session operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from session operations
pub type SessionResponse<T> = Result<T, SessionError>;

/// Commands sent to one session's actor
#[derive(Debug)]
pub enum SessionCommand {
    ProcessTurn {
        message: String,
        extraction: Box<LlmExtraction>,
        reply: oneshot::Sender<Box<TurnOutcome>>,
    },
    ResolveDay {
        day_ref: String,
        reply: oneshot::Sender<Option<DayResolution>>,
    },
    Snapshot {
        reply: oneshot::Sender<Box<SessionState>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}
