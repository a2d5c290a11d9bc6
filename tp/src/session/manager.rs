//! SessionManager - one actor per conversation
//!
//! Each session owns its [`SessionState`] inside a spawned task and handles
//! commands from an mpsc channel in arrival order, so two turns of the same
//! conversation never interleave. A caller that stops waiting does not abort
//! a turn in progress; the turn finishes and its reply is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::messages::{SessionCommand, SessionError, SessionResponse};
use crate::engine::{Engine, LlmExtraction, SessionState, TurnOutcome};
use crate::itinerary::DayResolution;

const CHANNEL_CAPACITY: usize = 32;

/// Handle for routing commands to session actors
#[derive(Clone)]
pub struct SessionManager {
    engine: Arc<Engine>,
    sessions: Arc<Mutex<HashMap<String, mpsc::Sender<SessionCommand>>>>,
}

impl SessionManager {
    pub fn new(engine: Arc<Engine>) -> Self {
        debug!("SessionManager::new: called");
        Self {
            engine,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Sender for a session, spawning its actor on first use
    async fn sender_or_spawn(&self, session_id: &str) -> mpsc::Sender<SessionCommand> {
        let mut sessions = self.sessions.lock().await;
        if let Some(tx) = sessions.get(session_id).filter(|tx| !tx.is_closed()) {
            return tx.clone();
        }
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let state = self.engine.new_session();
        tokio::spawn(session_loop(session_id.to_string(), self.engine.clone(), state, rx));
        info!(%session_id, "Session started");
        sessions.insert(session_id.to_string(), tx.clone());
        tx
    }

    async fn sender(&self, session_id: &str) -> SessionResponse<mpsc::Sender<SessionCommand>> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Run one turn in a session, creating the session if needed
    pub async fn process_turn(
        &self,
        session_id: &str,
        message: &str,
        extraction: LlmExtraction,
    ) -> SessionResponse<TurnOutcome> {
        debug!(%session_id, "process_turn: called");
        let tx = self.sender_or_spawn(session_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(SessionCommand::ProcessTurn {
            message: message.to_string(),
            extraction: Box::new(extraction),
            reply: reply_tx,
        })
        .await
        .map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map(|o| *o).map_err(|_| SessionError::ChannelError)
    }

    /// Resolve a day reference against the session's itinerary
    pub async fn resolve_day(&self, session_id: &str, day_ref: &str) -> SessionResponse<Option<DayResolution>> {
        debug!(%session_id, %day_ref, "resolve_day: called");
        let tx = self.sender(session_id).await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(SessionCommand::ResolveDay {
            day_ref: day_ref.to_string(),
            reply: reply_tx,
        })
        .await
        .map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map_err(|_| SessionError::ChannelError)
    }

    /// Copy of the session's state
    pub async fn snapshot(&self, session_id: &str) -> SessionResponse<SessionState> {
        debug!(%session_id, "snapshot: called");
        let tx = self.sender(session_id).await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(SessionCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map(|s| *s).map_err(|_| SessionError::ChannelError)
    }

    /// Replace the session's state with a fresh one, memory included
    pub async fn reset(&self, session_id: &str) -> SessionResponse<()> {
        debug!(%session_id, "reset: called");
        let tx = self.sender(session_id).await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(SessionCommand::Reset { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map_err(|_| SessionError::ChannelError)
    }

    /// Stop a session's actor and forget it
    pub async fn shutdown(&self, session_id: &str) -> SessionResponse<()> {
        debug!(%session_id, "shutdown: called");
        let tx = self
            .sessions
            .lock()
            .await
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        tx.send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::ChannelError)
    }

    /// Stop every session
    pub async fn shutdown_all(&self) {
        let drained: Vec<(String, mpsc::Sender<SessionCommand>)> = self.sessions.lock().await.drain().collect();
        info!(count = drained.len(), "Shutting down all sessions");
        for (session_id, tx) in drained {
            if tx.send(SessionCommand::Shutdown).await.is_err() {
                debug!(%session_id, "shutdown_all: session already stopped");
            }
        }
    }

    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

async fn session_loop(
    session_id: String,
    engine: Arc<Engine>,
    mut state: SessionState,
    mut rx: mpsc::Receiver<SessionCommand>,
) {
    debug!(%session_id, "session_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SessionCommand::ProcessTurn {
                message,
                extraction,
                reply,
            } => {
                debug!(%session_id, "session_loop: ProcessTurn command");
                let outcome = engine.process_turn(&mut state, &message, *extraction).await;
                if reply.send(Box::new(outcome)).is_err() {
                    warn!(%session_id, "Turn finished after its caller went away");
                }
            }

            SessionCommand::ResolveDay { day_ref, reply } => {
                debug!(%session_id, %day_ref, "session_loop: ResolveDay command");
                let resolution = state
                    .itinerary
                    .as_ref()
                    .and_then(|itinerary| engine.resolve_day(itinerary, &day_ref));
                let _ = reply.send(resolution);
            }

            SessionCommand::Snapshot { reply } => {
                debug!(%session_id, "session_loop: Snapshot command");
                let _ = reply.send(Box::new(state.clone()));
            }

            SessionCommand::Reset { reply } => {
                info!(%session_id, "Session reset");
                state = engine.new_session();
                let _ = reply.send(());
            }

            SessionCommand::Shutdown => {
                info!(%session_id, "Session actor shutting down");
                break;
            }
        }
    }

    debug!(%session_id, "session_loop: exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConversationState, Intent};
    use crate::engine::EngineSettings;
    use crate::provider::mock::{MockGenerator, MockProvider};
    use serde_json::json;
    use std::time::Duration;

    fn manager_with(provider: MockProvider) -> SessionManager {
        let engine = Engine::new(
            EngineSettings::default(),
            Arc::new(provider),
            Arc::new(MockGenerator::with_text("Day 1: Arrival\n- Walk")),
        );
        SessionManager::new(Arc::new(engine))
    }

    fn weather_in_paris() -> LlmExtraction {
        LlmExtraction::new(
            Intent::WeatherRequest,
            json!({"city": "Paris", "time": "tomorrow"}).as_object().cloned().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let manager = manager_with(MockProvider::default());

        let a = manager.process_turn("a", "Weather tomorrow in Paris", weather_in_paris()).await.unwrap();
        assert_eq!(a.next_state, ConversationState::AskMissingFields);

        let b = manager.snapshot("a").await.unwrap();
        assert_eq!(b.state, ConversationState::AskMissingFields);
        assert!(matches!(manager.snapshot("b").await, Err(SessionError::NotFound(_))));

        manager
            .process_turn("b", "hi there", LlmExtraction::default())
            .await
            .unwrap();
        assert_eq!(manager.session_ids().await, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(manager.snapshot("b").await.unwrap().state, ConversationState::Idle);
        assert_eq!(manager.snapshot("a").await.unwrap().state, ConversationState::AskMissingFields);
    }

    #[tokio::test]
    async fn test_turns_in_one_session_are_serialized() {
        let manager = manager_with(MockProvider::default().delayed(Duration::from_millis(30)));
        let rome = || {
            LlmExtraction::new(
                Intent::FindAttractions,
                json!({"city": "Rome", "country": "Italy"}).as_object().cloned().unwrap(),
            )
        };

        let (first, second) = tokio::join!(
            manager.process_turn("s", "attractions in Rome", rome()),
            manager.process_turn("s", "attractions in Rome", rome()),
        );

        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first.transitions.first().map(|t| t.from), Some(ConversationState::Idle));
        assert_eq!(first.next_state, ConversationState::AdvisoryMode);
        assert_eq!(
            second.transitions.first().map(|t| t.from),
            Some(ConversationState::AdvisoryMode)
        );
    }

    #[tokio::test]
    async fn test_reset_and_shutdown() {
        let manager = manager_with(MockProvider::default());
        manager
            .process_turn("s", "Weather tomorrow in Paris", weather_in_paris())
            .await
            .unwrap();

        manager.reset("s").await.unwrap();
        let state = manager.snapshot("s").await.unwrap();
        assert_eq!(state.state, ConversationState::Idle);
        assert!(state.memory.is_empty());
        assert!(manager.resolve_day("s", "day 1").await.unwrap().is_none());

        manager.shutdown("s").await.unwrap();
        assert!(matches!(manager.shutdown("s").await, Err(SessionError::NotFound(_))));
        assert!(manager.session_ids().await.is_empty());
    }
}
