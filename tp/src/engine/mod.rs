//! Conversation engine
//!
//! [`Engine::process_turn`] takes the session, the user's message and what the
//! classifier extracted from it, and produces the next state, a reply and the
//! updated draft and memory. It never fails: every problem is recorded in
//! [`TurnOutcome::errors`] and the session is left in a valid state.
//!
//! Turn order:
//! 1. a start-over phrase resets the session
//! 2. in AWAITING_USER_TRIP_CONFIRMATION the reply is confirm/edit/cancel
//! 3. an acknowledgment drops any collection and goes to IDLE
//! 4. a recognized model-named state selects its flow, subject to entry guards
//! 5. otherwise the flow is derived from intent, data and session

mod flows;
mod replies;
mod types;

pub use replies::locale_for;
pub use types::{LlmExtraction, PendingInfo, SessionState, TurnError, TurnFlags, TurnOutcome};

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ConversationConfig;
use crate::domain::{ConversationState, Intent, StructuredItinerary, sanitize_intent_value};
use crate::itinerary::{DayResolution, resolve_day_reference};
use crate::machine::{StateMachine, TransitionError, Trigger, parse_model_state};
use crate::matcher::{Locale, Matchers};
use crate::memory::ConversationMemory;
use crate::merger::MergeRules;
use crate::normalize::{Clock, SystemClock, normalize, normalize_time_context};
use crate::provider::{ExternalDataProvider, ExternalDataRouter, ItineraryGenerator};

/// Engine tuning, usually taken from the `conversation` config section
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub forecast_horizon_days: i64,
    pub fetch_timeout: Duration,
    pub default_locale: Locale,
    pub merge_rules: MergeRules,
    pub memory_capacity: usize,
    pub memory_ttl_hours: i64,
    pub ack_max_tokens: usize,
}

impl EngineSettings {
    pub fn from_config(config: &ConversationConfig) -> Self {
        Self {
            forecast_horizon_days: config.forecast_horizon_days,
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            default_locale: config.default_locale.into(),
            merge_rules: MergeRules::default(),
            memory_capacity: config.memory_capacity,
            memory_ttl_hours: config.memory_ttl_hours,
            ack_max_tokens: config.ack_max_tokens,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&ConversationConfig::default())
    }
}

pub struct Engine {
    matchers: Matchers,
    router: ExternalDataRouter,
    generator: Arc<dyn ItineraryGenerator>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        provider: Arc<dyn ExternalDataProvider>,
        generator: Arc<dyn ItineraryGenerator>,
    ) -> Self {
        debug!(?settings, "Engine::new: called");
        Self {
            matchers: Matchers::new(settings.ack_max_tokens),
            router: ExternalDataRouter::new(provider, settings.forecast_horizon_days),
            generator,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn matchers(&self) -> &Matchers {
        &self.matchers
    }

    /// Fresh session with memory sized from the settings
    pub fn new_session(&self) -> SessionState {
        SessionState::new(ConversationMemory::new(
            self.settings.memory_capacity,
            self.settings.memory_ttl_hours,
        ))
    }

    /// Resolve a day reference against an itinerary, relative to today
    pub fn resolve_day(&self, itinerary: &StructuredItinerary, day_ref: &str) -> Option<DayResolution> {
        resolve_day_reference(itinerary, day_ref, self.clock.today())
    }

    /// Process one user turn
    pub async fn process_turn(&self, session: &mut SessionState, message: &str, extraction: LlmExtraction) -> TurnOutcome {
        debug!(state = %session.state, len = message.len(), "process_turn: called");
        let mut turn = Turn::new(session.state, locale_for(message, self.settings.default_locale));
        session.memory.expire_if_stale(self.clock.now());

        if self.matchers.is_start_over(message) {
            debug!("process_turn: start over");
            session.start_over();
            turn.fire(Trigger::StartOver);
            turn.response = Some(replies::start_over(turn.locale));
            return turn.finish(session);
        }

        let data = self.interpret(&extraction, &mut turn);

        if session.state == ConversationState::AwaitingUserTripConfirmation {
            self.confirmation_flow(session, &mut turn, message, &extraction, data).await;
            return turn.finish(session);
        }

        if self.matchers.is_acknowledgment(message) {
            debug!("process_turn: acknowledgment");
            session.clear_collection();
            turn.fire(Trigger::Acknowledged);
            turn.response = Some(
                extraction
                    .reply()
                    .map(str::to_string)
                    .unwrap_or_else(|| replies::acknowledged(turn.locale)),
            );
            return turn.finish(session);
        }

        match model_directed(&extraction) {
            Some(Ok(ConversationState::AnalyzingInput)) | None => {}
            Some(Ok(state)) => {
                if self
                    .directed_flow(session, &mut turn, state, message, &extraction, data.clone())
                    .await
                {
                    return turn.finish(session);
                }
            }
            Some(Err(TransitionError::UnknownState(name))) => {
                turn.errors.push(TurnError::StateTransitionAmbiguous { name });
            }
            Some(Err(e)) => warn!(error = %e, "process_turn: unexpected transition error"),
        }

        self.derived_flow(session, &mut turn, message, &extraction, data).await;
        turn.finish(session)
    }

    /// Sanitize the intent and normalize the data
    fn interpret(&self, extraction: &LlmExtraction, turn: &mut Turn) -> Map<String, Value> {
        let intent = sanitize_intent_value(&extraction.intent);
        if intent == Intent::GeneralQuery {
            let raw = match &extraction.intent {
                Value::String(s) => s.trim().to_string(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            if !raw.is_empty() && Intent::from_label(&raw).is_none() {
                turn.errors.push(TurnError::UnknownIntent { raw });
            }
        }

        let mut data = normalize(&extraction.data);
        add_time_context(&mut data);
        debug!(%intent, fields = data.len(), "interpret: done");
        turn.intent = intent;
        turn.data = data.clone();
        data
    }
}

/// The model's requested state, from `next_state` or else `next_action`
fn model_directed(extraction: &LlmExtraction) -> Option<Result<ConversationState, TransitionError>> {
    if let Some(name) = &extraction.next_state {
        return Some(parse_model_state(name));
    }
    extraction
        .next_action
        .as_deref()
        .and_then(ConversationState::parse)
        .map(Ok)
}

/// Derive `timeContext` from `time` when the model left it out
pub(crate) fn add_time_context(data: &mut Map<String, Value>) {
    if data.contains_key("timeContext") {
        return;
    }
    if let Some(time) = data.get("time").and_then(Value::as_str) {
        let context = normalize_time_context(time);
        data.insert("timeContext".into(), Value::String(context));
    }
}

/// Per-turn scratch state, folded into a [`TurnOutcome`] at the end
struct Turn {
    machine: StateMachine,
    locale: Locale,
    intent: Intent,
    data: Map<String, Value>,
    response: Option<String>,
    external_context: Option<String>,
    missing_fields: Vec<String>,
    day_context: Option<DayResolution>,
    errors: Vec<TurnError>,
    duplicate_suppressed: bool,
    flags: TurnFlags,
}

impl Turn {
    fn new(state: ConversationState, locale: Locale) -> Self {
        Self {
            machine: StateMachine::new(state),
            locale,
            intent: Intent::GeneralQuery,
            data: Map::new(),
            response: None,
            external_context: None,
            missing_fields: Vec::new(),
            day_context: None,
            errors: Vec::new(),
            duplicate_suppressed: false,
            flags: TurnFlags::default(),
        }
    }

    fn state(&self) -> ConversationState {
        self.machine.state()
    }

    /// Fire a trigger; a rejected trigger leaves the state as it was
    fn fire(&mut self, trigger: Trigger) -> bool {
        match self.machine.fire(trigger) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Trigger rejected, state unchanged");
                false
            }
        }
    }

    fn reply_or(&self, extraction: &LlmExtraction, fallback: impl FnOnce(Locale) -> String) -> String {
        extraction
            .reply()
            .map(str::to_string)
            .unwrap_or_else(|| fallback(self.locale))
    }

    fn finish(self, session: &mut SessionState) -> TurnOutcome {
        let next_state = self.machine.state();
        session.state = next_state;
        debug!(%next_state, errors = self.errors.len(), "Turn::finish: called");
        let response = self.response.unwrap_or_else(|| replies::general(self.locale));
        TurnOutcome {
            next_state,
            response,
            intent: self.intent,
            transitions: self.machine.into_transitions(),
            updated_draft: session.draft.clone(),
            updated_memory: session.memory.clone(),
            data: self.data,
            external_context: self.external_context,
            missing_fields: self.missing_fields,
            advice: session.advice.clone(),
            day_context: self.day_context,
            itinerary: session.itinerary.clone(),
            errors: self.errors,
            duplicate_suppressed: self.duplicate_suppressed,
            flags: self.flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{MockGenerator, MockProvider};
    use crate::normalize::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;

    const ROME: &str = "Rome Getaway
Destination: Rome, Italy
Dates: 2025-06-15 to 2025-06-17

Day 1: Arrival
Date: 2025-06-15
Location: Rome, Italy
- Colosseum at sunset

Day 2: Vatican
Date: 2025-06-16
- Vatican Museums

Day 3: Departure
Date: 2025-06-17
- Lunch in Trastevere
";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()
    }

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn extraction(intent: Intent, value: Value) -> LlmExtraction {
        LlmExtraction::new(intent, data(value))
    }

    fn engine_with(provider: Arc<MockProvider>, generator: Arc<MockGenerator>, settings: EngineSettings) -> Engine {
        Engine::new(settings, provider, generator).with_clock(Arc::new(FixedClock::on(today())))
    }

    fn engine() -> (Engine, Arc<MockProvider>, Arc<MockGenerator>) {
        let provider = Arc::new(MockProvider::with_payload(data(json!({"forecast": "sunny", "high": 31}))));
        let generator = Arc::new(MockGenerator::with_text(ROME));
        let engine = engine_with(provider.clone(), generator.clone(), EngineSettings::default());
        (engine, provider, generator)
    }

    fn complete_trip() -> LlmExtraction {
        extraction(
            Intent::TripBuilding,
            json!({
                "vacation_location": "Rome, Italy",
                "duration": 3,
                "dates": "2025-06-15 to 2025-06-17",
                "budget": "moderate"
            }),
        )
    }

    async fn awaiting_confirmation(engine: &Engine) -> SessionState {
        let mut session = engine.new_session();
        let outcome = engine
            .process_turn(&mut session, "3 days in Rome from June 15, moderate budget", complete_trip())
            .await;
        assert_eq!(outcome.next_state, ConversationState::AwaitingUserTripConfirmation);
        session
    }

    async fn displaying_itinerary(engine: &Engine) -> SessionState {
        let mut session = awaiting_confirmation(engine).await;
        let outcome = engine
            .process_turn(&mut session, "yes", LlmExtraction::default())
            .await;
        assert_eq!(outcome.next_state, ConversationState::DisplayingItinerary);
        session
    }

    #[tokio::test]
    async fn test_model_directed_weather_fetch() {
        let (engine, provider, _) = engine();
        let mut session = engine.new_session();
        let ex = extraction(
            Intent::WeatherRequest,
            json!({"city": "Tel Aviv", "country": "Israel", "time": "now"}),
        )
        .with_next_state(ConversationState::FetchingExternalData);

        let outcome = engine
            .process_turn(&mut session, "What's the weather now in Tel Aviv, Israel?", ex)
            .await;

        assert_eq!(provider.call_count(), 1);
        assert_eq!(outcome.next_state, ConversationState::AdvisoryMode);
        assert_eq!(outcome.transitions[0].to, ConversationState::FetchingExternalData);
        assert!(outcome.flags.fetched);
        assert!(outcome.errors.is_empty());
        assert!(outcome.external_context.unwrap().contains("Weather-Request"));
        let (intent, params) = &provider.calls()[0];
        assert_eq!(*intent, Intent::WeatherRequest);
        assert_eq!(params["date"], json!("2025-06-11"));
        assert_eq!(params["timeContext"], json!("now"));
    }

    #[tokio::test]
    async fn test_city_without_country_is_asked_then_fetched() {
        let (engine, provider, _) = engine();
        let mut session = engine.new_session();

        let first = engine
            .process_turn(
                &mut session,
                "Weather tomorrow in Paris",
                extraction(Intent::WeatherRequest, json!({"city": "Paris", "time": "tomorrow"})),
            )
            .await;
        assert_eq!(first.next_state, ConversationState::AskMissingFields);
        assert_eq!(first.missing_fields, vec!["country".to_string()]);
        assert!(first.has_error(|e| matches!(e, TurnError::MissingRequiredField { .. })));
        assert_eq!(provider.call_count(), 0);

        let second = engine
            .process_turn(&mut session, "France", extraction(Intent::GeneralQuery, json!({})))
            .await;
        assert_eq!(second.next_state, ConversationState::AdvisoryMode);
        assert_eq!(second.intent, Intent::WeatherRequest);
        assert_eq!(provider.call_count(), 1);
        let (_, params) = &provider.calls()[0];
        assert_eq!(params["city"], json!("Paris"));
        assert_eq!(params["country"], json!("France"));
        assert_eq!(params["date"], json!("2025-06-12"));
        assert!(session.missing.as_ref().is_some_and(|m| m.submitted));
    }

    #[tokio::test]
    async fn test_submitted_collection_is_not_asked_again() {
        let (engine, provider, _) = engine();
        let mut session = engine.new_session();
        let paris = || extraction(Intent::WeatherRequest, json!({"city": "Paris", "time": "tomorrow"}));

        let first = engine.process_turn(&mut session, "Weather tomorrow in Paris", paris()).await;
        let first_id = session.missing.as_ref().map(|m| m.message_id.clone());
        engine
            .process_turn(&mut session, "France", extraction(Intent::GeneralQuery, json!({})))
            .await;
        assert_eq!(first.next_state, ConversationState::AskMissingFields);
        assert_eq!(provider.call_count(), 1);

        let chat = engine
            .process_turn(&mut session, "what else is there", extraction(Intent::GeneralQuery, json!({})))
            .await;
        assert_ne!(chat.next_state, ConversationState::AskMissingFields);
        assert!(chat.missing_fields.is_empty());
        assert_eq!(provider.call_count(), 1);

        let again = engine.process_turn(&mut session, "Weather tomorrow in Paris", paris()).await;
        assert_eq!(again.next_state, ConversationState::AskMissingFields);
        assert!(!again.duplicate_suppressed);
        let pending = session.missing.as_ref().unwrap();
        assert!(!pending.submitted);
        assert_ne!(Some(pending.message_id.clone()), first_id);
    }

    #[tokio::test]
    async fn test_directed_fetch_infers_country_for_known_city() {
        let (engine, provider, _) = engine();
        let mut session = engine.new_session();
        let ex = extraction(Intent::FindAttractions, json!({"city": "Paris"}))
            .with_next_state(ConversationState::FetchingExternalData);

        let outcome = engine.process_turn(&mut session, "things to do in Paris", ex).await;

        assert_eq!(outcome.next_state, ConversationState::AdvisoryMode);
        assert_eq!(provider.calls()[0].1["country"], json!("France"));
    }

    #[tokio::test]
    async fn test_trip_confirm_generates_itinerary() {
        let (engine, _, generator) = engine();
        let mut session = engine.new_session();

        let first = engine
            .process_turn(
                &mut session,
                "Plan a trip to Rome",
                extraction(Intent::TripBuilding, json!({"vacation_location": "Rome, Italy"})),
            )
            .await;
        assert_eq!(first.next_state, ConversationState::TripBuildingMode);
        assert!(first.missing_fields.contains(&"duration".to_string()));

        let second = engine
            .process_turn(&mut session, "3 days from June 15, moderate budget", complete_trip())
            .await;
        assert_eq!(second.next_state, ConversationState::AwaitingUserTripConfirmation);
        assert!(session.awaiting_confirmation);
        assert!(session.draft_snapshot.is_some());

        let third = engine
            .process_turn(&mut session, "yes", LlmExtraction::default())
            .await;
        assert_eq!(third.next_state, ConversationState::DisplayingItinerary);
        let path: Vec<_> = third.transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            path,
            vec![ConversationState::GeneratingItinerary, ConversationState::DisplayingItinerary]
        );
        assert_eq!(generator.call_count(), 1);
        assert_eq!(third.itinerary.as_ref().map(|i| i.days.len()), Some(3));
        assert!(!session.awaiting_confirmation);
    }

    #[tokio::test]
    async fn test_confirmation_edit_returns_to_summary() {
        let (engine, _, generator) = engine();
        let mut session = awaiting_confirmation(&engine).await;

        let outcome = engine
            .process_turn(
                &mut session,
                "change the duration to 5 days",
                extraction(Intent::TripBuilding, json!({"duration": 5})),
            )
            .await;

        assert_eq!(outcome.next_state, ConversationState::AwaitingUserTripConfirmation);
        assert_eq!(outcome.transitions[0].to, ConversationState::TripBuildingMode);
        assert_eq!(session.draft.duration, Some(5));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_confirmation_cancel_discards_draft() {
        let (engine, _, _) = engine();
        let mut session = awaiting_confirmation(&engine).await;

        let outcome = engine
            .process_turn(&mut session, "no", LlmExtraction::default())
            .await;

        assert_eq!(outcome.next_state, ConversationState::Idle);
        assert!(session.draft.vacation_location.is_none());
        assert!(session.draft_snapshot.is_none());
        assert!(!session.awaiting_confirmation);
    }

    #[tokio::test]
    async fn test_confirmation_unrecognized_asks_again() {
        let (engine, _, generator) = engine();
        let mut session = awaiting_confirmation(&engine).await;

        let outcome = engine
            .process_turn(&mut session, "what is the capital of Peru", LlmExtraction::default())
            .await;

        assert_eq!(outcome.next_state, ConversationState::AwaitingUserTripConfirmation);
        assert_eq!(outcome.transitions[0].trigger, "reply_unrecognized");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_confirmation_acknowledgment_goes_idle() {
        let (engine, provider, generator) = engine();
        let mut session = awaiting_confirmation(&engine).await;

        let outcome = engine
            .process_turn(&mut session, "thanks", LlmExtraction::default())
            .await;

        assert_eq!(outcome.next_state, ConversationState::Idle);
        assert_eq!(outcome.transitions[0].trigger, "acknowledged");
        assert!(!session.awaiting_confirmation);
        assert!(session.draft_snapshot.is_none());
        assert_eq!(generator.call_count(), 0);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_draft() {
        let provider = Arc::new(MockProvider::default());
        let generator = Arc::new(MockGenerator::failing());
        let engine = engine_with(provider, generator, EngineSettings::default());
        let mut session = awaiting_confirmation(&engine).await;

        let outcome = engine
            .process_turn(&mut session, "yes", LlmExtraction::default())
            .await;

        assert_eq!(outcome.next_state, ConversationState::TripBuildingMode);
        assert!(outcome.has_error(|e| matches!(e, TurnError::ItineraryGenerationFailure { .. })));
        assert_eq!(session.draft.vacation_location.as_deref(), Some("Rome, Italy"));
        assert!(session.itinerary.is_none());
    }

    #[tokio::test]
    async fn test_weather_on_itinerary_day() {
        let (engine, provider, _) = engine();
        let mut session = displaying_itinerary(&engine).await;

        let outcome = engine
            .process_turn(
                &mut session,
                "What's the weather on day 1?",
                extraction(Intent::WeatherRequest, json!({})),
            )
            .await;

        assert_eq!(outcome.next_state, ConversationState::ItineraryAdviceMode);
        assert_eq!(outcome.day_context.as_ref().map(|d| d.day_number), Some(1));
        let (_, params) = &provider.calls()[0];
        assert_eq!(params["city"], json!("Rome"));
        assert_eq!(params["country"], json!("Italy"));
        assert_eq!(params["date"], json!("2025-06-15"));
    }

    #[tokio::test]
    async fn test_day_question_uses_itinerary() {
        let (engine, provider, _) = engine();
        let mut session = displaying_itinerary(&engine).await;

        let outcome = engine
            .process_turn(
                &mut session,
                "what are we doing on day 2?",
                extraction(Intent::ItineraryAdvice, json!({})),
            )
            .await;

        assert_eq!(outcome.next_state, ConversationState::ItineraryAdviceMode);
        assert!(outcome.external_context.unwrap().contains("Vatican Museums"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_itinerary_edit_regenerates() {
        let (engine, _, generator) = engine();
        let mut session = displaying_itinerary(&engine).await;

        let outcome = engine
            .process_turn(
                &mut session,
                "change day 2 to a beach day",
                extraction(Intent::ItineraryAdvice, json!({})),
            )
            .await;

        assert_eq!(outcome.next_state, ConversationState::DisplayingItinerary);
        assert_eq!(outcome.transitions[0].to, ConversationState::EditingItinerary);
        assert_eq!(generator.call_count(), 2);
        let notes = generator.drafts()[1].notes.clone().unwrap_or_default();
        assert!(notes.contains("beach day"));
    }

    #[tokio::test]
    async fn test_acknowledgment_drops_collection() {
        let (engine, provider, _) = engine();
        let mut session = engine.new_session();
        engine
            .process_turn(
                &mut session,
                "Weather tomorrow in Paris",
                extraction(Intent::WeatherRequest, json!({"city": "Paris", "time": "tomorrow"})),
            )
            .await;
        assert!(session.missing.is_some());

        let outcome = engine
            .process_turn(&mut session, "thanks", LlmExtraction::default())
            .await;

        assert_eq!(outcome.next_state, ConversationState::Idle);
        assert!(session.missing.is_none());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_same_request_is_not_duplicated() {
        let (engine, _, _) = engine();
        let mut session = engine.new_session();
        let ask = || extraction(Intent::FindHotel, json!({"city": "Rome", "country": "Italy"}));

        let first = engine.process_turn(&mut session, "hotels in Rome", ask()).await;
        assert_eq!(first.missing_fields, vec!["budget_level".to_string()]);
        let id = session.missing.as_ref().map(|m| m.message_id.clone());

        let second = engine.process_turn(&mut session, "hotels in Rome", ask()).await;
        assert!(second.duplicate_suppressed);
        assert_eq!(second.next_state, ConversationState::AskMissingFields);
        assert_eq!(session.missing.as_ref().map(|m| m.message_id.clone()), id);
    }

    #[tokio::test]
    async fn test_new_intent_preempts_collection() {
        let (engine, provider, _) = engine();
        let mut session = engine.new_session();
        engine
            .process_turn(
                &mut session,
                "Weather tomorrow in Paris",
                extraction(Intent::WeatherRequest, json!({"city": "Paris", "time": "tomorrow"})),
            )
            .await;

        let outcome = engine
            .process_turn(
                &mut session,
                "restaurants in Rome, Italy",
                extraction(Intent::FindRestaurants, json!({"city": "Rome", "country": "Italy"})),
            )
            .await;

        assert_eq!(outcome.next_state, ConversationState::AdvisoryMode);
        assert_eq!(provider.calls()[0].0, Intent::FindRestaurants);
        assert!(session.missing.is_none());
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_a_fetch_failure() {
        let provider = Arc::new(MockProvider::default().delayed(Duration::from_millis(500)));
        let generator = Arc::new(MockGenerator::with_text(ROME));
        let settings = EngineSettings {
            fetch_timeout: Duration::from_millis(20),
            ..EngineSettings::default()
        };
        let engine = engine_with(provider, generator, settings);
        let mut session = engine.new_session();

        let outcome = engine
            .process_turn(
                &mut session,
                "attractions in Rome, Italy",
                extraction(Intent::FindAttractions, json!({"city": "Rome", "country": "Italy"})),
            )
            .await;

        assert_eq!(outcome.next_state, ConversationState::AdvisoryMode);
        assert!(outcome.has_error(|e| matches!(e, TurnError::ExternalFetchFailure { .. })));
    }

    #[tokio::test]
    async fn test_far_future_weather_is_advisory() {
        let (engine, provider, _) = engine();
        let mut session = engine.new_session();
        let ex = extraction(
            Intent::WeatherRequest,
            json!({"city": "Rome", "country": "Italy", "time": "2025-07-20"}),
        );

        let outcome = engine.process_turn(&mut session, "Weather in Rome on July 20", ex).await;

        assert!(outcome.flags.beyond_forecast_horizon);
        assert!(!outcome.flags.fetched);
        assert_eq!(provider.call_count(), 0);
        assert!(outcome.external_context.unwrap().contains("seasonal"));
    }

    #[tokio::test]
    async fn test_unknown_labels_are_recorded() {
        let (engine, _, _) = engine();
        let mut session = engine.new_session();
        let ex = LlmExtraction {
            intent: json!("Book-Spaceship"),
            next_state: Some("WARP_DRIVE".into()),
            response: Some("I can't help with that.".into()),
            ..LlmExtraction::default()
        };

        let outcome = engine.process_turn(&mut session, "book me a spaceship", ex).await;

        assert_eq!(outcome.intent, Intent::GeneralQuery);
        assert_eq!(outcome.next_state, ConversationState::Idle);
        assert!(outcome.has_error(|e| matches!(e, TurnError::UnknownIntent { raw } if raw == "Book-Spaceship")));
        assert!(outcome.has_error(|e| matches!(e, TurnError::StateTransitionAmbiguous { .. })));
        assert_eq!(outcome.response, "I can't help with that.");
    }

    #[tokio::test]
    async fn test_missing_info_question_and_answer() {
        let (engine, _, _) = engine();
        let mut session = engine.new_session();

        let first = engine
            .process_turn(
                &mut session,
                "What should I pack?",
                extraction(Intent::GeneralQuery, json!({})).with_missing(&["destination"]),
            )
            .await;
        assert_eq!(first.next_state, ConversationState::AwaitingMissingInfo);
        assert!(session.pending_info.is_some());

        let second = engine
            .process_turn(&mut session, "Iceland in winter", extraction(Intent::GeneralQuery, json!({})))
            .await;
        assert_eq!(second.next_state, ConversationState::Idle);
        let context = second.external_context.unwrap();
        assert!(context.contains("What should I pack?"));
        assert!(context.contains("Iceland in winter"));
        assert!(session.pending_info.is_none());
    }

    #[tokio::test]
    async fn test_start_over_keeps_memory() {
        let (engine, _, _) = engine();
        let mut session = displaying_itinerary(&engine).await;
        assert!(!session.memory.is_empty());

        let outcome = engine
            .process_turn(&mut session, "let's start over", LlmExtraction::default())
            .await;

        assert_eq!(outcome.next_state, ConversationState::Idle);
        assert!(session.itinerary.is_none());
        assert!(session.draft.vacation_location.is_none());
        assert!(!session.memory.is_empty());
    }

    #[tokio::test]
    async fn test_remembered_location_fills_follow_up() {
        let (engine, provider, _) = engine();
        let mut session = engine.new_session();
        engine
            .process_turn(
                &mut session,
                "attractions in Rome, Italy",
                extraction(Intent::FindAttractions, json!({"city": "Rome", "country": "Italy"})),
            )
            .await;

        let outcome = engine
            .process_turn(
                &mut session,
                "and restaurants?",
                extraction(Intent::FindRestaurants, json!({})),
            )
            .await;

        assert_eq!(outcome.next_state, ConversationState::AdvisoryMode);
        assert_eq!(provider.calls()[1].1["city"], json!("Rome"));
    }

    #[test]
    fn test_settings_from_config() {
        let config = ConversationConfig {
            fetch_timeout_ms: 1500,
            ..ConversationConfig::default()
        };
        let settings = EngineSettings::from_config(&config);
        assert_eq!(settings.fetch_timeout, Duration::from_millis(1500));
        assert_eq!(settings.default_locale, Locale::English);
        assert_eq!(settings.forecast_horizon_days, 5);
    }
}
