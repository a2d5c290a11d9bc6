//! ConversationStateMachine - the explicit transition table
//!
//! Pure: given the current state and a trigger, either the destination state
//! or a [`TransitionError`]. The engine decides which trigger fired and runs
//! the side effects; this module only decides where that leads.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::ConversationState;
use ConversationState::*;

/// Something that happened during a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "trigger")]
pub enum Trigger {
    /// Advice or trip intent detected; external intents with complete data go
    /// straight to fetching
    IntentDetected { external: bool },
    /// Trip building continues with fields still missing
    TripFieldsMissing,
    /// All trip-required fields are present
    TripComplete,
    UserConfirmed,
    UserRequestedEdit,
    UserCancelled,
    /// Reply in the confirmation state matched nothing
    ReplyUnrecognized,
    GenerationSucceeded,
    GenerationFailed,
    /// Advice question about the displayed itinerary
    ItineraryQuestion,
    /// External-data intent lacks required fields
    FieldsMissing,
    /// Missing fields have all been supplied
    FieldsSupplied,
    /// External fetch finished, successfully or not
    FetchCompleted { itinerary_context: bool },
    Acknowledged,
    ItineraryEditRequested,
    EditApplied,
    EditFailed,
    /// Answered directly with no data collection
    DirectAnswer { keep_itinerary: bool },
    /// The model reports missing info for an intent without a registry entry
    UnknownIntentMissingInfo,
    StartOver,
    /// The model named a recognized next state
    ModelDirected { state: ConversationState },
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::IntentDetected { .. } => "intent_detected",
            Trigger::TripFieldsMissing => "trip_fields_missing",
            Trigger::TripComplete => "trip_complete",
            Trigger::UserConfirmed => "user_confirmed",
            Trigger::UserRequestedEdit => "user_requested_edit",
            Trigger::UserCancelled => "user_cancelled",
            Trigger::ReplyUnrecognized => "reply_unrecognized",
            Trigger::GenerationSucceeded => "generation_succeeded",
            Trigger::GenerationFailed => "generation_failed",
            Trigger::ItineraryQuestion => "itinerary_question",
            Trigger::FieldsMissing => "fields_missing",
            Trigger::FieldsSupplied => "fields_supplied",
            Trigger::FetchCompleted { .. } => "fetch_completed",
            Trigger::Acknowledged => "acknowledged",
            Trigger::ItineraryEditRequested => "itinerary_edit_requested",
            Trigger::EditApplied => "edit_applied",
            Trigger::EditFailed => "edit_failed",
            Trigger::DirectAnswer { .. } => "direct_answer",
            Trigger::UnknownIntentMissingInfo => "unknown_intent_missing_info",
            Trigger::StartOver => "start_over",
            Trigger::ModelDirected { .. } => "model_directed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("transition {trigger} not permitted from {from}")]
    NotPermitted {
        from: ConversationState,
        trigger: &'static str,
    },

    /// The model named a state that does not exist
    #[error("unknown state name: {0}")]
    UnknownState(String),
}

/// One applied transition, recorded in the turn outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: ConversationState,
    pub to: ConversationState,
    pub trigger: String,
}

/// States where a turn is mid-flight rather than waiting for the user
fn is_transient(state: ConversationState) -> bool {
    matches!(state, GeneratingItinerary | FetchingExternalData | EditingItinerary)
}

/// Destination for `trigger` fired in `from`
pub fn next(from: ConversationState, trigger: &Trigger) -> Result<ConversationState, TransitionError> {
    let to = match (from, trigger) {
        (_, Trigger::StartOver) => Some(Idle),
        (_, Trigger::Acknowledged) => Some(Idle),
        (_, Trigger::ModelDirected { state }) => Some(*state),
        (_, Trigger::UnknownIntentMissingInfo) => Some(AwaitingMissingInfo),

        (AwaitingUserTripConfirmation, Trigger::UserConfirmed) => Some(GeneratingItinerary),
        (AwaitingUserTripConfirmation, Trigger::UserRequestedEdit) => Some(TripBuildingMode),
        (AwaitingUserTripConfirmation, Trigger::UserCancelled) => Some(Idle),
        (AwaitingUserTripConfirmation, Trigger::ReplyUnrecognized) => Some(AwaitingUserTripConfirmation),

        (GeneratingItinerary, Trigger::GenerationSucceeded) => Some(DisplayingItinerary),
        (GeneratingItinerary, Trigger::GenerationFailed) => Some(TripBuildingMode),

        (DisplayingItinerary | ItineraryAdviceMode, Trigger::ItineraryQuestion) => Some(ItineraryAdviceMode),
        (DisplayingItinerary | ItineraryAdviceMode, Trigger::ItineraryEditRequested) => Some(EditingItinerary),
        (EditingItinerary, Trigger::EditApplied | Trigger::EditFailed) => Some(DisplayingItinerary),

        (FetchingExternalData, Trigger::FetchCompleted { itinerary_context }) => {
            Some(if *itinerary_context { ItineraryAdviceMode } else { AdvisoryMode })
        }

        (AskMissingFields | AwaitingMissingInfo, Trigger::FieldsSupplied) => Some(FetchingExternalData),
        (s, Trigger::FieldsMissing) if s.is_advice_capable() => Some(AskMissingFields),

        (TripBuildingMode, Trigger::TripComplete) => Some(AwaitingUserTripConfirmation),
        (s, Trigger::TripFieldsMissing) if s != AwaitingUserTripConfirmation && !is_transient(s) => {
            Some(TripBuildingMode)
        }

        (s, Trigger::IntentDetected { external }) if s != AwaitingUserTripConfirmation && !is_transient(s) => {
            Some(if *external { FetchingExternalData } else { TripBuildingMode })
        }

        (s, Trigger::DirectAnswer { keep_itinerary }) if s != AwaitingUserTripConfirmation && !is_transient(s) => {
            Some(if *keep_itinerary && s.is_itinerary_context() { s } else { Idle })
        }

        _ => None,
    };

    match to {
        Some(to) => {
            debug!(%from, %to, trigger = trigger.name(), "next: transition");
            Ok(to)
        }
        None => {
            warn!(%from, trigger = trigger.name(), "next: transition not permitted");
            Err(TransitionError::NotPermitted {
                from,
                trigger: trigger.name(),
            })
        }
    }
}

/// Resolve a model-supplied state name
pub fn parse_model_state(name: &str) -> Result<ConversationState, TransitionError> {
    ConversationState::parse(name).ok_or_else(|| {
        warn!(%name, "parse_model_state: unrecognized state, deriving locally");
        TransitionError::UnknownState(name.to_string())
    })
}

/// Applies triggers to a state and records the path taken
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: ConversationState,
    transitions: Vec<Transition>,
}

impl StateMachine {
    pub fn new(state: ConversationState) -> Self {
        Self {
            state,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Fire a trigger; the state is unchanged on error
    pub fn fire(&mut self, trigger: Trigger) -> Result<ConversationState, TransitionError> {
        let to = next(self.state, &trigger)?;
        info!(from = %self.state, %to, trigger = trigger.name(), "State transition");
        self.transitions.push(Transition {
            from: self.state,
            to,
            trigger: trigger.name().to_string(),
        });
        self.state = to;
        Ok(to)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<Transition> {
        self.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_flow() {
        assert_eq!(next(AwaitingUserTripConfirmation, &Trigger::UserConfirmed), Ok(GeneratingItinerary));
        assert_eq!(next(AwaitingUserTripConfirmation, &Trigger::UserRequestedEdit), Ok(TripBuildingMode));
        assert_eq!(next(AwaitingUserTripConfirmation, &Trigger::UserCancelled), Ok(Idle));
        assert!(next(Idle, &Trigger::UserConfirmed).is_err());
    }

    #[test]
    fn test_generation_outcomes() {
        assert_eq!(next(GeneratingItinerary, &Trigger::GenerationSucceeded), Ok(DisplayingItinerary));
        assert_eq!(next(GeneratingItinerary, &Trigger::GenerationFailed), Ok(TripBuildingMode));
    }

    #[test]
    fn test_missing_fields_only_from_advice_capable_states() {
        assert_eq!(next(Idle, &Trigger::FieldsMissing), Ok(AskMissingFields));
        assert_eq!(next(AdvisoryMode, &Trigger::FieldsMissing), Ok(AskMissingFields));
        assert!(next(AwaitingUserTripConfirmation, &Trigger::FieldsMissing).is_err());
        assert!(next(FetchingExternalData, &Trigger::FieldsMissing).is_err());
    }

    #[test]
    fn test_fetch_completion_is_context_dependent() {
        let with = Trigger::FetchCompleted { itinerary_context: true };
        let without = Trigger::FetchCompleted { itinerary_context: false };
        assert_eq!(next(FetchingExternalData, &with), Ok(ItineraryAdviceMode));
        assert_eq!(next(FetchingExternalData, &without), Ok(AdvisoryMode));
    }

    #[test]
    fn test_acknowledgment_and_start_over_from_any_state() {
        for state in ConversationState::ALL {
            assert_eq!(next(state, &Trigger::Acknowledged), Ok(Idle));
            assert_eq!(next(state, &Trigger::StartOver), Ok(Idle));
        }
    }

    #[test]
    fn test_direct_answer_keeps_itinerary_state() {
        let keep = Trigger::DirectAnswer { keep_itinerary: true };
        assert_eq!(next(ItineraryAdviceMode, &keep), Ok(ItineraryAdviceMode));
        assert_eq!(next(AdvisoryMode, &keep), Ok(Idle));
        assert!(next(AwaitingUserTripConfirmation, &keep).is_err());
    }

    #[test]
    fn test_parse_model_state() {
        assert_eq!(parse_model_state("FETCHING_EXTERNAL_DATA"), Ok(FetchingExternalData));
        assert_eq!(
            parse_model_state("SHOW_RESULTS"),
            Err(TransitionError::UnknownState("SHOW_RESULTS".into()))
        );
    }

    #[test]
    fn test_state_machine_records_path() {
        let mut sm = StateMachine::new(Idle);
        sm.fire(Trigger::IntentDetected { external: false }).unwrap();
        sm.fire(Trigger::TripComplete).unwrap();
        assert!(sm.fire(Trigger::GenerationSucceeded).is_err());
        assert_eq!(sm.state(), AwaitingUserTripConfirmation);
        assert_eq!(sm.transitions().len(), 2);
        assert_eq!(sm.transitions()[1].trigger, "trip_complete");
    }
}
