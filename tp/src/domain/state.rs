//! Conversation state

use serde::{Deserialize, Serialize};
use tracing::debug;

/// The single active state of a conversation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    #[default]
    Idle,
    AnalyzingInput,
    TripBuildingMode,
    AwaitingUserTripConfirmation,
    GeneratingItinerary,
    FetchingExternalData,
    DisplayingItinerary,
    EditingItinerary,
    AskMissingFields,
    ItineraryAdviceMode,
    AdvisoryMode,
    AwaitingMissingInfo,
}

impl ConversationState {
    pub const ALL: [ConversationState; 12] = [
        ConversationState::Idle,
        ConversationState::AnalyzingInput,
        ConversationState::TripBuildingMode,
        ConversationState::AwaitingUserTripConfirmation,
        ConversationState::GeneratingItinerary,
        ConversationState::FetchingExternalData,
        ConversationState::DisplayingItinerary,
        ConversationState::EditingItinerary,
        ConversationState::AskMissingFields,
        ConversationState::ItineraryAdviceMode,
        ConversationState::AdvisoryMode,
        ConversationState::AwaitingMissingInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::AnalyzingInput => "ANALYZING_INPUT",
            Self::TripBuildingMode => "TRIP_BUILDING_MODE",
            Self::AwaitingUserTripConfirmation => "AWAITING_USER_TRIP_CONFIRMATION",
            Self::GeneratingItinerary => "GENERATING_ITINERARY",
            Self::FetchingExternalData => "FETCHING_EXTERNAL_DATA",
            Self::DisplayingItinerary => "DISPLAYING_ITINERARY",
            Self::EditingItinerary => "EDITING_ITINERARY",
            Self::AskMissingFields => "ASK_MISSING_FIELDS",
            Self::ItineraryAdviceMode => "ITINERARY_ADVICE_MODE",
            Self::AdvisoryMode => "ADVISORY_MODE",
            Self::AwaitingMissingInfo => "AWAITING_MISSING_INFO",
        }
    }

    /// Parse a state name as the model writes it
    ///
    /// Case-insensitive; spaces and dashes are accepted in place of underscores.
    pub fn parse(name: &str) -> Option<Self> {
        debug!(%name, "ConversationState::parse: called");
        let canonical = name.trim().to_uppercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|s| s.as_str() == canonical)
    }

    /// States in which an advice question may start a data collection
    pub fn is_advice_capable(&self) -> bool {
        !matches!(
            self,
            Self::AwaitingUserTripConfirmation
                | Self::GeneratingItinerary
                | Self::FetchingExternalData
                | Self::EditingItinerary
        )
    }

    /// States that show an itinerary to the user
    pub fn is_itinerary_context(&self) -> bool {
        matches!(self, Self::DisplayingItinerary | Self::ItineraryAdviceMode)
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for state in ConversationState::ALL {
            assert_eq!(ConversationState::parse(state.as_str()), Some(state));
        }
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!(
            ConversationState::parse("fetching external data"),
            Some(ConversationState::FetchingExternalData)
        );
        assert_eq!(
            ConversationState::parse("ask-missing-fields"),
            Some(ConversationState::AskMissingFields)
        );
        assert_eq!(ConversationState::parse("SUMMARIZING"), None);
    }

    #[test]
    fn test_serde_screaming_snake() {
        let json = serde_json::to_string(&ConversationState::AwaitingUserTripConfirmation).unwrap();
        assert_eq!(json, "\"AWAITING_USER_TRIP_CONFIRMATION\"");
    }
}
