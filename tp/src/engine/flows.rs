//! The per-state flows behind [`Engine::process_turn`]

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{Engine, LlmExtraction, PendingInfo, SessionState, Turn, TurnError, add_time_context, replies};
use crate::domain::{AdviceRequest, ConversationState, Intent, MissingFieldsState, Mode, StructuredItinerary, TripDraft};
use crate::itinerary::{DayResolution, resolve_day_reference};
use crate::machine::Trigger;
use crate::matcher::{Matcher, ReplyKind, parse_day_reference};
use crate::merger::{MergeSource, has_trip_fields, merge_into_draft};
use crate::normalize::{
    budget_level_for, canonical_country, infer_from_text, normalize, resolve_city, split_country_suffix, split_location,
};
use crate::provider::RouterError;
use crate::requirements::{enhance_missing, has_requirements, is_empty_value};

/// How the advice flow was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Directive {
    /// Derived locally; missing fields are asked for
    Derive,
    /// The model asked for a fetch; the router may complete the location
    Fetch,
    /// The model asked for missing fields
    Ask,
}

fn present(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).is_some_and(|v| !is_empty_value(v))
}

fn text(value: &str) -> Value {
    Value::String(value.trim().to_string())
}

/// Treat a bare reply as the answer to a single pending field
fn raw_answer(field: &str, message: &str) -> Map<String, Value> {
    let mut out = Map::new();
    let message = message.trim();
    match field {
        "city" => {
            if let Some(location) = infer_from_text(message) {
                if let Some(city) = location.city {
                    out.insert("city".into(), Value::String(city));
                }
                if let Some(country) = location.country {
                    out.insert("country".into(), Value::String(country));
                }
            } else if let Some((city, country)) = message.split_once(',') {
                out.insert("city".into(), text(city));
                let country = country.trim();
                out.insert(
                    "country".into(),
                    text(canonical_country(country).unwrap_or(country)),
                );
            } else if let Some((city, country)) = split_country_suffix(message) {
                out.insert("city".into(), text(&city));
                out.insert("country".into(), text(country));
            } else {
                out.insert("city".into(), text(message));
            }
        }
        "country" => {
            let country = canonical_country(message)
                .map(str::to_string)
                .or_else(|| infer_from_text(message).and_then(|l| l.country))
                .unwrap_or_else(|| message.to_string());
            out.insert("country".into(), Value::String(country));
        }
        "budget_level" => {
            if let Some(level) = budget_level_for(message) {
                out.insert("budget_level".into(), Value::String(level.as_str().to_string()));
            }
        }
        other => {
            out.insert(other.into(), text(message));
        }
    }
    out
}

/// Fill city and country from a free-form location when both are absent
fn fill_location(params: &mut Map<String, Value>, location: &str) {
    if present(params, "city") || present(params, "country") {
        return;
    }
    let mut loc = Map::new();
    loc.insert("location".into(), text(location));
    let split = split_location(&loc);
    for key in ["city", "country"] {
        if let Some(v) = split.get(key).filter(|v| !is_empty_value(v)) {
            params.insert(key.into(), v.clone());
        }
    }
    if !present(params, "country")
        && let Some(city) = params.get("city").and_then(Value::as_str)
        && let Some(resolved) = resolve_city(city)
        && let Some(country) = resolved.country
    {
        params.insert("country".into(), Value::String(country));
    }
}

fn day_block(itinerary: &StructuredItinerary, resolution: &DayResolution) -> String {
    let mut block = format!("[Itinerary day {}]\n", resolution.day_number);
    if let Some(date) = &resolution.date {
        block.push_str(&format!("Date: {}\n", date));
    }
    if let Some(location) = &resolution.location {
        block.push_str(&format!("Location: {}\n", location));
    }
    if let Some(day) = itinerary.days.iter().find(|d| d.day_number == resolution.day_number) {
        if !day.title.is_empty() {
            block.push_str(&format!("Title: {}\n", day.title));
        }
        for activity in &day.activities {
            block.push_str(&format!("- {}\n", activity));
        }
    }
    block
}

impl Engine {
    /// Run the flow the model asked for; false when its entry guard fails
    pub(super) async fn directed_flow(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        state: ConversationState,
        message: &str,
        extraction: &LlmExtraction,
        data: Map<String, Value>,
    ) -> bool {
        use ConversationState::*;
        let intent = turn.intent;
        debug!(%state, %intent, "directed_flow: called");
        match state {
            FetchingExternalData | AdvisoryMode if intent.is_external() => {
                self.advice_flow(session, turn, intent, message, extraction, data, Directive::Fetch, None)
                    .await;
            }
            AskMissingFields if intent.is_external() => {
                let pending = session.missing.clone().filter(|m| m.intent == intent && !m.submitted);
                self.advice_flow(session, turn, intent, message, extraction, data, Directive::Ask, pending)
                    .await;
            }
            TripBuildingMode | AwaitingUserTripConfirmation | GeneratingItinerary
                if intent == Intent::TripBuilding || has_trip_fields(&data) =>
            {
                self.trip_flow(session, turn, message, extraction, data);
            }
            DisplayingItinerary | ItineraryAdviceMode
                if session.itinerary.is_some() && turn.state().is_itinerary_context() =>
            {
                self.itinerary_question_flow(session, turn, message, extraction);
            }
            EditingItinerary if session.itinerary.is_some() && turn.state().is_itinerary_context() => {
                self.edit_flow(session, turn, message, data).await;
            }
            AwaitingMissingInfo if !intent.is_external() => {
                self.park_missing_info(session, turn, intent, message, extraction);
            }
            Idle => {
                session.clear_collection();
                turn.fire(Trigger::ModelDirected { state: Idle });
                turn.response = Some(turn.reply_or(extraction, replies::general));
            }
            _ => {
                debug!(%state, "directed_flow: entry guard failed, deriving locally");
                return false;
            }
        }
        true
    }

    /// Pick a flow from intent, data and session
    pub(super) async fn derived_flow(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        message: &str,
        extraction: &LlmExtraction,
        data: Map<String, Value>,
    ) {
        let state = turn.state();
        let intent = turn.intent;
        debug!(%state, %intent, "derived_flow: called");

        if state == ConversationState::AwaitingMissingInfo
            && !intent.is_external()
            && intent != Intent::TripBuilding
            && let Some(pending) = session.pending_info.take()
        {
            self.answer_pending_info(session, turn, pending, message, extraction, data);
            return;
        }

        if let Some(pending) = session.missing.clone()
            && !pending.submitted
        {
            if intent == pending.intent || intent == Intent::GeneralQuery {
                let target = pending.intent;
                self.advice_flow(session, turn, target, message, extraction, data, Directive::Derive, Some(pending))
                    .await;
                return;
            }
            info!(pending = %pending.intent, new = %intent, "New intent preempts pending field collection");
            session.clear_collection();
        }

        let has_itinerary = session.itinerary.is_some() && state.is_itinerary_context();

        if has_itinerary
            && !intent.is_external()
            && self.matchers.replies.detect(message) == Some(ReplyKind::Edit)
        {
            self.edit_flow(session, turn, message, data).await;
            return;
        }

        if state == ConversationState::TripBuildingMode
            && matches!(intent, Intent::GeneralQuery | Intent::TripBuilding)
        {
            self.trip_flow(session, turn, message, extraction, data);
            return;
        }

        let reported_missing = extraction.missing_fields.as_ref().is_some_and(|f| !f.is_empty());
        if !has_requirements(intent) && reported_missing && !(intent == Intent::ItineraryAdvice && has_itinerary) {
            self.park_missing_info(session, turn, intent, message, extraction);
            return;
        }

        match intent {
            Intent::TripBuilding => self.trip_flow(session, turn, message, extraction, data),
            Intent::ItineraryAdvice if has_itinerary => {
                self.itinerary_question_flow(session, turn, message, extraction)
            }
            Intent::GeneralQuery if has_itinerary && parse_day_reference(message).is_some() => {
                self.itinerary_question_flow(session, turn, message, extraction)
            }
            i if i.is_external() => {
                self.advice_flow(session, turn, i, message, extraction, data, Directive::Derive, None)
                    .await
            }
            Intent::GeneralQuery if has_trip_fields(&data) => {
                self.trip_flow(session, turn, message, extraction, data)
            }
            _ => self.direct_answer(session, turn, extraction, data),
        }
    }

    /// Collect, validate and fetch data for an external intent
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn advice_flow(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        intent: Intent,
        message: &str,
        extraction: &LlmExtraction,
        data: Map<String, Value>,
        directive: Directive,
        pending: Option<MissingFieldsState>,
    ) {
        debug!(%intent, ?directive, "advice_flow: called");
        // a re-classified request carries its own data; only a plain reply is a raw answer
        let plain_reply = turn.intent == Intent::GeneralQuery;
        turn.intent = intent;
        let today = self.clock.today();

        let mut params = Map::new();
        if let Some(pending) = &pending {
            params.extend(pending.values.clone());
            if let [field] = pending.fields.as_slice()
                && plain_reply
                && !present(&data, field)
                && !message.trim().is_empty()
            {
                debug!(%field, "advice_flow: message answers the single pending field");
                params.extend(raw_answer(field, message));
            }
        }
        for (key, value) in &data {
            if !is_empty_value(value) {
                params.insert(key.clone(), value.clone());
            }
        }

        let itinerary_context = self.fill_from_itinerary(session, turn, message, &mut params);
        self.fill_from_memory(session, intent, &mut params);
        let mut params = normalize(&params);
        add_time_context(&mut params);

        session.memory.record(intent, &params, self.clock.now());
        session.last_intent = Some(intent);
        session.mode = Some(intent.mode());
        session.pending_info = None;
        turn.data = params.clone();

        let request = AdviceRequest::new(intent, params.clone());
        if directive != Directive::Fetch && !request.is_complete() {
            let fields = request.missing_fields.clone();
            session.advice = Some(request);
            self.ask_fields(session, turn, intent, fields, params, extraction);
            return;
        }

        let prepared = match self.router.prepare(intent, &params, today) {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!(error = %e, "advice_flow: request not ready");
                if matches!(e, RouterError::IncompleteLocationData { .. }) {
                    turn.errors.push(TurnError::IncompleteLocationData { intent });
                }
                let fields = e.missing_fields().map(<[String]>::to_vec).unwrap_or_default();
                session.advice = Some(request);
                self.ask_fields(session, turn, intent, fields, params, extraction);
                return;
            }
        };

        let from_collection = matches!(
            turn.state(),
            ConversationState::AskMissingFields | ConversationState::AwaitingMissingInfo
        );
        if let Some(collected) = session.missing.as_mut() {
            collected.mark_submitted();
            debug!(message_id = %collected.message_id, "advice_flow: collection submitted");
        }
        if from_collection {
            turn.fire(Trigger::FieldsSupplied);
        } else {
            turn.fire(Trigger::IntentDetected { external: true });
        }
        turn.data = prepared.params.clone();
        session.advice = Some(AdviceRequest::new(intent, prepared.params.clone()));

        let timeout = self.settings.fetch_timeout;
        match tokio::time::timeout(timeout, self.router.dispatch(&prepared)).await {
            Ok(Ok(routed)) => {
                turn.flags.fetched = routed.implemented && !routed.beyond_forecast_horizon;
                turn.flags.beyond_forecast_horizon = routed.beyond_forecast_horizon;
                turn.external_context = Some(routed.block);
                turn.response = Some(turn.reply_or(extraction, |locale| replies::fetched(locale, intent)));
            }
            Ok(Err(e)) => {
                turn.flags.fetched = true;
                turn.errors.push(TurnError::ExternalFetchFailure { message: e.to_string() });
                turn.response = Some(replies::fetch_failed(turn.locale, intent));
            }
            Err(_) => {
                warn!(%intent, ?timeout, "External fetch timed out");
                turn.flags.fetched = true;
                turn.errors.push(TurnError::ExternalFetchFailure {
                    message: format!("timed out after {} ms", timeout.as_millis()),
                });
                turn.response = Some(replies::fetch_failed(turn.locale, intent));
            }
        }
        turn.fire(Trigger::FetchCompleted { itinerary_context });
    }

    /// Ask for `fields`, reusing an identical pending collection
    fn ask_fields(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        intent: Intent,
        fields: Vec<String>,
        values: Map<String, Value>,
        extraction: &LlmExtraction,
    ) {
        debug!(%intent, ?fields, "ask_fields: called");
        turn.errors.push(TurnError::MissingRequiredField { fields: fields.clone() });

        let duplicate = session
            .missing
            .as_ref()
            .is_some_and(|m| m.is_same_request(intent, &fields));
        if duplicate {
            info!(%intent, "Same fields already requested, not opening another collection");
            if let Some(existing) = session.missing.as_mut() {
                existing.values = values;
            }
            turn.duplicate_suppressed = true;
        } else {
            session.missing = Some(MissingFieldsState::new(intent, fields.clone(), values));
        }

        turn.fire(Trigger::FieldsMissing);
        turn.response = Some(turn.reply_or(extraction, |locale| replies::ask_for_fields(locale, intent, &fields)));
        turn.missing_fields = fields;
    }

    /// Location, date and day context from the displayed itinerary
    ///
    /// Returns true when the question is about the itinerary.
    fn fill_from_itinerary(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        message: &str,
        params: &mut Map<String, Value>,
    ) -> bool {
        let Some(itinerary) = session.itinerary.as_ref() else {
            return false;
        };

        if parse_day_reference(message).is_some() {
            let Some(resolution) = resolve_day_reference(itinerary, message, self.clock.today()) else {
                debug!("fill_from_itinerary: day reference outside the itinerary");
                return false;
            };
            if let Some(location) = &resolution.location {
                fill_location(params, location);
            }
            if let Some(date) = &resolution.date
                && !present(params, "date")
            {
                params.insert("date".into(), Value::String(date.clone()));
                params.insert("time".into(), Value::String(date.clone()));
            }
            turn.flags.needs_year_confirmation = resolution.needs_confirmation;
            session.last_day_context = Some(resolution.clone());
            turn.day_context = Some(resolution);
            return true;
        }

        if turn.state().is_itinerary_context() {
            if let Some(destination) = itinerary.destination.clone() {
                fill_location(params, &destination);
            }
            return true;
        }
        false
    }

    /// Remembered location and budget, never splitting a location pair
    fn fill_from_memory(&self, session: &SessionState, intent: Intent, params: &mut Map<String, Value>) {
        let remembered = session.memory.relevant_context(intent);
        if !present(params, "city")
            && !present(params, "country")
            && let (Some(city), Some(country)) = (remembered.get("city"), remembered.get("country"))
        {
            debug!(%intent, "fill_from_memory: location from memory");
            params.insert("city".into(), city.clone());
            params.insert("country".into(), country.clone());
        }
        if !present(params, "budget_level")
            && !present(params, "budget")
            && let Some(level) = remembered.get("budget_level")
        {
            params.insert("budget_level".into(), level.clone());
        }
    }

    /// Merge trip data and either ask for the rest or request confirmation
    pub(super) fn trip_flow(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        message: &str,
        extraction: &LlmExtraction,
        data: Map<String, Value>,
    ) {
        debug!(state = %turn.state(), "trip_flow: called");
        turn.intent = Intent::TripBuilding;
        let continuing = turn.state() == ConversationState::TripBuildingMode;

        let mut data = data;
        let draft_missing = session.draft.missing_fields();
        if continuing
            && !has_trip_fields(&data)
            && let [field] = draft_missing.as_slice()
            && !message.trim().is_empty()
        {
            debug!(%field, "trip_flow: message answers the single missing trip field");
            data.extend(raw_answer(field, message));
        }

        let report = merge_into_draft(&mut session.draft, &data, self.settings.merge_rules, MergeSource::Model);
        debug!(changed = ?report.changed, "trip_flow: merged");
        session.memory.record(Intent::TripBuilding, &data, self.clock.now());
        session.last_intent = Some(Intent::TripBuilding);
        session.mode = Some(Mode::TripBuilding);
        session.clear_collection();
        turn.data = data;

        if !continuing {
            turn.fire(Trigger::IntentDetected { external: false });
        }

        let fields = session.draft.to_fields();
        let missing = enhance_missing(Intent::TripBuilding, &session.draft.missing_fields(), &fields);
        if missing.is_empty() {
            turn.fire(Trigger::TripComplete);
            session.draft_snapshot = Some(session.draft.clone());
            session.awaiting_confirmation = true;
            turn.response = Some(replies::confirm_trip(turn.locale, &session.draft.summary()));
        } else {
            if continuing {
                turn.fire(Trigger::TripFieldsMissing);
            }
            turn.response = Some(turn.reply_or(extraction, |locale| replies::ask_trip_fields(locale, &missing)));
            turn.missing_fields = missing;
        }
    }

    /// Reply to the trip summary: confirm, edit or cancel
    pub(super) async fn confirmation_flow(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        message: &str,
        extraction: &LlmExtraction,
        data: Map<String, Value>,
    ) {
        let reply = self.matchers.replies.detect(message);
        debug!(?reply, "confirmation_flow: called");
        turn.intent = Intent::TripBuilding;
        match reply {
            Some(ReplyKind::Confirm) => {
                turn.fire(Trigger::UserConfirmed);
                session.awaiting_confirmation = false;
                let draft = session.draft_snapshot.clone().unwrap_or_else(|| session.draft.clone());
                self.generate(session, turn, &draft, false).await;
            }
            Some(ReplyKind::Cancel) if !has_trip_fields(&data) => {
                info!("Trip cancelled at confirmation");
                turn.fire(Trigger::UserCancelled);
                session.draft = TripDraft::new();
                session.draft_snapshot = None;
                session.awaiting_confirmation = false;
                turn.response = Some(replies::trip_cancelled(turn.locale));
            }
            Some(_) => self.reopen_trip(session, turn, extraction, data),
            None if has_trip_fields(&data) => self.reopen_trip(session, turn, extraction, data),
            None if self.matchers.is_acknowledgment(message) => {
                debug!("confirmation_flow: acknowledgment leaves the draft unconfirmed");
                turn.intent = Intent::GeneralQuery;
                turn.fire(Trigger::Acknowledged);
                session.awaiting_confirmation = false;
                session.draft_snapshot = None;
                session.clear_collection();
                turn.response = Some(
                    extraction
                        .reply()
                        .map(str::to_string)
                        .unwrap_or_else(|| replies::acknowledged(turn.locale)),
                );
            }
            None => {
                turn.fire(Trigger::ReplyUnrecognized);
                turn.response = Some(replies::confirm_again(turn.locale));
            }
        }
    }

    /// Back to trip building with the edit applied
    fn reopen_trip(&self, session: &mut SessionState, turn: &mut Turn, extraction: &LlmExtraction, data: Map<String, Value>) {
        turn.fire(Trigger::UserRequestedEdit);
        session.awaiting_confirmation = false;
        session.draft_snapshot = None;

        let report = merge_into_draft(&mut session.draft, &data, self.settings.merge_rules, MergeSource::User);
        debug!(changed = ?report.changed, "reopen_trip: merged");
        turn.data = data;

        if !report.changed.is_empty() && session.draft.is_complete() {
            turn.fire(Trigger::TripComplete);
            session.draft_snapshot = Some(session.draft.clone());
            session.awaiting_confirmation = true;
            turn.response = Some(replies::confirm_trip(turn.locale, &session.draft.summary()));
        } else {
            turn.missing_fields = session.draft.missing_fields();
            turn.response = Some(turn.reply_or(extraction, replies::what_to_change));
        }
    }

    /// Generate an itinerary; returns true on success
    async fn generate(&self, session: &mut SessionState, turn: &mut Turn, draft: &TripDraft, editing: bool) -> bool {
        debug!(editing, "generate: called");
        let failure = match self.generator.generate(draft).await {
            Ok(generated) if generated.success => {
                info!(days = generated.itinerary.days.len(), "Itinerary ready");
                turn.fire(if editing { Trigger::EditApplied } else { Trigger::GenerationSucceeded });
                turn.response = Some(generated.text.clone());
                session.itinerary = Some(generated.itinerary);
                session.itinerary_text = Some(generated.text);
                return true;
            }
            Ok(_) => "generator returned no usable itinerary".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(error = %failure, editing, "Itinerary generation failed");
        turn.errors.push(TurnError::ItineraryGenerationFailure { message: failure });
        if editing {
            turn.fire(Trigger::EditFailed);
            turn.response = Some(replies::edit_failed(turn.locale));
        } else {
            turn.fire(Trigger::GenerationFailed);
            turn.response = Some(replies::generation_failed(turn.locale));
        }
        false
    }

    /// Regenerate the itinerary with the user's change as a note
    pub(super) async fn edit_flow(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        message: &str,
        data: Map<String, Value>,
    ) {
        debug!("edit_flow: called");
        turn.intent = Intent::ItineraryAdvice;
        turn.fire(Trigger::ItineraryEditRequested);

        let mut draft = session.draft_snapshot.clone().unwrap_or_else(|| session.draft.clone());
        merge_into_draft(&mut draft, &data, self.settings.merge_rules, MergeSource::User);
        let note = message.trim();
        draft.notes = Some(match draft.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, note),
            _ => note.to_string(),
        });
        turn.data = data;

        if self.generate(session, turn, &draft, true).await {
            session.draft = draft.clone();
            session.draft_snapshot = Some(draft);
        }
    }

    /// Answer a question about the displayed itinerary
    pub(super) fn itinerary_question_flow(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        message: &str,
        extraction: &LlmExtraction,
    ) {
        debug!("itinerary_question_flow: called");
        let Some(itinerary) = session.itinerary.as_ref() else {
            return self.direct_answer(session, turn, extraction, Map::new());
        };
        turn.intent = Intent::ItineraryAdvice;
        turn.fire(Trigger::ItineraryQuestion);

        match resolve_day_reference(itinerary, message, self.clock.today()) {
            Some(resolution) => {
                turn.external_context = Some(day_block(itinerary, &resolution));
                turn.flags.needs_year_confirmation = resolution.needs_confirmation;
                turn.response = Some(turn.reply_or(extraction, |locale| {
                    replies::day_summary(
                        locale,
                        resolution.day_number,
                        resolution.date.as_deref(),
                        resolution.location.as_deref(),
                    )
                }));
                session.last_day_context = Some(resolution.clone());
                turn.day_context = Some(resolution);
            }
            None if parse_day_reference(message).is_some() => {
                turn.response = Some(replies::no_such_day(turn.locale));
            }
            None => {
                turn.external_context = Some(itinerary.render());
                turn.response = Some(turn.reply_or(extraction, replies::general));
            }
        }
        session.last_intent = Some(Intent::ItineraryAdvice);
        session.mode = Some(Intent::ItineraryAdvice.mode());
    }

    /// Park a question the model says needs more info
    fn park_missing_info(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        intent: Intent,
        message: &str,
        extraction: &LlmExtraction,
    ) {
        let fields = extraction.missing_fields.clone().unwrap_or_default();
        debug!(%intent, ?fields, "park_missing_info: called");
        session.missing = None;
        session.advice = None;
        session.pending_info = Some(PendingInfo {
            intent,
            fields: fields.clone(),
            question: message.trim().to_string(),
        });
        turn.fire(Trigger::UnknownIntentMissingInfo);
        turn.response = Some(turn.reply_or(extraction, |locale| {
            if fields.is_empty() {
                replies::general(locale)
            } else {
                replies::ask_for_fields(locale, intent, &fields)
            }
        }));
        turn.missing_fields = fields;
    }

    /// The user answered a parked question
    fn answer_pending_info(
        &self,
        session: &mut SessionState,
        turn: &mut Turn,
        pending: PendingInfo,
        message: &str,
        extraction: &LlmExtraction,
        data: Map<String, Value>,
    ) {
        debug!(intent = %pending.intent, "answer_pending_info: called");
        let mut recorded = data;
        recorded.insert("answer".into(), text(message));
        session.memory.record(pending.intent, &recorded, self.clock.now());
        turn.intent = pending.intent;
        turn.data = recorded;
        turn.external_context = Some(format!(
            "[Earlier question]\n{}\n[Answer]\n{}\n",
            pending.question,
            message.trim()
        ));
        turn.fire(Trigger::DirectAnswer {
            keep_itinerary: session.itinerary.is_some(),
        });
        turn.response = Some(turn.reply_or(extraction, replies::noted));
    }

    /// No collection needed: answer and settle
    fn direct_answer(&self, session: &mut SessionState, turn: &mut Turn, extraction: &LlmExtraction, data: Map<String, Value>) {
        let intent = turn.intent;
        debug!(%intent, "direct_answer: called");
        let keep_itinerary = session.itinerary.is_some();
        if keep_itinerary
            && turn.state().is_itinerary_context()
            && let Some(itinerary) = &session.itinerary
        {
            turn.external_context = Some(itinerary.render());
        }
        if !data.is_empty() {
            session.memory.record(intent, &data, self.clock.now());
        }
        session.last_intent = Some(intent);
        session.mode = Some(intent.mode());
        turn.fire(Trigger::DirectAnswer { keep_itinerary });
        turn.response = Some(turn.reply_or(extraction, replies::general));
    }
}
