//! Slot-filling dialogue controller
//!
//! Tracks which trip fields are known across turns, asks for the ones still
//! missing, and once the request is complete fans out to the data providers
//! exactly once before switching the conversation to destination Q&A.
//!
//! The transition logic is kept in pure functions and methods
//! ([`missing_fields_prompt`], [`Session::apply_trip_update`],
//! [`assemble_results`]) so it can be unit-tested without a network or a UI.

use tracing::{info, warn};

use crate::attractions::{Attraction, AttractionsClient};
use crate::config::Config;
use crate::extract;
use crate::flights::{FlightSearchClient, FlightSearchResponse};
use crate::llm::LlmClient;
use crate::weather::{WeatherClient, WeatherReport};
use crate::{ConciergeError, ConversationMessage, TripRequest, UNKNOWN};

/// Where the controller is in the conversation. There is no stored "ready"
/// state: readiness is the transient [`Advance::Proceed`] decision taken
/// between gathering and [`Phase::GeneralQa`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingInitialInput,
    AwaitingMissingFields,
    GeneralQa,
}

/// Coarse conversation mode. Flips to `GeneralQa` exactly once, when a trip
/// request first has zero unknown fields, and never flips back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Gathering,
    GeneralQa,
}

/// Outcome of absorbing an extraction or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Fields are still missing; a prompt for them was emitted.
    AskMissing(Vec<&'static str>),
    /// The trip request is complete; fetch travel data now.
    Proceed,
}

const PARSE_APOLOGY: &str =
    "Sorry, I had trouble understanding that. Could you try rephrasing your request?";
const QA_APOLOGY: &str =
    "Sorry, I couldn't reach the assistant just now. Please try asking again.";
const DESTINATION_CLARIFICATION: &str =
    "I don't have a destination on file yet. Which city are you asking about?";

/// Render the ask-for-missing-fields prompt with standard list grammar.
pub fn missing_fields_prompt(fields: &[&str]) -> String {
    match fields {
        [] => String::new(),
        [only] => format!("Please provide the {only}:"),
        [first, second] => format!("Please provide the {first} and {second}:"),
        [init @ .., last] => format!("Please provide the {}, and {last}:", init.join(", ")),
    }
}

/// The outbound dependencies of one conversation turn.
pub struct Providers {
    pub llm: LlmClient,
    pub flights: FlightSearchClient,
    pub weather: WeatherClient,
    pub attractions: AttractionsClient,
}

impl Providers {
    pub fn from_config(config: &Config) -> Self {
        Self {
            llm: LlmClient::new(
                config.anthropic_api_key.clone(),
                config.model.clone(),
                config.max_tokens,
            ),
            flights: FlightSearchClient::new(config.serpapi_key.clone()),
            weather: WeatherClient::new(),
            attractions: AttractionsClient::new(config.geoapify_api_key.clone()),
        }
    }
}

/// One conversation. Owns the trip request, the phase and the append-only
/// message log for its lifetime; nothing is persisted beyond it.
pub struct Session {
    trip: TripRequest,
    phase: Phase,
    messages: Vec<ConversationMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            trip: TripRequest::new(),
            phase: Phase::AwaitingInitialInput,
            messages: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Mode {
        match self.phase {
            Phase::GeneralQa => Mode::GeneralQa,
            _ => Mode::Gathering,
        }
    }

    pub fn trip(&self) -> &TripRequest {
        &self.trip
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Absorb a freshly extracted or updated trip request and decide how to
    /// continue. If fields are missing the prompt for them is appended and
    /// the controller waits for another answer; otherwise the caller should
    /// fetch travel data.
    pub fn apply_trip_update(&mut self, trip: TripRequest) -> Advance {
        // Q&A mode is terminal: later updates can no longer reopen gathering.
        if self.phase == Phase::GeneralQa {
            return Advance::Proceed;
        }
        self.trip = trip;
        let missing = self.trip.missing_labels();
        if missing.is_empty() {
            Advance::Proceed
        } else {
            self.phase = Phase::AwaitingMissingFields;
            self.messages
                .push(ConversationMessage::assistant(missing_fields_prompt(&missing)));
            Advance::AskMissing(missing)
        }
    }

    /// Handle one user turn. Returns the messages appended in response.
    pub async fn handle_message(
        &mut self,
        text: &str,
        providers: &Providers,
    ) -> Vec<ConversationMessage> {
        self.messages.push(ConversationMessage::user(text));
        let reply_start = self.messages.len();

        match self.phase {
            Phase::AwaitingInitialInput => {
                match extract::extract_trip_request(&providers.llm, text).await {
                    Ok(trip) => {
                        if self.apply_trip_update(trip) == Advance::Proceed {
                            self.run_ready(providers).await;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Initial extraction failed");
                        self.messages.push(ConversationMessage::assistant(PARSE_APOLOGY));
                    }
                }
            }
            Phase::AwaitingMissingFields => {
                match extract::update_missing_fields(&providers.llm, text, &self.trip).await {
                    Ok(trip) => {
                        if self.apply_trip_update(trip) == Advance::Proceed {
                            self.run_ready(providers).await;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Field update failed");
                        self.messages.push(ConversationMessage::assistant(PARSE_APOLOGY));
                    }
                }
            }
            Phase::GeneralQa => {
                // Should be unreachable with an unknown destination, but the
                // conversation must stay usable if it ever happens.
                if self.trip.destination == UNKNOWN {
                    self.messages
                        .push(ConversationMessage::assistant(DESTINATION_CLARIFICATION));
                } else {
                    match providers
                        .llm
                        .answer_destination_question(text, &self.trip.destination)
                        .await
                    {
                        Ok(answer) => {
                            self.messages.push(ConversationMessage::assistant(answer));
                        }
                        Err(e) => {
                            warn!(error = %e, "Destination question failed");
                            self.messages.push(ConversationMessage::assistant(QA_APOLOGY));
                        }
                    }
                }
            }
        }

        self.messages[reply_start..].to_vec()
    }

    /// The one-shot transition out of gathering: announce the completed
    /// details, fetch all three categories concurrently, append the results
    /// and a closing summary, and switch to Q&A mode.
    async fn run_ready(&mut self, providers: &Providers) {
        info!(
            origin = %self.trip.origin,
            destination = %self.trip.destination,
            start_date = %self.trip.start_date,
            end_date = %self.trip.end_date,
            "Trip details complete, fetching travel data"
        );
        self.messages.push(ConversationMessage::assistant(format!(
            "Great! I've gathered all the necessary travel details for your trip from {} to {} ({} to {}).",
            self.trip.origin, self.trip.destination, self.trip.start_date, self.trip.end_date,
        )));

        let (flights, weather, attractions) = tokio::join!(
            providers.flights.search(
                &self.trip.origin,
                &self.trip.destination,
                &self.trip.start_date,
                Some(&self.trip.end_date),
            ),
            providers.weather.report(
                &providers.llm,
                &self.trip.destination,
                &self.trip.start_date,
                &self.trip.end_date,
            ),
            providers.attractions.lookup(&self.trip.destination),
        );

        self.messages
            .extend(assemble_results(flights, weather, attractions));
        self.messages.push(ConversationMessage::assistant(format!(
            "That's everything I could find for now. Feel free to ask me anything else about {}!",
            self.trip.destination,
        )));
        self.phase = Phase::GeneralQa;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert the three fetch outcomes into conversation messages.
///
/// A failed fetch is logged and skipped without touching the other two; a
/// successful but empty result renders an explicit "none found" note.
pub fn assemble_results(
    flights: Result<FlightSearchResponse, ConciergeError>,
    weather: Result<WeatherReport, ConciergeError>,
    attractions: Result<Vec<Attraction>, ConciergeError>,
) -> Vec<ConversationMessage> {
    let mut messages = Vec::new();

    match flights {
        Ok(response) if response.departing_flights.is_empty() => {
            messages.push(ConversationMessage::assistant(
                "No flights were found for your route and dates.",
            ));
        }
        Ok(response) => messages.push(ConversationMessage::Flights { flights: response }),
        Err(e) => warn!(error = %e, "Flight search failed"),
    }

    match weather {
        Ok(report) if report.is_empty() => {
            messages.push(ConversationMessage::assistant(
                "No weather information was available for your destination.",
            ));
        }
        Ok(report) => messages.push(ConversationMessage::Weather { weather: report }),
        Err(e) => warn!(error = %e, "Weather lookup failed"),
    }

    match attractions {
        Ok(list) if list.is_empty() => {
            messages.push(ConversationMessage::assistant(
                "No attractions were found for your destination.",
            ));
        }
        Ok(list) => messages.push(ConversationMessage::Attractions { attractions: list }),
        Err(e) => warn!(error = %e, "Attractions lookup failed"),
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flights::Flight;
    use crate::Role;

    fn complete_trip() -> TripRequest {
        TripRequest {
            start_date: "2025-06-01".to_string(),
            end_date: "2025-06-08".to_string(),
            origin: "new york".to_string(),
            destination: "paris".to_string(),
        }
    }

    #[test]
    fn test_prompt_grammar_single_field() {
        assert_eq!(
            missing_fields_prompt(&["start date"]),
            "Please provide the start date:"
        );
    }

    #[test]
    fn test_prompt_grammar_two_fields() {
        assert_eq!(
            missing_fields_prompt(&["start date", "end date"]),
            "Please provide the start date and end date:"
        );
    }

    #[test]
    fn test_prompt_grammar_three_fields() {
        assert_eq!(
            missing_fields_prompt(&["start date", "end date", "departure city"]),
            "Please provide the start date, end date, and departure city:"
        );
    }

    #[test]
    fn test_prompt_grammar_four_fields() {
        assert_eq!(
            missing_fields_prompt(&["start date", "end date", "departure city", "destination"]),
            "Please provide the start date, end date, departure city, and destination:"
        );
    }

    #[test]
    fn test_complete_extraction_proceeds_without_prompt() {
        let mut session = Session::new();
        let advance = session.apply_trip_update(complete_trip());
        assert_eq!(advance, Advance::Proceed);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_missing_destination_prompts_and_waits() {
        let mut session = Session::new();
        let mut trip = complete_trip();
        trip.destination = UNKNOWN.to_string();

        let advance = session.apply_trip_update(trip);
        assert_eq!(advance, Advance::AskMissing(vec!["destination"]));
        assert_eq!(session.phase(), Phase::AwaitingMissingFields);
        assert_eq!(session.mode(), Mode::Gathering);

        match &session.messages()[0] {
            ConversationMessage::Text { role, text } => {
                assert_eq!(*role, Role::Assistant);
                assert_eq!(text, "Please provide the destination:");
            }
            other => panic!("expected a text message, got {other:?}"),
        }
    }

    #[test]
    fn test_repeated_update_reprompts_with_remaining_subset() {
        let mut session = Session::new();
        let advance = session.apply_trip_update(TripRequest::new());
        assert_eq!(
            advance,
            Advance::AskMissing(vec!["start date", "end date", "departure city", "destination"])
        );

        let mut trip = complete_trip();
        trip.end_date = UNKNOWN.to_string();
        let advance = session.apply_trip_update(trip);
        assert_eq!(advance, Advance::AskMissing(vec!["end date"]));
        assert_eq!(session.phase(), Phase::AwaitingMissingFields);
    }

    #[test]
    fn test_mode_transition_is_one_directional() {
        let mut session = Session::new();
        session.trip = complete_trip();
        session.phase = Phase::GeneralQa;
        assert_eq!(session.mode(), Mode::GeneralQa);

        // Even an all-unknown update cannot reopen gathering.
        assert_eq!(session.apply_trip_update(TripRequest::new()), Advance::Proceed);
        assert_eq!(session.phase(), Phase::GeneralQa);
        assert_eq!(session.mode(), Mode::GeneralQa);
        assert!(session.trip().is_complete());
    }

    fn sample_flights() -> FlightSearchResponse {
        FlightSearchResponse {
            departing_flights: vec![Flight {
                option: "1".to_string(),
                price: "$639".to_string(),
                duration: "6h 50m".to_string(),
                details: vec!["Norse Atlantic Airways N0 302".to_string()],
            }],
            returning_flights: Vec::new(),
            has_return: false,
        }
    }

    fn sample_weather() -> WeatherReport {
        WeatherReport {
            description: Some("Warm and sunny.".to_string()),
            forecasts: None,
            location: None,
        }
    }

    fn sample_attractions() -> Vec<Attraction> {
        vec![Attraction {
            name: "Louvre Museum".to_string(),
            category: None,
            address: None,
        }]
    }

    #[test]
    fn test_failed_fetch_is_isolated() {
        let messages = assemble_results(
            Err(ConciergeError::UpstreamError("boom".to_string())),
            Ok(sample_weather()),
            Ok(sample_attractions()),
        );
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ConversationMessage::Weather { .. }));
        assert!(matches!(messages[1], ConversationMessage::Attractions { .. }));
    }

    #[test]
    fn test_all_fetches_succeed() {
        let messages = assemble_results(
            Ok(sample_flights()),
            Ok(sample_weather()),
            Ok(sample_attractions()),
        );
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], ConversationMessage::Flights { .. }));
    }

    #[test]
    fn test_empty_results_render_none_found_notes() {
        let empty_flights = FlightSearchResponse {
            departing_flights: Vec::new(),
            returning_flights: Vec::new(),
            has_return: false,
        };
        let messages = assemble_results(
            Ok(empty_flights),
            Ok(sample_weather()),
            Ok(Vec::new()),
        );
        assert_eq!(messages.len(), 3);
        match &messages[0] {
            ConversationMessage::Text { text, .. } => {
                assert!(text.contains("No flights"));
            }
            other => panic!("expected a text message, got {other:?}"),
        }
        match &messages[2] {
            ConversationMessage::Text { text, .. } => {
                assert!(text.contains("No attractions"));
            }
            other => panic!("expected a text message, got {other:?}"),
        }
    }
}
