//! Integration tests for the trip-concierge dialogue core
//!
//! These exercise the public API end to end without any network access:
//! the slot-filling transitions, the prompt grammar, the tolerant LLM
//! response parsing, the normalizers and the fan-out result assembly.

use trip_concierge::extract::trip_request_from_value;
use trip_concierge::flights::{airport_code, parse_flight_options};
use trip_concierge::{
    assemble_results, cities, missing_fields_prompt, parse_structured_llm_response, Advance,
    Attraction, ConciergeError, ConversationMessage, FlightSearchResponse, Mode, Phase, Session,
    TripRequest, WeatherReport, UNKNOWN,
};

fn trip(start: &str, end: &str, origin: &str, destination: &str) -> TripRequest {
    TripRequest {
        start_date: start.to_string(),
        end_date: end.to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
    }
}

#[test]
fn trip_fields_are_concrete_or_sentinel() {
    // Auto-fill keeps the sentinel invariant even for adversarial output.
    let value = serde_json::json!({
        "start_date": "2025-06-01",
        "end_date": "",
        "origin": 42,
        "destination": "   "
    });
    let parsed = trip_request_from_value(&value);
    for field in [
        &parsed.start_date,
        &parsed.end_date,
        &parsed.origin,
        &parsed.destination,
    ] {
        assert!(!field.is_empty());
        assert!(field == "2025-06-01" || field == UNKNOWN);
    }
}

#[test]
fn normalizer_is_idempotent_and_alias_aware() {
    assert_eq!(cities::normalize("NYC"), "new york");
    assert_eq!(cities::normalize("new york"), "new york");
    assert_eq!(cities::normalize("cdg"), "paris");
    for input in ["NYC", "cdg", "Oslo", "somewhere nobody knows"] {
        let once = cities::normalize(input);
        assert_eq!(cities::normalize(&once), once);
    }
}

#[test]
fn prompt_grammar_matches_list_rules() {
    assert_eq!(
        missing_fields_prompt(&["start date"]),
        "Please provide the start date:"
    );
    assert_eq!(
        missing_fields_prompt(&["start date", "end date"]),
        "Please provide the start date and end date:"
    );
    assert_eq!(
        missing_fields_prompt(&["start date", "end date", "departure city"]),
        "Please provide the start date, end date, and departure city:"
    );
}

#[test]
fn complete_extraction_skips_missing_fields_prompt() {
    let mut session = Session::new();
    let advance = session.apply_trip_update(trip("2025-06-01", "2025-06-08", "new york", "paris"));
    assert_eq!(advance, Advance::Proceed);
    assert!(session.messages().is_empty());
    assert_eq!(session.mode(), Mode::Gathering);
}

#[test]
fn missing_destination_prompts_exactly_and_waits() {
    let mut session = Session::new();
    let advance = session.apply_trip_update(trip("2025-06-01", "2025-06-08", "new york", UNKNOWN));
    assert_eq!(advance, Advance::AskMissing(vec!["destination"]));
    assert_eq!(session.phase(), Phase::AwaitingMissingFields);

    match &session.messages()[0] {
        ConversationMessage::Text { text, .. } => {
            assert_eq!(text, "Please provide the destination:");
        }
        other => panic!("expected a text message, got {other:?}"),
    }
}

#[test]
fn updater_round_trip_preserves_known_fields() {
    let current = trip("2025-06-01", "2025-06-08", "new york", UNKNOWN);

    // Whatever the model claims about known fields is ignored; only the
    // missing one is taken.
    let model_output = serde_json::json!({
        "start_date": "2030-12-31",
        "end_date": "2030-12-31",
        "origin": "somewhere else",
        "destination": "paris"
    });
    let updated = current.merge_missing(trip_request_from_value(&model_output));

    assert_eq!(updated.missing_keys().len(), 0);
    assert_eq!(updated.start_date, current.start_date);
    assert_eq!(updated.end_date, current.end_date);
    assert_eq!(updated.origin, current.origin);
    assert_eq!(updated.destination, "paris");
}

#[test]
fn tolerant_parsing_recovers_fenced_and_wrapped_objects() {
    let fenced = "```json\n{\"destination\": \"tokyo\"}\n```";
    assert_eq!(
        parse_structured_llm_response(fenced).unwrap()["destination"],
        "tokyo"
    );

    let wrapped = "Sure! Here is the JSON you asked for: {\"origin\": \"seattle\"} Anything else?";
    assert_eq!(
        parse_structured_llm_response(wrapped).unwrap()["origin"],
        "seattle"
    );

    assert!(parse_structured_llm_response("I could not determine the details.").is_err());
}

#[test]
fn airport_resolution_has_three_tiers() {
    assert_eq!(airport_code("paris"), "CDG");
    assert_eq!(airport_code("greater los angeles"), "LAX");
    assert_eq!(airport_code("casablanca"), "CAS");
}

#[test]
fn flight_block_parsing_is_tolerant() {
    let block = "\
Option 1:
Price: $916
Duration: 7h 25m

Air France AF 1
JFK 2025-06-01 16:30 → CDG 2025-06-02 05:55
----------------------------------------
not a flight option at all
----------------------------------------";
    let flights = parse_flight_options(block);
    assert_eq!(flights.len(), 1);
    assert_eq!(flights[0].option, "1");
    assert_eq!(flights[0].price, "$916");
    assert_eq!(flights[0].details.len(), 2);
}

#[test]
fn failing_fetcher_does_not_suppress_other_results() {
    let weather = WeatherReport {
        description: Some("Hot and humid.".to_string()),
        forecasts: None,
        location: None,
    };
    let attractions = vec![Attraction {
        name: "Senso-ji".to_string(),
        category: Some("tourism.sights".to_string()),
        address: None,
    }];

    let messages = assemble_results(
        Err(ConciergeError::UpstreamError("flight search exploded".to_string())),
        Ok(weather),
        Ok(attractions),
    );

    assert_eq!(messages.len(), 2);
    assert!(matches!(messages[0], ConversationMessage::Weather { .. }));
    assert!(matches!(messages[1], ConversationMessage::Attractions { .. }));
}

#[test]
fn empty_flight_result_is_reported_not_errored() {
    let empty = FlightSearchResponse {
        departing_flights: Vec::new(),
        returning_flights: Vec::new(),
        has_return: false,
    };
    let messages = assemble_results(
        Ok(empty),
        Err(ConciergeError::UpstreamError("down".to_string())),
        Err(ConciergeError::UpstreamError("down".to_string())),
    );
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        ConversationMessage::Text { text, .. } => assert!(text.contains("No flights")),
        other => panic!("expected a text message, got {other:?}"),
    }
}

#[test]
fn structured_messages_serialize_with_camel_case_payloads() {
    let response = FlightSearchResponse {
        departing_flights: parse_flight_options(
            "Option 1:\nPrice: $100\nDuration: 1h 0m\nBOS 08:00 → JFK 09:00\n",
        ),
        returning_flights: Vec::new(),
        has_return: false,
    };
    let message = ConversationMessage::Flights { flights: response };
    let json = serde_json::to_value(&message).unwrap();

    assert_eq!(json["type"], "flights");
    assert_eq!(json["flights"]["hasReturn"], false);
    assert_eq!(json["flights"]["departingFlights"][0]["price"], "$100");
}
