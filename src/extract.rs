//! Trip field extraction and update via the LLM
//!
//! Two operations share one contract: the model returns a JSON object with
//! exactly the four trip keys, dates as `YYYY-MM-DD`, cities as lowercase
//! full names, and `"unknown"` for anything it cannot determine.

use chrono::{Datelike, Utc};
use serde_json::Value;
use tracing::debug;

use crate::llm::{parse_structured_llm_response, LlmClient};
use crate::{cities, ConciergeError, TripRequest, UNKNOWN};

const PARSER_SYSTEM_PROMPT: &str =
    "You are a travel request parser. You extract structured information from natural \
     language travel requests and return only valid JSON objects with no additional text.";

/// Prompt for the first-pass parse of a free-text travel request.
pub fn build_parse_prompt(request: &str, year: i32) -> String {
    format!(
        "Please parse this travel request and extract the key information. \
         If a date is given without a year, assume the year {year}. \
         If a key's value is not explicitly mentioned, mark it as 'unknown'. \
         Return ONLY a JSON object with these exact keys:\n\
         - start_date: in YYYY-MM-DD format\n\
         - end_date: in YYYY-MM-DD format\n\
         - origin: the city the user is leaving from\n\
         - destination: the destination city\n\n\
         Travel request: {request}\n\n\
         Respond with ONLY the JSON object, no other text."
    )
}

/// Prompt asking the model to fill in only the fields still unknown.
pub fn build_update_prompt(user_input: &str, current: &TripRequest) -> String {
    let missing = current.missing_keys().join(", ");
    let current_json = serde_json::to_string_pretty(current).unwrap_or_default();
    format!(
        "The user provided the following additional information: '{user_input}'\n\
         Current travel details: {current_json}\n\n\
         Please update ONLY these missing fields if possible: {missing}\n\
         Rules:\n\
         1. If the information is invalid or unclear for any field, keep it as 'unknown'\n\
         2. Return ONLY a valid JSON object with all fields, including unchanged ones\n\
         3. Do not include any explanation text, ONLY the JSON object\n\
         4. Format dates as YYYY-MM-DD\n\
         5. Use lowercase city names"
    )
}

/// Build a [`TripRequest`] from a parsed completion object.
///
/// Absent, non-string or empty keys default to the unknown sentinel rather
/// than failing; city fields are canonicalized before storing.
pub fn trip_request_from_value(value: &Value) -> TripRequest {
    let field = |key: &str| -> String {
        match value.get(key).and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => UNKNOWN.to_string(),
        }
    };
    TripRequest {
        start_date: field("start_date"),
        end_date: field("end_date"),
        origin: cities::normalize(&field("origin")),
        destination: cities::normalize(&field("destination")),
    }
}

/// First-pass extraction over raw user text.
pub async fn extract_trip_request(
    llm: &LlmClient,
    request: &str,
) -> Result<TripRequest, ConciergeError> {
    let prompt = build_parse_prompt(request, Utc::now().year());
    let completion = llm.complete(PARSER_SYSTEM_PROMPT, &prompt).await?;
    let value = parse_structured_llm_response(&completion)?;
    let trip = trip_request_from_value(&value);
    debug!(?trip, "Extracted trip request");
    Ok(trip)
}

/// Fill in the fields of `current` that are still unknown from new user
/// input. Known fields pass through unchanged no matter what the model
/// returns.
pub async fn update_missing_fields(
    llm: &LlmClient,
    user_input: &str,
    current: &TripRequest,
) -> Result<TripRequest, ConciergeError> {
    let prompt = build_update_prompt(user_input, current);
    let completion = llm.complete(PARSER_SYSTEM_PROMPT, &prompt).await?;
    let value = parse_structured_llm_response(&completion)?;
    let update = trip_request_from_value(&value);
    let merged = current.merge_missing(update);
    debug!(?merged, "Updated trip request");
    Ok(merged)
}
