//! # Trip Concierge Library
//!
//! A conversational travel concierge. A chat turn is parsed into structured
//! trip details by an LLM, missing fields are gathered across turns, and a
//! completed trip fans out to flight, weather and attraction providers whose
//! results are appended to the conversation.

pub mod attractions;
pub mod cities;
pub mod config;
pub mod dialogue;
pub mod extract;
pub mod flights;
pub mod geo;
pub mod llm;
pub mod weather;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export main types for convenience
pub use attractions::{Attraction, AttractionsClient};
pub use config::Config;
pub use dialogue::{assemble_results, missing_fields_prompt, Advance, Mode, Phase, Providers, Session};
pub use flights::{Flight, FlightSearchClient, FlightSearchResponse};
pub use llm::{parse_structured_llm_response, LlmClient, LlmError};
pub use weather::{ForecastDay, Location, WeatherClient, WeatherReport};

/// Sentinel literal marking a trip field that has not been determined yet.
pub const UNKNOWN: &str = "unknown";

/// Error types for the concierge library
#[derive(Error, Debug)]
pub enum ConciergeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("LLM call failed: {0}")]
    LlmError(#[from] LlmError),

    #[error("JSON handling failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    #[error("Invalid date format: {0}")]
    DateParseError(String),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),
}

/// The trip details gathered across conversation turns.
///
/// Every field holds either a real value or the [`UNKNOWN`] sentinel; a field
/// is never empty or absent once a request exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    pub start_date: String,
    pub end_date: String,
    pub origin: String,
    pub destination: String,
}

impl TripRequest {
    /// A fresh request with every field still unknown.
    pub fn new() -> Self {
        Self {
            start_date: UNKNOWN.to_string(),
            end_date: UNKNOWN.to_string(),
            origin: UNKNOWN.to_string(),
            destination: UNKNOWN.to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing_keys().is_empty()
    }

    /// JSON keys of the fields still unknown, in check order.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.start_date == UNKNOWN {
            missing.push("start_date");
        }
        if self.end_date == UNKNOWN {
            missing.push("end_date");
        }
        if self.origin == UNKNOWN {
            missing.push("origin");
        }
        if self.destination == UNKNOWN {
            missing.push("destination");
        }
        missing
    }

    /// User-facing names of the fields still unknown, in check order.
    pub fn missing_labels(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.start_date == UNKNOWN {
            missing.push("start date");
        }
        if self.end_date == UNKNOWN {
            missing.push("end date");
        }
        if self.origin == UNKNOWN {
            missing.push("departure city");
        }
        if self.destination == UNKNOWN {
            missing.push("destination");
        }
        missing
    }

    /// Fold an update into this request, taking updated values only for
    /// fields that are still unknown. Already-known fields pass through
    /// byte-identical regardless of what the update contains.
    pub fn merge_missing(&self, update: TripRequest) -> TripRequest {
        let pick = |current: &str, updated: String| -> String {
            if current == UNKNOWN {
                updated
            } else {
                current.to_string()
            }
        };
        TripRequest {
            start_date: pick(&self.start_date, update.start_date),
            end_date: pick(&self.end_date, update.end_date),
            origin: pick(&self.origin, update.origin),
            destination: pick(&self.destination, update.destination),
        }
    }
}

impl Default for TripRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Who authored a plain-text conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the append-only conversation log. Either a plain-text turn
/// or a structured result block attributed to the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationMessage {
    Text { role: Role, text: String },
    Flights { flights: FlightSearchResponse },
    Weather { weather: WeatherReport },
    Attractions { attractions: Vec<Attraction> },
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::Text {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Text {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}
