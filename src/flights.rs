//! Flight search adapter over the SerpApi Google Flights engine
//!
//! Each leg is requested one-way; a round trip issues the two leg requests
//! concurrently with the endpoints swapped. Raw results are rendered into a
//! per-option text block and then parsed back into display-ready [`Flight`]
//! records, so the parser tolerates whatever a flight backend hands it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::ConciergeError;

const SERPAPI_URL: &str = "https://serpapi.com/search";
const OPTION_SEPARATOR: &str = "----------------------------------------";
const MAX_OPTIONS: usize = 5;

/// Primary airport code for major cities. The flight adapter keeps its own
/// table, larger than the conversational alias table, because its keys are
/// the canonical names the extractor produces.
const CITY_TO_AIRPORT: &[(&str, &str)] = &[
    ("new york", "JFK"),
    ("london", "LHR"),
    ("paris", "CDG"),
    ("tokyo", "HND"),
    ("seoul", "ICN"),
    ("los angeles", "LAX"),
    ("chicago", "ORD"),
    ("beijing", "PEK"),
    ("shanghai", "PVG"),
    ("dubai", "DXB"),
    ("singapore", "SIN"),
    ("hong kong", "HKG"),
    ("sydney", "SYD"),
    ("melbourne", "MEL"),
    ("san francisco", "SFO"),
    ("austin", "AUS"),
    ("seattle", "SEA"),
    ("miami", "MIA"),
    ("dallas", "DFW"),
    ("houston", "IAH"),
    ("atlanta", "ATL"),
    ("boston", "BOS"),
    ("washington", "IAD"),
    ("denver", "DEN"),
    ("las vegas", "LAS"),
    ("toronto", "YYZ"),
    ("vancouver", "YVR"),
    ("montreal", "YUL"),
];

/// Resolve a city name to its primary airport code.
///
/// Exact match first, then substring containment either way, and as a last
/// resort the first three letters uppercased (the input may already be a
/// code).
pub fn airport_code(city: &str) -> String {
    let city = city.trim().to_lowercase();
    if city.is_empty() {
        return String::new();
    }
    if let Some((_, code)) = CITY_TO_AIRPORT.iter().find(|(name, _)| *name == city) {
        return (*code).to_string();
    }
    if let Some((_, code)) = CITY_TO_AIRPORT
        .iter()
        .find(|(name, _)| city.contains(name) || name.contains(city.as_str()))
    {
        return (*code).to_string();
    }
    city.chars().take(3).collect::<String>().to_uppercase()
}

/// One display-ready flight option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub option: String,
    pub price: String,
    pub duration: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSearchResponse {
    pub departing_flights: Vec<Flight>,
    pub returning_flights: Vec<Flight>,
    pub has_return: bool,
}

/// Client for the SerpApi Google Flights engine.
pub struct FlightSearchClient {
    http: reqwest::Client,
    api_key: String,
}

impl FlightSearchClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Search flights between two cities. A failed return leg degrades to an
    /// empty returning list; a failed departure leg fails the whole search.
    #[instrument(level = "info", skip(self))]
    pub async fn search(
        &self,
        origin: &str,
        destination: &str,
        date: &str,
        return_date: Option<&str>,
    ) -> Result<FlightSearchResponse, ConciergeError> {
        validate_date(date)?;
        if let Some(rd) = return_date {
            validate_date(rd)?;
        }

        let departure_code = airport_code(origin);
        let arrival_code = airport_code(destination);
        info!(%departure_code, %arrival_code, "Searching flights");

        let result = match return_date {
            Some(rd) => {
                let (departing, returning) = tokio::join!(
                    self.search_leg(&departure_code, &arrival_code, date),
                    self.search_leg(&arrival_code, &departure_code, rd),
                );
                let returning_flights = match returning {
                    Ok(text) => parse_flight_options(&text),
                    Err(e) => {
                        warn!(error = %e, "Return flight search failed");
                        Vec::new()
                    }
                };
                FlightSearchResponse {
                    departing_flights: parse_flight_options(&departing?),
                    returning_flights,
                    has_return: true,
                }
            }
            None => {
                let text = self.search_leg(&departure_code, &arrival_code, date).await?;
                FlightSearchResponse {
                    departing_flights: parse_flight_options(&text),
                    returning_flights: Vec::new(),
                    has_return: false,
                }
            }
        };

        info!(
            departing = result.departing_flights.len(),
            returning = result.returning_flights.len(),
            "Flight search completed"
        );
        Ok(result)
    }

    /// One one-way request, rendered into the option text block.
    async fn search_leg(&self, from: &str, to: &str, date: &str) -> Result<String, ConciergeError> {
        let response = self
            .http
            .get(SERPAPI_URL)
            .query(&[
                ("engine", "google_flights"),
                ("departure_id", from),
                ("arrival_id", to),
                ("outbound_date", date),
                ("currency", "USD"),
                ("hl", "en"),
                ("type", "2"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConciergeError::UpstreamError(format!(
                "flight search returned {status}: {body}"
            )));
        }

        let data: Value = response.json().await?;
        if let Some(message) = data.get("error").and_then(Value::as_str) {
            return Err(ConciergeError::UpstreamError(message.to_string()));
        }

        Ok(format_flight_options(&data))
    }
}

fn validate_date(date: &str) -> Result<(), ConciergeError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ConciergeError::DateParseError(format!("expected YYYY-MM-DD, got {date}")))?;
    Ok(())
}

/// Render the top options of a raw search result into the text block format:
/// an `Option N:` header, `Price:` and `Duration:` lines, one line pair per
/// segment, layover notes, and a dashed separator between options.
pub fn format_flight_options(data: &Value) -> String {
    let empty: Vec<Value> = Vec::new();
    let best = data
        .get("best_flights")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let other = data
        .get("other_flights")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let mut blocks = Vec::new();
    for (idx, flight) in best.iter().chain(other.iter()).take(MAX_OPTIONS).enumerate() {
        let mut lines = vec![format!("Option {}:", idx + 1)];

        if let Some(price) = flight.get("price").and_then(Value::as_i64) {
            lines.push(format!("Price: ${price}"));
        }
        if let Some(total) = flight.get("total_duration").and_then(Value::as_i64) {
            lines.push(format!("Duration: {}h {}m", total / 60, total % 60));
        }

        for segment in flight.get("flights").and_then(Value::as_array).into_iter().flatten() {
            let airline = segment
                .get("airline")
                .and_then(Value::as_str)
                .unwrap_or("Unknown Airline");
            let number = segment
                .get("flight_number")
                .and_then(Value::as_str)
                .unwrap_or("");
            lines.push(format!(
                "\n{airline} {number}\n{} → {}",
                endpoint(segment.get("departure_airport")),
                endpoint(segment.get("arrival_airport")),
            ));
        }

        for layover in flight.get("layovers").and_then(Value::as_array).into_iter().flatten() {
            let id = layover.get("id").and_then(Value::as_str).unwrap_or("???");
            let duration = layover.get("duration").and_then(Value::as_i64).unwrap_or(0);
            lines.push(format!(
                "Layover at {id}: {}h {}m",
                duration / 60,
                duration % 60
            ));
        }

        blocks.push(lines.join("\n"));
        blocks.push(OPTION_SEPARATOR.to_string());
    }

    blocks.join("\n")
}

fn endpoint(airport: Option<&Value>) -> String {
    let id = airport
        .and_then(|a| a.get("id"))
        .and_then(Value::as_str)
        .unwrap_or("???");
    let time = airport
        .and_then(|a| a.get("time"))
        .and_then(Value::as_str)
        .unwrap_or("");
    format!("{id} {time}")
}

/// Parse a flight option text block into [`Flight`] records.
///
/// Tolerant by construction: chunks without an `Option` header are skipped,
/// missing price or duration lines become `"N/A"`, everything else lands in
/// the details list in order.
pub fn parse_flight_options(data: &str) -> Vec<Flight> {
    let data = data.trim_matches('"').replace("\\n", "\n");

    let mut options = Vec::new();
    for chunk in data.split(OPTION_SEPARATOR) {
        let lines: Vec<&str> = chunk
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(header) = lines.first().filter(|line| line.starts_with("Option")) else {
            continue;
        };

        let option = header
            .trim_start_matches("Option")
            .trim_end_matches(':')
            .trim()
            .to_string();
        let price = lines
            .iter()
            .find_map(|line| line.strip_prefix("Price:"))
            .map(str::trim)
            .unwrap_or("N/A")
            .to_string();
        let duration = lines
            .iter()
            .find_map(|line| line.strip_prefix("Duration:"))
            .map(str::trim)
            .unwrap_or("N/A")
            .to_string();
        let details = lines
            .iter()
            .skip(1)
            .filter(|line| {
                !line.starts_with("Price:")
                    && !line.starts_with("Duration:")
                    && !line.starts_with("Option")
            })
            .map(|line| line.to_string())
            .collect();

        options.push(Flight {
            option,
            price,
            duration,
            details,
        });
    }
    options
}
