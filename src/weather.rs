//! Weather lookup: Open-Meteo daily forecast plus an LLM-written
//! typical-weather description for the trip window
//!
//! The destination is geocoded first; the forecast fetch and the description
//! completion then run concurrently, and either half may fail without taking
//! the other down.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::geo::{self, GeoPoint};
use crate::llm::LlmClient;
use crate::ConciergeError;

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: String,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub wind_speed: f64,
    pub precipitation_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub timezone_abbreviation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub description: Option<String>,
    pub forecasts: Option<Vec<ForecastDay>>,
    pub location: Option<Location>,
}

impl WeatherReport {
    /// True when neither half of the lookup produced anything to show.
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.forecasts.as_ref().map_or(true, |f| f.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailySeries,
    timezone: Option<String>,
    timezone_abbreviation: Option<String>,
}

// Open-Meteo emits null for days it cannot predict, so every series is
// a vector of optionals.
#[derive(Debug, Default, Deserialize)]
struct DailySeries {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m_max: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
}

/// Client for the Open-Meteo forecast API.
pub struct WeatherClient {
    http: reqwest::Client,
}

impl WeatherClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Assemble the weather report for a destination over the trip window.
    pub async fn report(
        &self,
        llm: &LlmClient,
        destination: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<WeatherReport, ConciergeError> {
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;
        let point = geo::geocode(&self.http, destination).await?;

        let (description, forecast) = tokio::join!(
            describe_typical_weather(llm, destination, start, end),
            self.fetch_forecast(&point),
        );

        let description = match description {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "Weather description failed");
                None
            }
        };

        let (forecasts, location) = match forecast {
            Ok((days, location)) => {
                // ISO dates compare correctly as strings.
                let in_window: Vec<ForecastDay> = days
                    .into_iter()
                    .filter(|day| day.date.as_str() >= start_date && day.date.as_str() <= end_date)
                    .collect();
                (Some(in_window), Some(location))
            }
            Err(e) => {
                warn!(error = %e, "Forecast fetch failed");
                (None, None)
            }
        };

        info!(
            destination,
            has_description = description.is_some(),
            forecast_days = forecasts.as_ref().map_or(0, Vec::len),
            "Weather lookup completed"
        );
        Ok(WeatherReport {
            description,
            forecasts,
            location,
        })
    }

    async fn fetch_forecast(
        &self,
        point: &GeoPoint,
    ) -> Result<(Vec<ForecastDay>, Location), ConciergeError> {
        let params = [
            ("latitude", point.latitude.to_string()),
            ("longitude", point.longitude.to_string()),
            (
                "daily",
                "temperature_2m_max,temperature_2m_min,wind_speed_10m_max,precipitation_probability_max"
                    .to_string(),
            ),
            ("forecast_days", "16".to_string()),
            ("wind_speed_unit", "mph".to_string()),
            ("temperature_unit", "fahrenheit".to_string()),
            ("timezone", "auto".to_string()),
        ];

        let response = self.http.get(FORECAST_URL).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConciergeError::UpstreamError(format!(
                "forecast request returned {status}"
            )));
        }

        let body: ForecastResponse = response.json().await?;
        let daily = body.daily;
        let days = daily
            .time
            .iter()
            .enumerate()
            .map(|(i, date)| ForecastDay {
                date: date.clone(),
                max_temperature: value_at(&daily.temperature_2m_max, i),
                min_temperature: value_at(&daily.temperature_2m_min, i),
                wind_speed: value_at(&daily.wind_speed_10m_max, i),
                precipitation_probability: value_at(&daily.precipitation_probability_max, i),
            })
            .collect();

        let location = Location {
            latitude: point.latitude,
            longitude: point.longitude,
            timezone: body.timezone.unwrap_or_else(|| "UTC".to_string()),
            timezone_abbreviation: body
                .timezone_abbreviation
                .unwrap_or_else(|| "UTC".to_string()),
        };
        Ok((days, location))
    }
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

fn value_at(series: &[Option<f64>], idx: usize) -> f64 {
    series.get(idx).copied().flatten().unwrap_or_default()
}

fn parse_date(date: &str) -> Result<NaiveDate, ConciergeError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ConciergeError::DateParseError(format!("expected YYYY-MM-DD, got {date}")))
}

async fn describe_typical_weather(
    llm: &LlmClient,
    destination: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<String, ConciergeError> {
    let prompt = format!(
        "What is the typical weather in {destination} between {} and {}? \
         Keep it under 3 or 4 sentences but talk about the weather patterns around that \
         time of year in that location. Use fahrenheit for temperatures and mph for wind speed.",
        start.format("%B %d"),
        end.format("%B %d"),
    );
    Ok(llm
        .complete("You are a helpful travel planning assistant.", &prompt)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_response_maps_to_days() {
        let raw = r#"{
            "timezone": "Europe/Paris",
            "timezone_abbreviation": "CEST",
            "daily": {
                "time": ["2025-06-01", "2025-06-02"],
                "temperature_2m_max": [71.2, 68.9],
                "temperature_2m_min": [55.0, 54.1],
                "wind_speed_10m_max": [9.8, 12.1],
                "precipitation_probability_max": [10, null]
            }
        }"#;
        let body: ForecastResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.daily.time.len(), 2);
        assert_eq!(value_at(&body.daily.temperature_2m_max, 0), 71.2);
        // Null entries degrade to zero instead of failing the parse.
        assert_eq!(value_at(&body.daily.precipitation_probability_max, 1), 0.0);
        assert_eq!(value_at(&body.daily.precipitation_probability_max, 9), 0.0);
    }

    #[test]
    fn test_report_emptiness() {
        let empty = WeatherReport {
            description: None,
            forecasts: Some(Vec::new()),
            location: None,
        };
        assert!(empty.is_empty());

        let described = WeatherReport {
            description: Some("Mild and dry.".to_string()),
            forecasts: None,
            location: None,
        };
        assert!(!described.is_empty());
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2025-06-01").is_ok());
        assert!(parse_date("June 1st").is_err());
    }
}
