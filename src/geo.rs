//! City coordinate resolution via the Open-Meteo geocoding API

use serde::Deserialize;
use tracing::debug;

use crate::ConciergeError;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

/// Resolved coordinates for a city.
#[derive(Debug, Clone)]
pub struct GeoPoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    timezone: Option<String>,
}

/// Look up a city's coordinates, taking the top-ranked match.
pub async fn geocode(http: &reqwest::Client, city: &str) -> Result<GeoPoint, ConciergeError> {
    let response = http
        .get(GEOCODING_URL)
        .query(&[("name", city), ("count", "1")])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ConciergeError::UpstreamError(format!(
            "geocoding request returned {status}"
        )));
    }

    let body: GeocodingResponse = response.json().await?;
    let hit = body
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ConciergeError::LocationNotFound(city.to_string()))?;

    debug!(
        city,
        resolved = %hit.name,
        latitude = hit.latitude,
        longitude = hit.longitude,
        "Resolved city coordinates"
    );

    Ok(GeoPoint {
        name: hit.name,
        latitude: hit.latitude,
        longitude: hit.longitude,
        timezone: hit.timezone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geocoding_response_shape() {
        let raw = r#"{
            "results": [
                {"name": "Paris", "latitude": 48.85341, "longitude": 2.3488, "timezone": "Europe/Paris"}
            ]
        }"#;
        let body: GeocodingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.results.len(), 1);
        assert_eq!(body.results[0].name, "Paris");
        assert_eq!(body.results[0].timezone.as_deref(), Some("Europe/Paris"));
    }

    #[test]
    fn test_geocoding_response_tolerates_no_results() {
        let body: GeocodingResponse = serde_json::from_str("{}").unwrap();
        assert!(body.results.is_empty());
    }
}
