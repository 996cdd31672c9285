//! Points-of-interest lookup via the Geoapify Places API

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::geo;
use crate::ConciergeError;

const PLACES_URL: &str = "https://api.geoapify.com/v2/places";
const PLACE_CATEGORIES: &str = "tourism.sights,tourism.attraction";
const SEARCH_RADIUS_METERS: u32 = 10_000;
const MAX_RESULTS: usize = 12;

/// One sightseeing suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attraction {
    pub name: String,
    pub category: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Deserialize)]
struct PlaceFeature {
    properties: PlaceProperties,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceProperties {
    name: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    address_line2: Option<String>,
}

/// Client for the Geoapify Places API.
pub struct AttractionsClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl AttractionsClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// List attractions around a city centre.
    pub async fn lookup(&self, city: &str) -> Result<Vec<Attraction>, ConciergeError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ConciergeError::MissingConfig("GEOAPIFY_API_KEY"))?;

        let point = geo::geocode(&self.http, city).await?;
        let filter = format!(
            "circle:{},{},{}",
            point.longitude, point.latitude, SEARCH_RADIUS_METERS
        );
        let limit = MAX_RESULTS.to_string();

        let response = self
            .http
            .get(PLACES_URL)
            .query(&[
                ("categories", PLACE_CATEGORIES),
                ("filter", filter.as_str()),
                ("limit", limit.as_str()),
                ("apiKey", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConciergeError::UpstreamError(format!(
                "places request returned {status}"
            )));
        }

        let body: PlacesResponse = response.json().await?;
        let attractions = collect_attractions(body.features);
        info!(city, count = attractions.len(), "Attractions lookup completed");
        Ok(attractions)
    }
}

/// Unnamed features are dropped; the first category tag becomes the display
/// category.
fn collect_attractions(features: Vec<PlaceFeature>) -> Vec<Attraction> {
    features
        .into_iter()
        .filter_map(|feature| {
            let properties = feature.properties;
            let name = properties.name.filter(|name| !name.trim().is_empty())?;
            Some(Attraction {
                name,
                category: properties.categories.into_iter().next(),
                address: properties.address_line2,
            })
        })
        .collect()
}
