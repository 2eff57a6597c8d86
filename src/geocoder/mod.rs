use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::GeocoderConfig;
use crate::geo::Coordinates;

/// Best match for an address or postal code
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedLocation {
    pub coordinates: Coordinates,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Provider answered but had no match for the query
    #[error("No results for {0}")]
    NoResults(String),

    #[error("Geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoder returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<GeocodedLocation, GeocodeError>;
}

/// MapQuest-compatible geocoding over HTTP
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    street: Option<String>,
    /// city
    admin_area5: Option<String>,
    /// state
    admin_area3: Option<String>,
    /// country
    admin_area1: Option<String>,
    postal_code: Option<String>,
    lat_lng: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<MapQuestLocation> for GeocodedLocation {
    fn from(loc: MapQuestLocation) -> Self {
        let street = non_empty(loc.street);
        let city = non_empty(loc.admin_area5);
        let state = non_empty(loc.admin_area3);
        let zipcode = non_empty(loc.postal_code);
        let country = non_empty(loc.admin_area1);

        let state_zip = [state.as_deref(), zipcode.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let parts: Vec<&str> = [street.as_deref(), city.as_deref(), Some(state_zip.as_str()), country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        let formatted_address = (!parts.is_empty()).then(|| parts.join(", "));

        Self {
            coordinates: Coordinates::new(loc.lat_lng.lat, loc.lat_lng.lng),
            formatted_address,
            street,
            city,
            state,
            zipcode,
            country,
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, query: &str) -> Result<GeocodedLocation, GeocodeError> {
        let url = format!("{}/address", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("location", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body: MapQuestResponse = response.json().await?;
        body.results
            .into_iter()
            .flat_map(|r| r.locations)
            .next()
            .map(GeocodedLocation::from)
            .ok_or_else(|| GeocodeError::NoResults(query.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_payload() {
        let body: MapQuestResponse = serde_json::from_value(serde_json::json!({
            "results": [{
                "locations": [{
                    "street": "233 Bay State Rd",
                    "adminArea5": "Boston",
                    "adminArea3": "MA",
                    "adminArea1": "US",
                    "postalCode": "02215",
                    "latLng": {"lat": 42.350891, "lng": -71.106872}
                }]
            }]
        }))
        .unwrap();

        let location: GeocodedLocation = body
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .next()
            .map(GeocodedLocation::from)
            .unwrap();
        assert_eq!(location.coordinates, Coordinates::new(42.350891, -71.106872));
        assert_eq!(location.city.as_deref(), Some("Boston"));
        assert_eq!(
            location.formatted_address.as_deref(),
            Some("233 Bay State Rd, Boston, MA 02215, US")
        );
    }

    #[test]
    fn blank_fields_are_dropped() {
        let loc: MapQuestLocation = serde_json::from_value(serde_json::json!({
            "street": "",
            "adminArea5": "Boston",
            "adminArea3": "",
            "adminArea1": "US",
            "postalCode": "",
            "latLng": {"lat": 1.0, "lng": 2.0}
        }))
        .unwrap();
        let location = GeocodedLocation::from(loc);
        assert_eq!(location.street, None);
        assert_eq!(location.formatted_address.as_deref(), Some("Boston, US"));
    }
}
