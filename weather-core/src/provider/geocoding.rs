//! Place search and reverse geocoding.
//!
//! Forward search goes to the Open-Meteo geocoding API, reverse lookup to
//! BigDataCloud's client-side endpoint. Neither needs an API key.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::GeocodeError,
    model::{Coordinates, GeoCandidate, PlaceName},
    provider::truncate_body,
};

use super::Geocoder;

pub const MAX_SEARCH_RESULTS: usize = 5;
const UNKNOWN_PLACE: &str = "Unknown Location";

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    http: Client,
    search_url: String,
    reverse_url: String,
    language: String,
}

impl GeocodingClient {
    pub fn new(search_url: &str, reverse_url: &str, language: &str) -> Self {
        Self::with_client(Client::new(), search_url, reverse_url, language)
    }

    pub fn with_client(http: Client, search_url: &str, reverse_url: &str, language: &str) -> Self {
        Self {
            http,
            search_url: search_url.to_string(),
            reverse_url: reverse_url.to_string(),
            language: language.to_string(),
        }
    }

    async fn try_forward_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GeoCandidate>, GeocodeError> {
        let count = limit.to_string();
        let res = self
            .http
            .get(&self.search_url)
            .query(&[
                ("name", query),
                ("count", count.as_str()),
                ("language", self.language.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(GeocodeError::Status { status, body: truncate_body(&body) });
        }

        let parsed: SearchResponse = serde_json::from_str(&body)?;

        Ok(parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(GeoCandidate::from)
            .collect())
    }
}

#[async_trait]
impl Geocoder for GeocodingClient {
    #[instrument(skip(self), level = "debug")]
    async fn forward_search(&self, query: &str, limit: usize) -> Vec<GeoCandidate> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let limit = limit.clamp(1, MAX_SEARCH_RESULTS);
        match self.try_forward_search(query, limit).await {
            Ok(candidates) => {
                debug!(count = candidates.len(), "Search returned candidates");
                candidates
            }
            Err(e) => {
                warn!("Place search for {query:?} failed: {e}");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn reverse_lookup(&self, coordinates: Coordinates) -> Result<PlaceName, GeocodeError> {
        let res = self
            .http
            .get(&self.reverse_url)
            .query(&[
                ("latitude", coordinates.latitude.to_string()),
                ("longitude", coordinates.longitude.to_string()),
                ("localityLanguage", self.language.clone()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(GeocodeError::Status { status, body: truncate_body(&body) });
        }

        let parsed: ReverseResponse = serde_json::from_str(&body)?;
        let place = parsed.into_place_name();
        debug!(%place, "Reverse geocoded");
        Ok(place)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Option<Vec<SearchResult>>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: Option<u64>,
    name: String,
    #[serde(default)]
    country: Option<String>,
    admin2: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl From<SearchResult> for GeoCandidate {
    fn from(r: SearchResult) -> Self {
        Self {
            id: r.id,
            name: r.name,
            country: r.country.unwrap_or_default(),
            admin_area: r.admin2,
            latitude: r.latitude,
            longitude: r.longitude,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ReverseResponse {
    city: Option<String>,
    locality: Option<String>,
    principal_subdivision: Option<String>,
    country_name: Option<String>,
}

impl ReverseResponse {
    fn into_place_name(self) -> PlaceName {
        // The service reports missing fields as empty strings.
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

        let name = non_empty(self.city)
            .or_else(|| non_empty(self.locality))
            .or_else(|| non_empty(self.principal_subdivision))
            .unwrap_or_else(|| UNKNOWN_PLACE.to_string());

        PlaceName { name, country: non_empty(self.country_name).unwrap_or_default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeocodingClient {
        GeocodingClient::new(
            &format!("{}/v1/search", server.uri()),
            &format!("{}/data/reverse-geocode-client", server.uri()),
            "en",
        )
    }

    #[tokio::test]
    async fn forward_search_maps_results() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Tokyo"))
            .and(query_param("count", "5"))
            .and(query_param("language", "en"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {
                        "id": 1850147,
                        "name": "Tokyo",
                        "country": "Japan",
                        "latitude": 35.68,
                        "longitude": 139.69
                    },
                    {
                        "id": 4,
                        "name": "Tokyo",
                        "country": "Papua New Guinea",
                        "admin2": "Central",
                        "latitude": -8.4,
                        "longitude": 147.2
                    }
                ]
            })))
            .mount(&mock_server)
            .await;

        let results = client(&mock_server).forward_search("Tokyo", 5).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Tokyo");
        assert_eq!(results[0].country, "Japan");
        assert_eq!(results[0].id, Some(1850147));
        assert_eq!(results[1].admin_area.as_deref(), Some("Central"));
    }

    #[tokio::test]
    async fn forward_search_clamps_limit_and_truncates() {
        let mock_server = MockServer::start().await;
        let many: Vec<_> = (0..8)
            .map(|i| {
                json!({
                    "name": format!("Place {i}"),
                    "country": "X",
                    "latitude": 1.0,
                    "longitude": 2.0
                })
            })
            .collect();

        Mock::given(method("GET"))
            .and(query_param("count", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": many })))
            .mount(&mock_server)
            .await;

        let results = client(&mock_server).forward_search("Place", 50).await;
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn forward_search_blank_query_skips_network() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(0)
            .mount(&mock_server)
            .await;

        assert!(client(&mock_server).forward_search("   ", 5).await.is_empty());
        assert!(client(&mock_server).forward_search("", 5).await.is_empty());
    }

    #[tokio::test]
    async fn forward_search_degrades_to_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("name", "Broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("name", "Garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("name", "Nowhere"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"generationtime_ms": 0.3})),
            )
            .mount(&mock_server)
            .await;

        let geocoder = client(&mock_server);
        assert!(geocoder.forward_search("Broken", 5).await.is_empty());
        assert!(geocoder.forward_search("Garbled", 5).await.is_empty());
        assert!(geocoder.forward_search("Nowhere", 5).await.is_empty());
    }

    #[tokio::test]
    async fn reverse_lookup_prefers_city_then_locality() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/reverse-geocode-client"))
            .and(query_param("latitude", "48.85"))
            .and(query_param("longitude", "2.35"))
            .and(query_param("localityLanguage", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "city": "Paris",
                "locality": "4th Arrondissement",
                "principalSubdivision": "Île-de-France",
                "countryName": "France"
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/data/reverse-geocode-client"))
            .and(query_param("latitude", "46.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "city": "",
                "locality": "Zermatt",
                "principalSubdivision": "Valais",
                "countryName": "Switzerland"
            })))
            .mount(&mock_server)
            .await;

        let geocoder = client(&mock_server);

        let place = geocoder.reverse_lookup(Coordinates::new(48.85, 2.35)).await.unwrap();
        assert_eq!(place.to_string(), "Paris, France");

        let place = geocoder.reverse_lookup(Coordinates::new(46.5, 7.7)).await.unwrap();
        assert_eq!(place.name, "Zermatt");
    }

    #[test]
    fn reverse_falls_back_to_subdivision_then_unknown() {
        let place = ReverseResponse {
            principal_subdivision: Some("Nunavut".into()),
            country_name: Some("Canada".into()),
            ..Default::default()
        }
        .into_place_name();
        assert_eq!(place.to_string(), "Nunavut, Canada");

        let place = ReverseResponse::default().into_place_name();
        assert_eq!(place.to_string(), "Unknown Location");
    }

    #[tokio::test]
    async fn reverse_lookup_fails_on_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .reverse_lookup(Coordinates::new(1.0, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, GeocodeError::Status { .. }));
    }
}
