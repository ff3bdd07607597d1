use crate::{
    Config,
    error::{GeocodeError, WeatherError},
    model::{Coordinates, GeoCandidate, PlaceName, WeatherSnapshot},
    provider::{geocoding::GeocodingClient, ipapi::IpLocationClient, openmeteo::WeatherClient},
};
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, sync::Arc};

pub mod geocoding;
pub mod ipapi;
pub mod openmeteo;

/// Forecast source.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, coordinates: Coordinates) -> Result<WeatherSnapshot, WeatherError>;
}

/// Forward and reverse geocoding.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Never fails: transport and decoding problems come back as no matches.
    async fn forward_search(&self, query: &str, limit: usize) -> Vec<GeoCandidate>;

    async fn reverse_lookup(&self, coordinates: Coordinates) -> Result<PlaceName, GeocodeError>;
}

/// Coarse location from the caller's public IP address.
#[async_trait]
pub trait IpLocator: Send + Sync + Debug {
    async fn locate(&self) -> anyhow::Result<Coordinates>;
}

/// The three HTTP-backed services the widget talks to.
#[derive(Debug, Clone)]
pub struct Providers {
    pub weather: Arc<dyn WeatherProvider>,
    pub geocoder: Arc<dyn Geocoder>,
    pub ip_locator: Arc<dyn IpLocator>,
}

impl Providers {
    /// Construct all clients from config, sharing one HTTP connection pool.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = http_client(config)?;
        let endpoints = &config.endpoints;

        Ok(Self {
            weather: Arc::new(WeatherClient::with_client(http.clone(), &endpoints.forecast)),
            geocoder: Arc::new(GeocodingClient::with_client(
                http.clone(),
                &endpoints.geocoding_search,
                &endpoints.reverse_geocoding,
                &config.language,
            )),
            ip_locator: Arc::new(IpLocationClient::with_client(http, &endpoints.ip_lookup)),
        })
    }
}

pub fn http_client(config: &Config) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!("weather-cli/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Shorten a response body for error messages without splitting a character.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_build_from_default_config() {
        let providers = Providers::from_config(&Config::default());
        assert!(providers.is_ok());
    }

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("not found"), "not found");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(300);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
    }
}
