use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::{model::Coordinates, provider::truncate_body};

use super::IpLocator;

/// ipapi.co style lookup: a GET returning at least `latitude` and `longitude`.
#[derive(Debug, Clone)]
pub struct IpLocationClient {
    http: Client,
    url: String,
}

impl IpLocationClient {
    pub fn new(url: &str) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(http: Client, url: &str) -> Self {
        Self { http, url: url.to_string() }
    }
}

#[derive(Debug, Deserialize)]
struct IpLocationResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    reason: Option<String>,
}

#[async_trait]
impl IpLocator for IpLocationClient {
    #[instrument(skip(self), level = "debug")]
    async fn locate(&self) -> Result<Coordinates> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("Failed to send IP location request")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read IP location response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "IP location request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: IpLocationResponse =
            serde_json::from_str(&body).context("Failed to parse IP location JSON")?;

        // Rate-limited responses come back 200 with a reason and no coordinates.
        match (parsed.latitude, parsed.longitude) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates::new(latitude, longitude)),
            _ => Err(anyhow!(
                "IP location response has no coordinates: {}",
                parsed.reason.as_deref().unwrap_or("unknown reason")
            )),
        }
    }
}
