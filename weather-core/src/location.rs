//! Resolve where the user is: a device fix if one is available, otherwise an
//! IP-based estimate.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    config::GeolocationConfig,
    error::{GeolocationError, LocationError},
    model::{Coordinates, LocationSource, ResolvedLocation},
    provider::IpLocator,
};

/// Options passed to the device geolocation capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the device may return. Zero forces a fresh fix.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(5),
            maximum_age: Duration::ZERO,
        }
    }
}

impl From<&GeolocationConfig> for PositionOptions {
    fn from(cfg: &GeolocationConfig) -> Self {
        Self {
            enable_high_accuracy: cfg.enable_high_accuracy,
            timeout: Duration::from_secs(cfg.timeout_secs),
            maximum_age: Duration::ZERO,
        }
    }
}

/// Device positioning capability (GPS, OS location service, ...).
#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, GeolocationError>;
}

/// A host with no positioning capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl Geolocator for NoGeolocation {
    async fn current_position(&self, _: &PositionOptions) -> Result<Coordinates, GeolocationError> {
        Err(GeolocationError::Unavailable)
    }
}

/// A host whose position is known up front, e.g. from configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    position: Coordinates,
}

impl FixedGeolocator {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self, _: &PositionOptions) -> Result<Coordinates, GeolocationError> {
        Ok(self.position)
    }
}

/// Pick the geolocator the config describes.
pub fn geolocator_from_config(cfg: &GeolocationConfig) -> Arc<dyn Geolocator> {
    match cfg.device {
        Some(position) => Arc::new(FixedGeolocator::new(position)),
        None => Arc::new(NoGeolocation),
    }
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    geolocator: Arc<dyn Geolocator>,
    ip_locator: Arc<dyn IpLocator>,
    options: PositionOptions,
}

impl LocationResolver {
    pub fn new(
        geolocator: Arc<dyn Geolocator>,
        ip_locator: Arc<dyn IpLocator>,
        options: PositionOptions,
    ) -> Self {
        Self { geolocator, ip_locator, options }
    }

    /// Device fix first; any device failure falls back to the IP lookup.
    ///
    /// # Errors
    /// Returns [`LocationError::Unavailable`] only when the IP lookup fails as well.
    pub async fn resolve(&self) -> Result<ResolvedLocation, LocationError> {
        let device = tokio::time::timeout(
            self.options.timeout,
            self.geolocator.current_position(&self.options),
        )
        .await
        .unwrap_or(Err(GeolocationError::Timeout));

        let device_err = match device {
            Ok(coordinates) => {
                info!(%coordinates, "Resolved location from device");
                return Ok(ResolvedLocation { coordinates, source: LocationSource::Gps });
            }
            Err(e) => e,
        };

        debug!("Device geolocation failed ({device_err}), falling back to IP lookup");

        match self.ip_locator.locate().await {
            Ok(coordinates) => {
                info!(%coordinates, "Resolved location from IP address");
                Ok(ResolvedLocation { coordinates, source: LocationSource::Ip })
            }
            Err(ip) => {
                warn!("IP location lookup failed: {ip:#}");
                Err(LocationError::Unavailable { device: device_err, ip })
            }
        }
    }
}
