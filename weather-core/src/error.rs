//! Error types for location, geocoding and forecast lookups.
//!
//! Detailed errors stay inside the core and end up in logs. The widget only
//! ever shows the short messages carried by [`AppError`].

use thiserror::Error;

/// Failures of the device geolocation capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Device geolocation is not available")]
    Unavailable,
    #[error("Location request timed out")]
    Timeout,
}

/// Both the device fix and the IP fallback failed.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Could not determine location: {device}; IP lookup failed: {ip}")]
    Unavailable {
        device: GeolocationError,
        #[source]
        ip: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Geocoding service returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("Failed to parse geocoding response: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Forecast request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Forecast service returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("Failed to parse forecast response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Forecast response is missing the {0} block")]
    MissingBlock(&'static str),
    #[error("Malformed forecast response: {0}")]
    Malformed(String),
}

/// What the widget shows the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Unable to fetch your location. Please search for a city.")]
    LocationUnavailable,
    #[error("Failed to fetch weather data. Please try again.")]
    WeatherFetchFailed,
}

impl From<&LocationError> for AppError {
    fn from(_: &LocationError) -> Self {
        AppError::LocationUnavailable
    }
}

impl From<&WeatherError> for AppError {
    fn from(_: &WeatherError) -> Self {
        AppError::WeatherFetchFailed
    }
}

impl From<&GeocodeError> for AppError {
    fn from(_: &GeocodeError) -> Self {
        AppError::WeatherFetchFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_match_widget_copy() {
        assert_eq!(
            AppError::LocationUnavailable.to_string(),
            "Unable to fetch your location. Please search for a city."
        );
        assert_eq!(
            AppError::WeatherFetchFailed.to_string(),
            "Failed to fetch weather data. Please try again."
        );
    }

    #[test]
    fn detailed_errors_map_to_generic_messages() {
        let err = WeatherError::MissingBlock("hourly");
        assert_eq!(AppError::from(&err), AppError::WeatherFetchFailed);
        assert!(err.to_string().contains("hourly"));

        let err = LocationError::Unavailable {
            device: GeolocationError::PermissionDenied,
            ip: anyhow::anyhow!("connection refused"),
        };
        assert_eq!(AppError::from(&err), AppError::LocationUnavailable);
        assert!(err.to_string().contains("permission denied"));
    }
}
