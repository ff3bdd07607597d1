//! Core library for the `weather` widget.
//!
//! This crate defines:
//! - Configuration handling
//! - Location resolution (device fix with IP fallback)
//! - Clients for the forecast, geocoding and IP lookup services
//! - Debounced place search with a suggestion list
//! - The widget state machine and its controller
//! - Text rendering of the weather card
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod app;
pub mod config;
pub mod debounce;
pub mod error;
pub mod format;
pub mod location;
pub mod model;
pub mod provider;
pub mod search;
pub mod view;

pub use app::{AppController, AppPhase, AppState};
pub use config::Config;
pub use error::AppError;
pub use location::{Geolocator, LocationResolver, PositionOptions, geolocator_from_config};
pub use model::{
    Coordinates, GeoCandidate, LocationSource, SelectedLocation, WeatherSnapshot,
};
pub use provider::{Geocoder, IpLocator, Providers, WeatherProvider};
pub use search::{SearchInput, SearchOptions};
