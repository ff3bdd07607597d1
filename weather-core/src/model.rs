use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the globe. Replaced wholesale whenever the location changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Where the current coordinates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Gps,
    Ip,
    Search,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::Gps => "gps",
            LocationSource::Ip => "ip",
            LocationSource::Search => "search",
        }
    }
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinates tagged with their provenance, as produced by the location resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub source: LocationSource,
}

/// Human-readable place derived from coordinates by reverse geocoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceName {
    pub name: String,
    pub country: String,
}

impl fmt::Display for PlaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.country.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}, {}", self.name, self.country)
        }
    }
}

/// One forward-geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCandidate {
    pub id: Option<u64>,
    pub name: String,
    pub country: String,
    pub admin_area: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCandidate {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// "name, country", the text shown in the field after selection.
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }

    /// Suggestion list label, with the admin area when the geocoder knows one.
    pub fn label(&self) -> String {
        match self.admin_area.as_deref().filter(|a| !a.is_empty()) {
            Some(admin) => format!("{}, {}, {}", self.name, admin, self.country),
            None => self.display_name(),
        }
    }
}

/// Emitted by the search box when the user picks a suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedLocation {
    pub coordinates: Coordinates,
    pub display_name: String,
}

impl From<&GeoCandidate> for SelectedLocation {
    fn from(candidate: &GeoCandidate) -> Self {
        Self {
            coordinates: candidate.coordinates(),
            display_name: candidate.display_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Observation instant, carried in the location's UTC offset.
    pub timestamp: DateTime<FixedOffset>,
    pub temperature_c: f64,
    pub rain_mm: f64,
    pub is_day: bool,
    pub humidity_pct: f64,
    pub wind_speed_kph: f64,
    pub snowfall: f64,
    pub snowfall_unit: String,
}

pub const DEFAULT_SNOWFALL_UNIT: &str = "cm";

impl CurrentConditions {
    /// Conditions at `timestamp` with every measurement absent.
    pub fn empty_at(timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp,
            temperature_c: 0.0,
            rain_mm: 0.0,
            is_day: true,
            humidity_pct: 0.0,
            wind_speed_kph: 0.0,
            snowfall: 0.0,
            snowfall_unit: DEFAULT_SNOWFALL_UNIT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecastPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub temperature_c: f64,
}

/// Current conditions plus the chronological hourly series from one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    pub hourly: Vec<HourlyForecastPoint>,
}
