use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::{
    error::WeatherError,
    model::{
        Coordinates, CurrentConditions, DEFAULT_SNOWFALL_UNIT, HourlyForecastPoint,
        WeatherSnapshot,
    },
    provider::truncate_body,
};

use super::WeatherProvider;

const TEMPERATURE: &str = "temperature_2m";
const RAIN: &str = "rain";
const IS_DAY: &str = "is_day";
const HUMIDITY: &str = "relative_humidity_2m";
const WIND_SPEED: &str = "wind_speed_10m";
const SNOWFALL: &str = "snowfall";

const CURRENT_VARIABLES: &[&str] = &[TEMPERATURE, RAIN, IS_DAY, HUMIDITY, WIND_SPEED, SNOWFALL];
const HOURLY_VARIABLES: &[&str] = &[TEMPERATURE];

const DEFAULT_HOURLY_INTERVAL_SECS: i64 = 3600;

/// Open-Meteo forecast client.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self { http, base_url: base_url.to_string() }
    }
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, coordinates: Coordinates) -> Result<WeatherSnapshot, WeatherError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", coordinates.latitude.to_string()),
                ("longitude", coordinates.longitude.to_string()),
                ("hourly", HOURLY_VARIABLES.join(",")),
                ("current", CURRENT_VARIABLES.join(",")),
                ("timezone", "auto".to_string()),
                ("timeformat", "unixtime".to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Status { status, body: truncate_body(&body) });
        }

        let parsed: OmForecastResponse = serde_json::from_str(&body)?;
        let snapshot = parsed.into_snapshot()?;

        debug!(
            temperature_c = snapshot.current.temperature_c,
            hourly_points = snapshot.hourly.len(),
            "Fetched forecast"
        );
        Ok(snapshot)
    }
}

/// Compact encoding of an evenly spaced time axis: `[start, end)` in steps of `interval` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
    pub interval: i64,
}

impl TimeRange {
    /// Derive the range from the sample times the provider returned.
    ///
    /// The step is taken from the first two samples; a single sample is assumed hourly.
    /// No samples give an empty range.
    pub fn from_samples(times: &[i64]) -> Result<Self, WeatherError> {
        let Some(&start) = times.first() else {
            return Ok(Self { start: 0, end: 0, interval: DEFAULT_HOURLY_INTERVAL_SECS });
        };
        let interval = match times.get(1) {
            Some(next) => next.checked_sub(start).ok_or_else(|| overflow(times))?,
            None => DEFAULT_HOURLY_INTERVAL_SECS,
        };
        let interval = if interval > 0 { interval } else { DEFAULT_HOURLY_INTERVAL_SECS };

        let end = i64::try_from(times.len())
            .ok()
            .and_then(|count| count.checked_mul(interval))
            .and_then(|span| start.checked_add(span))
            .ok_or_else(|| overflow(times))?;

        Ok(Self { start, end, interval })
    }

    pub fn len(&self) -> usize {
        if self.interval <= 0 || self.end <= self.start {
            return 0;
        }
        usize::try_from((self.end - self.start) / self.interval).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand into concrete instants carried in `offset`.
    pub fn expand(&self, offset: FixedOffset) -> Result<Vec<DateTime<FixedOffset>>, WeatherError> {
        (0..self.len())
            .map(|index| {
                let secs = i64::try_from(index)
                    .ok()
                    .and_then(|i| i.checked_mul(self.interval))
                    .and_then(|step| self.start.checked_add(step))
                    .ok_or_else(|| {
                        WeatherError::Malformed(format!("time axis step {index} overflows"))
                    })?;
                instant(secs, offset)
            })
            .collect()
    }
}

fn overflow(times: &[i64]) -> WeatherError {
    let head: Vec<_> = times.iter().take(2).collect();
    WeatherError::Malformed(format!("hourly time axis overflows: {head:?}"))
}

fn instant(secs: i64, offset: FixedOffset) -> Result<DateTime<FixedOffset>, WeatherError> {
    DateTime::from_timestamp(secs, 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or_else(|| WeatherError::Malformed(format!("timestamp {secs} is out of range")))
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    current: Option<OmCurrent>,
    #[serde(default)]
    current_units: HashMap<String, Value>,
    hourly: Option<OmHourly>,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: Option<i64>,
    #[serde(flatten)]
    values: HashMap<String, Value>,
}

impl OmCurrent {
    fn number(&self, name: &str) -> f64 {
        self.values.get(name).and_then(Value::as_f64).unwrap_or(0.0)
    }

    fn flag(&self, name: &str) -> Option<bool> {
        let value = self.values.get(name)?;
        value.as_bool().or_else(|| value.as_f64().map(|v| v != 0.0))
    }
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    #[serde(default)]
    time: Vec<i64>,
    #[serde(flatten)]
    series: HashMap<String, Value>,
}

impl OmHourly {
    fn value_at(&self, name: &str, index: usize) -> f64 {
        self.series
            .get(name)
            .and_then(Value::as_array)
            .and_then(|values| values.get(index))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

impl OmForecastResponse {
    fn into_snapshot(self) -> Result<WeatherSnapshot, WeatherError> {
        let offset = FixedOffset::east_opt(self.utc_offset_seconds).ok_or_else(|| {
            WeatherError::Malformed(format!("invalid UTC offset {}", self.utc_offset_seconds))
        })?;

        let current = self.current.ok_or(WeatherError::MissingBlock("current"))?;
        let hourly = self.hourly.ok_or(WeatherError::MissingBlock("hourly"))?;

        let time = current
            .time
            .ok_or_else(|| WeatherError::Malformed("current block has no time".to_string()))?;

        let snowfall_unit = self
            .current_units
            .get(SNOWFALL)
            .and_then(Value::as_str)
            .filter(|unit| !unit.is_empty())
            .unwrap_or(DEFAULT_SNOWFALL_UNIT)
            .to_string();

        let conditions = CurrentConditions {
            timestamp: instant(time, offset)?,
            temperature_c: current.number(TEMPERATURE),
            rain_mm: current.number(RAIN),
            is_day: current.flag(IS_DAY).unwrap_or(true),
            humidity_pct: current.number(HUMIDITY),
            wind_speed_kph: current.number(WIND_SPEED),
            snowfall: current.number(SNOWFALL),
            snowfall_unit,
        };

        let points = TimeRange::from_samples(&hourly.time)?
            .expand(offset)?
            .into_iter()
            .enumerate()
            .map(|(i, timestamp)| HourlyForecastPoint {
                timestamp,
                temperature_c: hourly.value_at(TEMPERATURE, i),
            })
            .collect();

        Ok(WeatherSnapshot { current: conditions, hourly: points })
    }
}
