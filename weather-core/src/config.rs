use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::Coordinates;

/// Base URLs of the external services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub forecast: String,
    pub geocoding_search: String,
    pub reverse_geocoding: String,
    pub ip_lookup: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            forecast: "https://api.open-meteo.com/v1/forecast".to_string(),
            geocoding_search: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            reverse_geocoding: "https://api.bigdatacloud.net/data/reverse-geocode-client"
                .to_string(),
            ip_lookup: "https://ipapi.co/json/".to_string(),
        }
    }
}

/// Search box timing and result count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub blur_grace_ms: u64,
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 400, blur_grace_ms: 200, limit: 5 }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn blur_grace(&self) -> Duration {
        Duration::from_millis(self.blur_grace_ms)
    }
}

/// Device geolocation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub timeout_secs: u64,
    pub enable_high_accuracy: bool,

    /// Fixed device position, for hosts that know where they are.
    ///
    /// Example TOML:
    /// [geolocation.device]
    /// latitude = 52.52
    /// longitude = 13.41
    pub device: Option<Coordinates>,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self { timeout_secs: 5, enable_high_accuracy: true, device: None }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Language for geocoding results, e.g. "en".
    pub language: String,

    /// Default tracing filter when `RUST_LOG` is not set.
    pub log_level: String,

    pub request_timeout_secs: u64,
    pub endpoints: EndpointConfig,
    pub search: SearchConfig,
    pub geolocation: GeolocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            log_level: "info".to_string(),
            request_timeout_secs: 10,
            endpoints: EndpointConfig::default(),
            search: SearchConfig::default(),
            geolocation: GeolocationConfig::default(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-widget", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be at least 1"));
        }
        if self.geolocation.timeout_secs == 0 {
            return Err(anyhow!("geolocation.timeout_secs must be at least 1"));
        }
        if !(1..=5).contains(&self.search.limit) {
            return Err(anyhow!(
                "search.limit must be between 1 and 5, got {}",
                self.search.limit
            ));
        }
        if let Some(device) = self.geolocation.device {
            if !(-90.0..=90.0).contains(&device.latitude)
                || !(-180.0..=180.0).contains(&device.longitude)
            {
                return Err(anyhow!("geolocation.device is out of range: {device}"));
            }
        }
        Ok(())
    }

    /// Convenience helper: set or clear the fixed device position.
    pub fn set_device_position(&mut self, position: Option<Coordinates>) {
        self.geolocation.device = position;
    }
}
