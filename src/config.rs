use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_NAME: &str = "DMI Forecast";
pub const DEFAULT_LATITUDE: f64 = 56.1159;
pub const DEFAULT_LONGITUDE: f64 = 12.6026;
pub const DEFAULT_SCAN_INTERVAL_MINUTES: u64 = 240;
/// Minimum time between two fetches triggered by refresh requests
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 10;
/// One week
pub const MAX_SCAN_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
/// One day
pub const MAX_COOLDOWN_SECONDS: u64 = 24 * 60 * 60;
/// Root of the DMI forecast EDR API
pub const DEFAULT_BASE_URL: &str = "https://dmigw.govcloud.dk/v1/forecastedr";

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_latitude() -> f64 {
    DEFAULT_LATITUDE
}

fn default_longitude() -> f64 {
    DEFAULT_LONGITUDE
}

fn default_scan_interval_minutes() -> u64 {
    DEFAULT_SCAN_INTERVAL_MINUTES
}

fn default_cooldown_seconds() -> u64 {
    DEFAULT_COOLDOWN_SECONDS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Timing of a single coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Period of scheduled refreshes
    pub interval: Duration,
    /// Window after a completed refresh during which requests are deferred
    pub cooldown: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        CoordinatorSettings {
            interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_MINUTES * 60),
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECONDS),
        }
    }
}

/// Everything the sensor platform needs to set itself up.
///
/// Only `api_key` is required; every other field falls back to the `DEFAULT_*` constants
/// of this module.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct PlatformConfig {
    pub api_key: String,
    #[cfg_attr(feature = "serde", serde(default = "default_name"))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default = "default_latitude"))]
    pub latitude: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_longitude"))]
    pub longitude: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_scan_interval_minutes"))]
    pub scan_interval_minutes: u64,
    #[cfg_attr(feature = "serde", serde(default = "default_cooldown_seconds"))]
    pub cooldown_seconds: u64,
    #[cfg_attr(feature = "serde", serde(default = "default_base_url"))]
    pub base_url: String,
}

impl PlatformConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        PlatformConfig {
            api_key: api_key.into(),
            name: default_name(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            scan_interval_minutes: default_scan_interval_minutes(),
            cooldown_seconds: default_cooldown_seconds(),
            base_url: default_base_url(),
        }
    }

    /// Parses and validates a TOML document.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: PlatformConfig = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        return Ok(config);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ConfigError::InvalidLatitude(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ConfigError::InvalidLongitude(self.longitude));
        }
        if self.scan_interval_minutes == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.scan_interval_minutes > MAX_SCAN_INTERVAL_MINUTES {
            return Err(ConfigError::IntervalTooLong(self.scan_interval_minutes));
        }
        if self.cooldown_seconds > MAX_COOLDOWN_SECONDS {
            return Err(ConfigError::CooldownTooLong(self.cooldown_seconds));
        }
        Ok(())
    }

    pub fn settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            interval: Duration::from_secs(self.scan_interval_minutes.saturating_mul(60)),
            cooldown: Duration::from_secs(self.cooldown_seconds),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingApiKey,
    InvalidLatitude(f64),
    InvalidLongitude(f64),
    ZeroInterval,
    IntervalTooLong(u64),
    CooldownTooLong(u64),
    Parse(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "api_key is required"),
            Self::InvalidLatitude(v) => write!(f, "latitude {v} is outside -90..=90"),
            Self::InvalidLongitude(v) => write!(f, "longitude {v} is outside -180..=180"),
            Self::ZeroInterval => write!(f, "scan_interval_minutes must be greater than zero"),
            Self::IntervalTooLong(v) => write!(f, "scan_interval_minutes {v} exceeds {MAX_SCAN_INTERVAL_MINUTES}"),
            Self::CooldownTooLong(v) => write!(f, "cooldown_seconds {v} exceeds {MAX_COOLDOWN_SECONDS}"),
            Self::Parse(msg) => write!(f, "failed to parse configuration: {msg}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_platform() {
        let config = PlatformConfig::new("key");
        assert_eq!(config.name, "DMI Forecast");
        assert_eq!(config.latitude, 56.1159);
        assert_eq!(config.longitude, 12.6026);
        assert_eq!(config.settings(), CoordinatorSettings::default());
        assert_eq!(config.settings().interval, Duration::from_secs(4 * 60 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut config = PlatformConfig::new("key");
        config.latitude = 91.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidLatitude(91.0)));

        let mut config = PlatformConfig::new("key");
        config.longitude = -180.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidLongitude(-180.5)));
    }

    #[test]
    fn rejects_blank_key_and_zero_interval() {
        assert_eq!(PlatformConfig::new("  ").validate(), Err(ConfigError::MissingApiKey));

        let mut config = PlatformConfig::new("key");
        config.scan_interval_minutes = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn rejects_oversized_interval_and_cooldown() {
        let mut config = PlatformConfig::new("key");
        config.scan_interval_minutes = u64::MAX / 2;
        assert_eq!(config.validate(), Err(ConfigError::IntervalTooLong(u64::MAX / 2)));
        // Never panics, even on a config nobody validated
        assert_eq!(config.settings().interval, Duration::from_secs(u64::MAX));

        config.scan_interval_minutes = MAX_SCAN_INTERVAL_MINUTES;
        assert!(config.validate().is_ok());

        config.cooldown_seconds = MAX_COOLDOWN_SECONDS + 1;
        assert_eq!(config.validate(), Err(ConfigError::CooldownTooLong(MAX_COOLDOWN_SECONDS + 1)));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn loads_toml_with_defaults() {
        let config = PlatformConfig::from_toml_str("api_key = \"abc\"\nlatitude = 55.5\n").unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.latitude, 55.5);
        assert_eq!(config.longitude, DEFAULT_LONGITUDE);
        assert_eq!(config.scan_interval_minutes, DEFAULT_SCAN_INTERVAL_MINUTES);

        assert!(matches!(PlatformConfig::from_toml_str("latitude = 1.0"), Err(ConfigError::Parse(_))));
        assert_eq!(
            PlatformConfig::from_toml_str("api_key = \"abc\"\nlongitude = 200.0"),
            Err(ConfigError::InvalidLongitude(200.0))
        );
    }
}
