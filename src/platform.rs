use std::error::Error;
use std::fmt::{Display, Formatter};
use reqwest::Client;
use crate::config::{ConfigError, PlatformConfig};
use crate::coordinator::Coordinator;
use crate::fetchers::http::{default_client, EdrFetcher, EdrQuery};
use crate::key::DataSourceKey;
use crate::registry::CoordinatorRegistry;
use crate::sensor::{Entity, Sensor, SensorDescription, WATER_LEVEL, WIND_DIRECTION, WIND_SPEED};

pub const WATER_LEVEL_SOURCE: &str = "water-level";
pub const WIND_SOURCE: &str = "wind";

#[derive(Debug)]
pub enum SetupError {
    Config(ConfigError),
    Client(reqwest::Error),
}

impl Display for SetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Client(e) => write!(f, "failed to build http client: {e}"),
        }
    }
}

impl Error for SetupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Client(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SetupError {
    fn from(value: ConfigError) -> Self {
        SetupError::Config(value)
    }
}

impl From<reqwest::Error> for SetupError {
    fn from(value: reqwest::Error) -> Self {
        SetupError::Client(value)
    }
}

/// Water level and wind sensors for one location, sharing two coordinators.
///
/// Coordinators are stopped when the platform is shut down or dropped.
pub struct Platform {
    registry: CoordinatorRegistry<EdrFetcher>,
    water_level: Coordinator<EdrFetcher>,
    wind: Coordinator<EdrFetcher>,
    sensors: Vec<Sensor<EdrFetcher>>,
}

impl Platform {
    pub async fn setup(config: &PlatformConfig) -> Result<Self, SetupError> {
        let client = default_client()?;
        return Self::setup_with_client(config, client).await;
    }

    /// Like [`setup`](Self::setup), with a caller-provided client. Every fetch is still bounded
    /// by [`REQUEST_TIMEOUT`](crate::fetchers::http::REQUEST_TIMEOUT).
    pub async fn setup_with_client(config: &PlatformConfig, client: Client) -> Result<Self, SetupError> {
        config.validate()?;
        let mut registry = CoordinatorRegistry::new(config.settings());
        let fetcher = |query: EdrQuery| EdrFetcher::new(client.clone(), &config.base_url, &config.api_key, query);

        let water_level = registry.get_or_create(
            DataSourceKey::new(WATER_LEVEL_SOURCE, config.latitude, config.longitude),
            |_| fetcher(EdrQuery::water_level()),
        );
        let wind = registry.get_or_create(
            DataSourceKey::new(WIND_SOURCE, config.latitude, config.longitude),
            |_| fetcher(EdrQuery::wind()),
        );

        // Sensors come up with data when the source is reachable; the first timer tick then
        // lands in cooldown and is skipped.
        for coordinator in [&water_level, &wind] {
            coordinator.request_refresh().await;
        }
        registry.start_all();

        let sensors = [
            (WATER_LEVEL, &water_level),
            (WIND_SPEED, &wind),
            (WIND_DIRECTION, &wind),
        ]
        .into_iter()
        .map(|(description, coordinator): (SensorDescription, &Coordinator<EdrFetcher>)| {
            Sensor::new(&config.name, description, coordinator.clone())
        })
        .collect();

        log_event!(info, name = %config.name, latitude = config.latitude, longitude = config.longitude, "platform set up");
        Ok(Platform {
            registry,
            water_level,
            wind,
            sensors,
        })
    }

    pub fn sensors(&self) -> &[Sensor<EdrFetcher>] {
        &self.sensors
    }

    pub fn entities(&self) -> impl Iterator<Item = &dyn Entity> {
        self.sensors.iter().map(|s| s as &dyn Entity)
    }

    pub fn water_level(&self) -> &Coordinator<EdrFetcher> {
        &self.water_level
    }

    pub fn wind(&self) -> &Coordinator<EdrFetcher> {
        &self.wind
    }

    pub fn shutdown(&self) {
        self.registry.stop_all();
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.shutdown();
    }
}
