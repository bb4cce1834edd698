use std::collections::BTreeMap;
use crate::coordinator::Coordinator;
use crate::fetchers::fetcher::{Fetcher, Value, STEP_FIELD};

/// What a sensor shows: the field it reads and how it presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    /// Appended to the platform name to form the display name
    pub name_suffix: &'static str,
    /// Used in the unique id, e.g. `waterlevel`
    pub id_key: &'static str,
    /// Field read from the coordinator snapshot
    pub field: &'static str,
    pub unit: &'static str,
}

pub const WATER_LEVEL: SensorDescription = SensorDescription {
    name_suffix: "Water Level",
    id_key: "waterlevel",
    field: "sea-mean-deviation",
    unit: "cm",
};

pub const WIND_SPEED: SensorDescription = SensorDescription {
    name_suffix: "Wind Speed",
    id_key: "windspeed",
    field: "wind-speed",
    unit: "m/s",
};

pub const WIND_DIRECTION: SensorDescription = SensorDescription {
    name_suffix: "Wind Direction",
    id_key: "winddir",
    field: "wind-dir",
    unit: "°",
};

/// Read side of a sensor as seen by the host platform.
pub trait Entity: Send + Sync {
    fn name(&self) -> &str;
    fn unique_id(&self) -> &str;
    fn unit(&self) -> &str;
    /// Current value, `None` when there is no data
    fn state(&self) -> Option<Value>;
    fn attributes(&self) -> BTreeMap<&'static str, Value>;
}

/// One measurement exposed to the host, backed by a shared [`Coordinator`].
pub struct Sensor<F: Fetcher> {
    name: String,
    unique_id: String,
    description: SensorDescription,
    coordinator: Coordinator<F>,
}

impl<F: Fetcher> Sensor<F> {
    pub fn new(platform_name: &str, description: SensorDescription, coordinator: Coordinator<F>) -> Self {
        let key = coordinator.key();
        Sensor {
            name: format!("{platform_name} {}", description.name_suffix),
            unique_id: format!("dmi_{}_{}_{}", description.id_key, key.latitude(), key.longitude()),
            description,
            coordinator,
        }
    }

    pub fn description(&self) -> &SensorDescription {
        &self.description
    }

    pub fn coordinator(&self) -> &Coordinator<F> {
        &self.coordinator
    }

    /// Poll hook for the host. Shares the fetch with every other sensor on the same coordinator.
    pub async fn update(&self) {
        self.coordinator.request_refresh().await;
    }
}

impl<F: Fetcher> Entity for Sensor<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn unit(&self) -> &str {
        self.description.unit
    }

    fn state(&self) -> Option<Value> {
        self.coordinator.current_value(self.description.field)
    }

    fn attributes(&self) -> BTreeMap<&'static str, Value> {
        let mut attributes = BTreeMap::new();
        if let Some(step) = self.coordinator.current_step() {
            attributes.insert(STEP_FIELD, Value::Step(step));
        }
        attributes
    }
}

impl<F: Fetcher> std::fmt::Debug for Sensor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sensor")
            .field("name", &self.name)
            .field("unique_id", &self.unique_id)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
