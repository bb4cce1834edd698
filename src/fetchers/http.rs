use std::time::Duration;
use reqwest::Client;
use serde::Deserialize;
use crate::fetchers::fetcher::{FetchError, Fetcher, RawPayload, Value, STEP_FIELD};
use crate::key::DataSourceKey;

pub use crate::config::DEFAULT_BASE_URL;

/// Upper bound for one fetch, connect and body included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Collection and parameter names requested from the EDR position endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdrQuery {
    collection: String,
    parameters: Vec<String>,
}

impl EdrQuery {
    pub fn new(collection: impl Into<String>, parameters: impl IntoIterator<Item = impl Into<String>>) -> Self {
        EdrQuery {
            collection: collection.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// Storm surge model, sea level deviation from mean
    pub fn water_level() -> Self {
        EdrQuery::new("dkss_idw", ["sea-mean-deviation"])
    }

    /// Wave model, wind speed and direction
    pub fn wind() -> Self {
        EdrQuery::new("wam_dw", ["wind-speed", "wind-dir"])
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

/// Builds the client shared by every [`EdrFetcher`] of a platform.
pub fn default_client() -> Result<Client, reqwest::Error> {
    Client::builder().timeout(REQUEST_TIMEOUT).build()
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Fetches the first forecast feature at the key's position.
///
/// The location comes from the [`DataSourceKey`] passed to [`Fetcher::fetch`]; the fetcher
/// itself only knows which collection and parameters to ask for.
#[derive(Debug, Clone)]
pub struct EdrFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    query: EdrQuery,
    timeout: Duration,
}

impl EdrFetcher {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>, query: EdrQuery) -> Self {
        EdrFetcher {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            query,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Overrides [`REQUEST_TIMEOUT`]. Applied per request, whatever the client's own settings.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn query(&self) -> &EdrQuery {
        &self.query
    }

    fn position_url(&self) -> String {
        format!("{}/collections/{}/position", self.base_url.trim_end_matches('/'), self.query.collection)
    }

    fn extract(&self, collection: FeatureCollection) -> RawPayload {
        let Some(properties) = collection.features.into_iter().next().and_then(|f| f.properties) else {
            return RawPayload::empty();
        };
        let mut payload = RawPayload::empty();
        for name in &self.query.parameters {
            if let Some(v) = properties.get(name).and_then(serde_json::Value::as_f64) {
                payload.insert(name.as_str(), Value::Measurement(v));
            }
        }
        if let Some(step) = properties.get(STEP_FIELD).and_then(serde_json::Value::as_i64) {
            payload.insert(STEP_FIELD, Value::Step(step));
        }
        payload
    }
}

impl Fetcher for EdrFetcher {
    async fn fetch(&self, key: &DataSourceKey) -> Result<RawPayload, FetchError> {
        let coords = format!("POINT({} {})", key.longitude(), key.latitude());
        let parameters = self.query.parameters.join(",");

        // Errors are stripped of their URL, it contains the api key
        let response = self.client
            .get(self.position_url())
            .timeout(self.timeout)
            .query(&[
                ("coords", coords.as_str()),
                ("crs", "crs84"),
                ("parameter-name", parameters.as_str()),
                ("api-key", self.api_key.as_str()),
                ("f", "GeoJSON"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::network(key, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::response(key, status.as_u16(), status.canonical_reason().unwrap_or("unexpected status")));
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::network(key, e.without_url()))?;
        let collection: FeatureCollection = serde_json::from_slice(&bytes).map_err(|e| FetchError::parse(key, e))?;
        return Ok(self.extract(collection));
    }
}
