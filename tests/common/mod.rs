#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use dmi_forecast::config::CoordinatorSettings;
use dmi_forecast::coordinator::Coordinator;
use dmi_forecast::fetchers::fetcher::{FetchError, FetchErrorKind, Fetcher, RawPayload, Value, STEP_FIELD};
use dmi_forecast::key::DataSourceKey;

pub const COOLDOWN: Duration = Duration::from_secs(10);
pub const INTERVAL: Duration = Duration::from_secs(240 * 60);

pub enum Outcome {
    Ok(RawPayload),
    Fail(FetchErrorKind),
}

/// Fetcher that replays a script of outcomes, then keeps returning empty payloads.
pub struct ScriptedFetcher {
    calls: AtomicUsize,
    delay: Duration,
    script: Mutex<VecDeque<Outcome>>,
}

impl ScriptedFetcher {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Self::with_delay(Duration::ZERO, script)
    }

    pub fn with_delay(delay: Duration, script: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(ScriptedFetcher {
            calls: AtomicUsize::new(0),
            delay,
            script: Mutex::new(script.into_iter().collect()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, key: &DataSourceKey) -> impl Future<Output = Result<RawPayload, FetchError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let delay = self.delay;
        let key = key.clone();
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match next {
                None => Ok(RawPayload::empty()),
                Some(Outcome::Ok(payload)) => Ok(payload),
                Some(Outcome::Fail(FetchErrorKind::Network)) => Err(FetchError::network(&key, "connection refused")),
                Some(Outcome::Fail(FetchErrorKind::Response)) => Err(FetchError::response(&key, 500, "Internal Server Error")),
                Some(Outcome::Fail(FetchErrorKind::Parse)) => Err(FetchError::parse(&key, "expected value at line 1 column 1")),
            }
        }
    }
}

pub fn water_key() -> DataSourceKey {
    DataSourceKey::new("water-level", 56.1159, 12.6026)
}

pub fn wind_key() -> DataSourceKey {
    DataSourceKey::new("wind", 56.1159, 12.6026)
}

pub fn water_payload(level: f64, step: i64) -> RawPayload {
    RawPayload::empty()
        .with_field("sea-mean-deviation", Value::Measurement(level))
        .with_field(STEP_FIELD, Value::Step(step))
}

pub fn settings() -> CoordinatorSettings {
    CoordinatorSettings { interval: INTERVAL, cooldown: COOLDOWN }
}

pub fn coordinator(key: DataSourceKey, fetcher: &Arc<ScriptedFetcher>) -> Coordinator<Arc<ScriptedFetcher>> {
    Coordinator::new(key, fetcher.clone(), settings())
}
