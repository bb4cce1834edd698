use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use crate::key::DataSourceKey;

/// Name of the step field every DMI forecast record carries.
pub const STEP_FIELD: &str = "step";

/// Single value of a fetched record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Numeric measurement, e.g. water level in cm
    Measurement(f64),
    /// Integer step index of the forecast
    Step(i64),
}

impl Value {
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Measurement(v) => *v,
            Value::Step(s) => *s as f64,
        }
    }

    pub fn as_step(&self) -> Option<i64> {
        match self {
            Value::Step(s) => Some(*s),
            Value::Measurement(_) => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Measurement(v) => write!(f, "{v}"),
            Value::Step(s) => write!(f, "{s}"),
        }
    }
}

/// Result of successful fetch.
/// # What if the source had nothing for my location?
/// Return [`RawPayload::empty`]. That is a success, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload {
    fields: BTreeMap<String, Value>,
}

impl RawPayload {
    pub fn empty() -> Self {
        RawPayload::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for RawPayload {
    fn from_iter<I: IntoIterator<Item = (N, Value)>>(iter: I) -> Self {
        RawPayload {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Coarse category of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Response,
    Parse,
}

#[derive(Debug, Clone)]
pub enum FetchError {
    /// Connection could not be made or the request timed out
    Network { key: DataSourceKey, cause: String },
    /// Source answered with a non-success status
    Response { key: DataSourceKey, status: u16, cause: String },
    /// Response body could not be understood
    Parse { key: DataSourceKey, cause: String },
}

impl FetchError {
    pub fn network(key: &DataSourceKey, cause: impl Display) -> Self {
        FetchError::Network { key: key.clone(), cause: cause.to_string() }
    }

    pub fn response(key: &DataSourceKey, status: u16, cause: impl Display) -> Self {
        FetchError::Response { key: key.clone(), status, cause: cause.to_string() }
    }

    pub fn parse(key: &DataSourceKey, cause: impl Display) -> Self {
        FetchError::Parse { key: key.clone(), cause: cause.to_string() }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network { .. } => FetchErrorKind::Network,
            FetchError::Response { .. } => FetchErrorKind::Response,
            FetchError::Parse { .. } => FetchErrorKind::Parse,
        }
    }

    pub fn key(&self) -> &DataSourceKey {
        match self {
            FetchError::Network { key, .. } | FetchError::Response { key, .. } | FetchError::Parse { key, .. } => key,
        }
    }

    pub fn cause(&self) -> &str {
        match self {
            FetchError::Network { cause, .. } | FetchError::Response { cause, .. } | FetchError::Parse { cause, .. } => cause,
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network { key, cause } => write!(f, "network error while fetching {key}: {cause}"),
            Self::Response { key, status, cause } => write!(f, "{key} answered with status {status}: {cause}"),
            Self::Parse { key, cause } => write!(f, "failed to parse response for {key}: {cause}"),
        }
    }
}

impl Error for FetchError {}

/// Remote fetcher trait.
/// A fetcher performs one retrieval for the given key and returns [`RawPayload`].
/// It owns no cached state; caching is the coordinator's job.
/// # Errors
/// Implementations must bound their own duration and report every failure as [`FetchError`].
pub trait Fetcher: Send + Sync + 'static {
    /// Try to fetch data
    fn fetch(&self, key: &DataSourceKey) -> impl Future<Output = Result<RawPayload, FetchError>> + Send;
}

impl<F: Fetcher> Fetcher for Arc<F> {
    fn fetch(&self, key: &DataSourceKey) -> impl Future<Output = Result<RawPayload, FetchError>> + Send {
        (**self).fetch(key)
    }
}
