#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! Shared cache for DMI forecast data.
//!
//! A [`Coordinator`](coordinator::Coordinator) owns one cached [`Snapshot`](coordinator::Snapshot)
//! per [`DataSourceKey`](key::DataSourceKey), refreshes it on a fixed interval and coalesces
//! refresh requests coming from any number of [`Sensor`](sensor::Sensor)s, so that one network
//! call serves every consumer. Failed refreshes never evict the last good snapshot.

#[cfg(feature = "tracing")]
macro_rules! log_event {
    ($level:ident, $($arg:tt)+) => { tracing::$level!($($arg)+) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_event {
    ($level:ident, $($arg:tt)+) => {};
}

/// Platform configuration and coordinator settings
pub mod config;
/// Refresh coordinator and cached snapshot types
pub mod coordinator;
/// Fetchers for the coordinator.
/// Public traits are included to allow easy use of custom implementations.
pub mod fetchers;
/// Identity of a coordinator instance
pub mod key;
/// Deduplication of coordinators by key
pub mod registry;
/// Consumers of coordinator data
pub mod sensor;

/// DMI sensor platform wiring
#[cfg(feature = "http")]
pub mod platform;
