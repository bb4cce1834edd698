/// Common fetcher code
pub mod fetcher;

/// Fetcher for the DMI forecast EDR API over reqwest HTTP client
#[cfg(feature = "http")]
pub mod http;
