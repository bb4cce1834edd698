use std::fmt::{Display, Formatter};

const MICROS_PER_DEGREE: i64 = 1_000_000;

/// Fixed-precision angle in decimal degrees, stored as whole micro-degrees.
///
/// Two coordinates built from the same decimal input always compare equal, which is what makes
/// [`DataSourceKey`] usable as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate(i64);

impl Coordinate {
    pub fn from_degrees(degrees: f64) -> Self {
        Coordinate((degrees * MICROS_PER_DEGREE as f64).round() as i64)
    }

    pub fn from_micro_degrees(micros: i64) -> Self {
        Coordinate(micros)
    }

    pub fn degrees(&self) -> f64 {
        self.0 as f64 / MICROS_PER_DEGREE as f64
    }

    pub fn micro_degrees(&self) -> i64 {
        self.0
    }
}

impl Display for Coordinate {
    /// Formats without trailing zeros but always with a fraction, e.g. `56.1159` or `-3.0`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / MICROS_PER_DEGREE as u64;
        let frac = abs % MICROS_PER_DEGREE as u64;
        if frac == 0 {
            return write!(f, "{sign}{whole}.0");
        }
        let frac = format!("{frac:06}");
        write!(f, "{sign}{whole}.{}", frac.trim_end_matches('0'))
    }
}

/// Identifies one coordinator: what is fetched and where.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSourceKey {
    source: String,
    latitude: Coordinate,
    longitude: Coordinate,
}

impl DataSourceKey {
    pub fn new(source: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        DataSourceKey {
            source: source.into(),
            latitude: Coordinate::from_degrees(latitude),
            longitude: Coordinate::from_degrees(longitude),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn latitude(&self) -> Coordinate {
        self.latitude
    }

    pub fn longitude(&self) -> Coordinate {
        self.longitude
    }
}

impl Display for DataSourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{},{}", self.source, self.latitude, self.longitude)
    }
}
