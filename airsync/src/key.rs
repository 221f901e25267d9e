//! Cache keys.
//!
//! A key identifies "which record" inside one entity table. Distinct keys are
//! fully independent caches.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use thiserror::Error;

/// Scale used to round coordinates (0.01° ≈ 1.1 km at the equator).
const COORD_SCALE: f64 = 100.0;

/// Bounds tolerance for proximity comparisons, in hundredths of a degree.
const PROXIMITY_EPSILON: f64 = 1e-9;

/// Requirements for a type used as a cache key.
pub trait FetchKey: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Returns true if a record stored under `other` may answer a proximity
    /// read for this key.
    ///
    /// Keys without a notion of distance only match themselves.
    fn is_within(&self, other: &Self, _tolerance_deg: f64) -> bool {
        self == other
    }
}

/// Errors constructing or parsing a key.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum KeyError {
    #[error("invalid latitude: {0} (expected -90..=90)")]
    InvalidLatitude(f64),

    #[error("invalid longitude: {0} (expected -180..=180)")]
    InvalidLongitude(f64),

    #[error("location name cannot be empty")]
    EmptyLocation,

    #[error("cannot parse key '{0}'")]
    Unparseable(String),
}

/// A geographic key rounded to 0.01°.
///
/// Coordinates are stored as integer hundredths of a degree so that equality
/// and hashing are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoKey {
    lat_centi: i32,
    lon_centi: i32,
}

impl GeoKey {
    /// Create a key from decimal degrees.
    ///
    /// # Errors
    ///
    /// Returns an error if either coordinate is out of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, KeyError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(KeyError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(KeyError::InvalidLongitude(longitude));
        }

        Ok(Self {
            lat_centi: (latitude * COORD_SCALE).round() as i32,
            lon_centi: (longitude * COORD_SCALE).round() as i32,
        })
    }

    /// Rounded latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.lat_centi as f64 / COORD_SCALE
    }

    /// Rounded longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.lon_centi as f64 / COORD_SCALE
    }

    /// Returns true if `other` lies inside a ±`tolerance_deg` bounding box around this key.
    pub fn is_near(&self, other: &GeoKey, tolerance_deg: f64) -> bool {
        let tolerance = tolerance_deg * COORD_SCALE + PROXIMITY_EPSILON;
        ((self.lat_centi - other.lat_centi) as f64).abs() <= tolerance
            && ((self.lon_centi - other.lon_centi) as f64).abs() <= tolerance
    }
}

impl FetchKey for GeoKey {
    fn is_within(&self, other: &Self, tolerance_deg: f64) -> bool {
        self.is_near(other, tolerance_deg)
    }
}

impl fmt::Display for GeoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2},{:.2}", self.latitude(), self.longitude())
    }
}

impl FromStr for GeoKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| KeyError::Unparseable(s.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| KeyError::Unparseable(s.to_string()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| KeyError::Unparseable(s.to_string()))?;
        Self::new(lat, lon)
    }
}

/// A key naming a location (city, station, resource id).
///
/// Names are trimmed and lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey(String);

impl LocationKey {
    /// Create a key from a location name.
    pub fn new(name: &str) -> Result<Self, KeyError> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(KeyError::EmptyLocation);
        }
        Ok(Self(normalized))
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FetchKey for LocationKey {}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocationKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
