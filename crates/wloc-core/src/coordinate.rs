//! Fixed-point coordinate conversion.
//!
//! Positioning messages carry degrees multiplied by 10^8 as signed integers.

use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;

/// Scale between degrees and the wire representation.
pub const COORDINATE_SCALE: f64 = 1e8;

/// Converts degrees to the fixed-point wire value, truncating toward zero.
///
/// # Examples
///
/// ```
/// use wloc_core::coordinate::to_fixed_point;
///
/// assert_eq!(to_fixed_point(1.5), 150_000_000);
/// assert_eq!(to_fixed_point(-3.25), -325_000_000);
/// ```
pub fn to_fixed_point(degrees: f64) -> i64 {
    (degrees * COORDINATE_SCALE) as i64
}

/// Converts a fixed-point wire value back to degrees.
pub fn to_degrees(fixed: i64) -> f64 {
    fixed as f64 / COORDINATE_SCALE
}

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates", into = "RawCoordinates")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Creates coordinates, rejecting values outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Latitude as a fixed-point wire value.
    pub fn latitude_fixed(&self) -> i64 {
        to_fixed_point(self.latitude)
    }

    /// Longitude as a fixed-point wire value.
    pub fn longitude_fixed(&self) -> i64 {
        to_fixed_point(self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

#[derive(Serialize, Deserialize)]
struct RawCoordinates {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl From<Coordinates> for RawCoordinates {
    fn from(c: Coordinates) -> Self {
        Self {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_truncates_toward_zero() {
        assert_eq!(to_fixed_point(0.000_000_019), 1);
        assert_eq!(to_fixed_point(-0.000_000_019), -1);
    }

    #[test]
    fn fixed_point_known_values() {
        assert_eq!(to_fixed_point(0.0), 0);
        assert_eq!(to_fixed_point(90.0), 9_000_000_000);
        assert_eq!(to_fixed_point(-180.0), -18_000_000_000);
    }

    #[test]
    fn round_trip_within_tolerance() {
        for degrees in [
            51.510_420,
            -3.218_306,
            0.0,
            89.999_999,
            -179.123_456_78,
            12.345_678_9,
        ] {
            let back = to_degrees(to_fixed_point(degrees));
            // Truncation loses at most one fixed-point unit, plus float noise.
            assert!(
                (back - degrees).abs() <= 1e-8 + 1e-12,
                "{degrees} came back as {back}"
            );
        }
    }

    #[test]
    fn degrees_from_fixed_point() {
        assert_eq!(to_degrees(150_000_000), 1.5);
        assert_eq!(to_degrees(-325_000_000), -3.25);
    }

    #[test]
    fn coordinates_accept_bounds() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn coordinates_reject_out_of_range() {
        assert_eq!(
            Coordinates::new(90.5, 0.0),
            Err(CoordinateError::Latitude(90.5))
        );
        assert_eq!(
            Coordinates::new(0.0, -181.0),
            Err(CoordinateError::Longitude(-181.0))
        );
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn coordinates_fixed_accessors() {
        let c = Coordinates::new(51.510_420, -3.218_306).unwrap();
        assert_eq!(c.latitude_fixed(), to_fixed_point(51.510_420));
        assert_eq!(c.longitude_fixed(), to_fixed_point(-3.218_306));
    }

    #[test]
    fn coordinates_display() {
        let c = Coordinates::new(51.51042, -3.218306).unwrap();
        assert_eq!(c.to_string(), "51.510420, -3.218306");
    }
}
