//! Geographic coordinate types used when drawing random sample points.

use std::fmt;

/// Valid latitude bounds in decimal degrees.
pub const LATITUDE_BOUNDS: (f64, f64) = (-90.0, 90.0);
/// Valid longitude bounds in decimal degrees.
pub const LONGITUDE_BOUNDS: (f64, f64) = (-180.0, 180.0);

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use weather_survey::LatLon;
///
/// let sydney = LatLon(-33.87, 151.21);
/// assert_eq!(sydney.0, -33.87); // Latitude
/// assert_eq!(sydney.1, 151.21); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn latitude(&self) -> f64 {
        self.0
    }

    pub fn longitude(&self) -> f64 {
        self.1
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.0, self.1)
    }
}

/// Which axis a [`CoordinateRange`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// The inclusive bounds a range on this axis must fall within.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Axis::Latitude => LATITUDE_BOUNDS,
            Axis::Longitude => LONGITUDE_BOUNDS,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => write!(f, "latitude"),
            Axis::Longitude => write!(f, "longitude"),
        }
    }
}

/// A half-open `[low, high)` range random draws are taken from.
///
/// # Examples
///
/// ```
/// use weather_survey::CoordinateRange;
///
/// let everywhere = CoordinateRange::FULL_LATITUDE;
/// assert_eq!(everywhere.low, -90.0);
/// assert!(CoordinateRange::new(10.0, -10.0).is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateRange {
    pub low: f64,
    pub high: f64,
}

impl CoordinateRange {
    pub const FULL_LATITUDE: CoordinateRange = CoordinateRange {
        low: LATITUDE_BOUNDS.0,
        high: LATITUDE_BOUNDS.1,
    };
    pub const FULL_LONGITUDE: CoordinateRange = CoordinateRange {
        low: LONGITUDE_BOUNDS.0,
        high: LONGITUDE_BOUNDS.1,
    };

    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// True when no value can be drawn from the range (including NaN bounds).
    pub fn is_empty(&self) -> bool {
        !(self.low < self.high)
    }

    /// Checks the range is non-empty and lies within the bounds of `axis`.
    pub fn fits(&self, axis: Axis) -> bool {
        let (min, max) = axis.bounds();
        !self.is_empty() && self.low >= min && self.high <= max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value < self.high
    }
}

impl fmt::Display for CoordinateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_ranges_fit_their_axis() {
        assert!(CoordinateRange::FULL_LATITUDE.fits(Axis::Latitude));
        assert!(CoordinateRange::FULL_LONGITUDE.fits(Axis::Longitude));
        // A longitude-sized range does not fit latitude
        assert!(!CoordinateRange::FULL_LONGITUDE.fits(Axis::Latitude));
    }

    #[test]
    fn test_inverted_and_nan_ranges_are_empty() {
        assert!(CoordinateRange::new(5.0, 5.0).is_empty());
        assert!(CoordinateRange::new(5.0, -5.0).is_empty());
        assert!(CoordinateRange::new(f64::NAN, 5.0).is_empty());
        assert!(CoordinateRange::new(-5.0, 5.0).fits(Axis::Latitude));
    }

    #[test]
    fn test_contains_is_half_open() {
        let range = CoordinateRange::new(-10.0, 10.0);
        assert!(range.contains(-10.0));
        assert!(range.contains(9.999));
        assert!(!range.contains(10.0));
    }
}
