//! Defines the gazetteer city record and the implementations needed to index it
//! with the `rstar` crate.

use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// A single named place in the gazetteer.
///
/// Rows come from a `Country,City,Latitude,Longitude` CSV, the same layout the
/// citipy world cities list uses (lowercase names, ISO country codes).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GazetteerCity {
    /// Two-letter country code, as listed in the gazetteer (e.g., "au").
    pub country: String,
    /// The city name used as the working-set identifier (e.g., "sydney").
    pub city: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl GazetteerCity {
    pub fn new(country: &str, city: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            country: country.to_string(),
            city: city.to_string(),
            latitude,
            longitude,
        }
    }
}

/// The result of a nearest-city lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestCity {
    pub city: GazetteerCity,
    /// Great-circle distance between the query point and the city centroid.
    pub distance_km: f64,
}

impl RTreeObject for GazetteerCity {
    type Envelope = AABB<[f64; 2]>;

    /// A city is a point, so its envelope is the degenerate box at `[lat, lon]`.
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.latitude, self.longitude])
    }
}

impl PointDistance for GazetteerCity {
    /// Squared planar distance on `[lat, lon]`.
    ///
    /// Treats degrees as Cartesian coordinates, which is what a k-d tree over the
    /// raw gazetteer columns does too; nearest-city resolution should match it.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.latitude - point[0];
        let dy = self.longitude - point[1];
        dx * dx + dy * dy
    }
}
