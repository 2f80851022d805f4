//! Draws random coordinates and reduces them to the working set of unique city names.

use crate::error::SurveyError;
use crate::gazetteer::locate_city::CityLookup;
use crate::types::coordinate::{Axis, CoordinateRange, LatLon};
use bon::bon;
use log::{debug, info};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Number of coordinate draws when none is configured.
pub const DEFAULT_DRAWS: usize = 2000;

/// Generates the working set of cities for a survey.
///
/// Latitudes and longitudes are drawn independently and uniformly from their
/// ranges, paired positionally, and each pair is resolved to its nearest city.
/// Cities are kept in first-seen order, each name once.
///
/// The number of unique cities depends on gazetteer density; it is always at
/// most the number of draws and may be well below it.
///
/// # Examples
///
/// ```
/// use weather_survey::{CitySampler, Gazetteer, GazetteerCity};
///
/// let gazetteer = Gazetteer::from_cities(vec![
///     GazetteerCity::new("au", "sydney", -33.87, 151.21),
///     GazetteerCity::new("gb", "london", 51.51, -0.09),
/// ]);
///
/// let sampler = CitySampler::builder()
///     .draws(50)
///     .seed(7)
///     .build()
///     .unwrap();
///
/// let cities = sampler.sample_cities(&gazetteer);
/// assert!(cities.len() <= 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CitySampler {
    draws: usize,
    lat_range: CoordinateRange,
    lng_range: CoordinateRange,
    seed: Option<u64>,
}

#[bon]
impl CitySampler {
    /// Creates a sampler.
    ///
    /// # Arguments
    ///
    /// * `.draws(usize)`: Optional. Number of random coordinates to draw. Defaults to `2000`.
    /// * `.lat_range(CoordinateRange)`: Optional. Defaults to `[-90, 90)`.
    /// * `.lng_range(CoordinateRange)`: Optional. Defaults to `[-180, 180)`.
    /// * `.seed(u64)`: Optional. Makes the draw reproducible; otherwise the thread RNG is used.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::InvalidRange`] if a range is empty or leaves its axis bounds.
    #[builder]
    pub fn new(
        draws: Option<usize>,
        lat_range: Option<CoordinateRange>,
        lng_range: Option<CoordinateRange>,
        seed: Option<u64>,
    ) -> Result<Self, SurveyError> {
        let lat_range = lat_range.unwrap_or(CoordinateRange::FULL_LATITUDE);
        let lng_range = lng_range.unwrap_or(CoordinateRange::FULL_LONGITUDE);

        for (axis, range) in [(Axis::Latitude, lat_range), (Axis::Longitude, lng_range)] {
            if !range.fits(axis) {
                return Err(SurveyError::InvalidRange { axis, range });
            }
        }

        Ok(Self {
            draws: draws.unwrap_or(DEFAULT_DRAWS),
            lat_range,
            lng_range,
            seed,
        })
    }

    pub fn draws(&self) -> usize {
        self.draws
    }

    /// Draws the configured number of coordinates with the sampler's own RNG.
    pub fn draw(&self) -> Vec<LatLon> {
        match self.seed {
            Some(seed) => self.draw_with(&mut StdRng::seed_from_u64(seed)),
            None => self.draw_with(&mut rand::thread_rng()),
        }
    }

    /// Draws all latitudes, then all longitudes, and pairs them by position.
    pub fn draw_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<LatLon> {
        let lat_dist = Uniform::new(self.lat_range.low, self.lat_range.high);
        let lng_dist = Uniform::new(self.lng_range.low, self.lng_range.high);

        let lats: Vec<f64> = (0..self.draws).map(|_| lat_dist.sample(rng)).collect();
        let lngs: Vec<f64> = (0..self.draws).map(|_| lng_dist.sample(rng)).collect();

        lats.into_iter()
            .zip(lngs)
            .map(|(lat, lng)| LatLon(lat, lng))
            .collect()
    }

    /// Draws coordinates and resolves them to the working set.
    pub fn sample_cities(&self, lookup: &impl CityLookup) -> Vec<String> {
        let coordinates = self.draw();
        let cities = unique_cities(lookup, &coordinates);
        info!(
            "Sampled {} unique cities from {} random coordinates",
            cities.len(),
            coordinates.len()
        );
        cities
    }
}

/// Resolves each coordinate to its nearest city, keeping the first occurrence of each name.
///
/// Coordinates the lookup cannot resolve are skipped.
pub fn unique_cities(lookup: &impl CityLookup, coordinates: &[LatLon]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut cities = Vec::new();

    for &location in coordinates {
        let Some(nearest) = lookup.nearest_city(location) else {
            debug!("No city resolved for {}", location);
            continue;
        };
        if seen.insert(nearest.city.city.clone()) {
            cities.push(nearest.city.city);
        }
    }
    cities
}
