//! The per-city weather record produced by the collector.

use serde::{Deserialize, Serialize};

/// A current-weather observation for one city.
///
/// Every key was present in the API response; extraction is all-or-nothing on
/// key existence. A value is `None` only when the API sent a key with a
/// `null` (or non-scalar) value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// The working-set city name the request was made for.
    pub city: String,
    /// Cloud cover in percent (`clouds.all`).
    pub cloudiness: Option<f64>,
    /// Country code reported by the API (`sys.country`).
    pub country: Option<String>,
    /// Observation time as a unix timestamp in seconds (`dt`).
    pub date: Option<i64>,
    /// Relative humidity in percent (`main.humidity`).
    pub humidity: Option<f64>,
    /// Latitude of the matched city (`coord.lat`).
    pub lat: Option<f64>,
    /// Longitude of the matched city (`coord.lon`).
    pub lng: Option<f64>,
    /// Maximum temperature in the configured units (`main.temp_max`).
    pub max_temp: Option<f64>,
    /// Wind speed in the configured units (`wind.speed`).
    pub wind_speed: Option<f64>,
}

/// The outcome of looking up one city.
///
/// `NotFound` is the sentinel record: the API answered, but the payload was
/// missing one of the required keys (typically a "city not found" reply).
/// In the survey table it becomes a row with only the city populated.
#[derive(Debug, Clone, PartialEq)]
pub enum CityWeather {
    Observed(WeatherObservation),
    NotFound { city: String },
}

impl CityWeather {
    pub fn city(&self) -> &str {
        match self {
            CityWeather::Observed(observation) => &observation.city,
            CityWeather::NotFound { city } => city,
        }
    }

    pub fn observation(&self) -> Option<&WeatherObservation> {
        match self {
            CityWeather::Observed(observation) => Some(observation),
            CityWeather::NotFound { .. } => None,
        }
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, CityWeather::Observed(_))
    }
}
