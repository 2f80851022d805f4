mod dataset;
mod error;
mod filtering;
mod gazetteer;
mod plotting;
mod sampler;
mod survey;
mod types;
mod utils;
mod weather_data;

pub use error::SurveyError;
pub use survey::*;

pub use sampler::{unique_cities, CitySampler, DEFAULT_DRAWS};

pub use gazetteer::error::GazetteerError;
pub use gazetteer::locate_city::{
    CityLookup, Gazetteer, GazetteerSource, DEFAULT_GAZETTEER_URL, GAZETTEER_COLUMNS,
};

pub use types::city::{GazetteerCity, NearestCity};
pub use types::coordinate::{Axis, CoordinateRange, LatLon, LATITUDE_BOUNDS, LONGITUDE_BOUNDS};
pub use types::units::Units;
pub use types::weather::{CityWeather, WeatherObservation};

pub use weather_data::client::{
    OpenWeatherClient, WeatherSource, DEFAULT_TIMEOUT, DEFAULT_WEATHER_URL,
};
pub use weather_data::collector::WeatherCollector;
pub use weather_data::error::WeatherDataError;
pub use weather_data::extractor::extract_city_weather;

pub use dataset::*;
pub use filtering::{SurveyFrameFilterExt, MAX_HUMIDITY};
pub use plotting::*;
