use crate::types::weather::{CityWeather, WeatherObservation};
use serde_json::Value;

const CLOUDINESS: &str = "/clouds/all";
const COUNTRY: &str = "/sys/country";
const DATE: &str = "/dt";
const HUMIDITY: &str = "/main/humidity";
const LATITUDE: &str = "/coord/lat";
const MAX_TEMP: &str = "/main/temp_max";
const WIND_SPEED: &str = "/wind/speed";
// The live API sends `lon`; `lng` is accepted too.
const LONGITUDE: [&str; 2] = ["/coord/lon", "/coord/lng"];

/// The nine raw values of a reply, each present as a key.
struct SurveyFields<'a> {
    cloudiness: &'a Value,
    country: &'a Value,
    date: &'a Value,
    humidity: &'a Value,
    lat: &'a Value,
    lng: &'a Value,
    max_temp: &'a Value,
    wind_speed: &'a Value,
}

impl<'a> SurveyFields<'a> {
    /// `None` as soon as any of the keys is missing.
    fn resolve(body: &'a Value) -> Option<Self> {
        Some(Self {
            cloudiness: body.pointer(CLOUDINESS)?,
            country: body.pointer(COUNTRY)?,
            date: body.pointer(DATE)?,
            humidity: body.pointer(HUMIDITY)?,
            lat: body.pointer(LATITUDE)?,
            lng: LONGITUDE.iter().find_map(|path| body.pointer(path))?,
            max_temp: body.pointer(MAX_TEMP)?,
            wind_speed: body.pointer(WIND_SPEED)?,
        })
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extracts the survey fields for `city` from a current-weather JSON body.
///
/// All nine keys are looked up in one pass. If any key is missing (the API's
/// "city not found" reply has none of them) the whole extraction is discarded
/// and [`CityWeather::NotFound`] is returned. Values are taken as found:
/// integers and floats are both accepted, and a `null` value becomes an empty
/// field rather than a missing record.
pub fn extract_city_weather(city: &str, body: &Value) -> CityWeather {
    match SurveyFields::resolve(body) {
        Some(fields) => CityWeather::Observed(WeatherObservation {
            city: city.to_string(),
            cloudiness: as_number(fields.cloudiness),
            country: as_text(fields.country),
            date: as_timestamp(fields.date),
            humidity: as_number(fields.humidity),
            lat: as_number(fields.lat),
            lng: as_number(fields.lng),
            max_temp: as_number(fields.max_temp),
            wind_speed: as_number(fields.wind_speed),
        }),
        None => CityWeather::NotFound {
            city: city.to_string(),
        },
    }
}
