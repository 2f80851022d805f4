//! Unit systems understood by the OpenWeatherMap API.

use std::fmt;
use std::str::FromStr;

/// The `units` query parameter sent with every weather request.
///
/// Determines how temperatures and wind speeds in the response are expressed,
/// and therefore how the plot axes are labelled.
///
/// # Examples
///
/// ```
/// use weather_survey::Units;
///
/// assert_eq!(Units::Metric.to_string(), "metric");
/// assert_eq!("imperial".parse::<Units>(), Ok(Units::Imperial));
/// assert_eq!(Units::Metric.temperature_label(), "°C");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Units {
    /// Celsius and meters per second.
    #[default]
    Metric,
    /// Fahrenheit and miles per hour.
    Imperial,
    /// Kelvin and meters per second.
    Standard,
}

impl Units {
    pub(crate) fn query_value(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub fn temperature_label(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }

    pub fn speed_label(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric | Units::Standard => "m/s",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query_value())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            other => Err(format!(
                "unknown unit system '{}', expected metric, imperial or standard",
                other
            )),
        }
    }
}
