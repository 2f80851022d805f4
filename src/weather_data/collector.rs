use crate::types::weather::CityWeather;
use crate::weather_data::client::WeatherSource;
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::extractor::extract_city_weather;
use log::info;

/// Looks up the current weather for each city of a working set, one request at a time.
pub struct WeatherCollector<S> {
    source: S,
}

impl<S: WeatherSource> WeatherCollector<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns exactly one record for `city`.
    ///
    /// # Errors
    ///
    /// Transport and JSON decoding failures are returned as [`WeatherDataError`];
    /// a reply missing any required key is not an error but a
    /// [`CityWeather::NotFound`] record.
    pub async fn check_weather(&self, city: &str) -> Result<CityWeather, WeatherDataError> {
        let body = self.source.current_weather(city).await?;
        Ok(extract_city_weather(city, &body))
    }

    /// Collects one record per city, in working-set order.
    ///
    /// Requests are issued strictly one after another. The first fatal error
    /// aborts the run; records gathered so far are discarded with it.
    pub async fn collect(&self, cities: &[String]) -> Result<Vec<CityWeather>, WeatherDataError> {
        let total = cities.len();
        let mut records = Vec::with_capacity(total);

        for (index, city) in cities.iter().enumerate() {
            let record = self.check_weather(city).await?;
            match &record {
                CityWeather::Observed(_) => {
                    info!("Processing record {} of {} | {}", index + 1, total, city)
                }
                CityWeather::NotFound { .. } => info!("{} not found...skipping...", city),
            }
            records.push(record);
        }

        let observed = records.iter().filter(|r| r.is_observed()).count();
        info!(
            "Data retrieval complete: {} observed, {} not found",
            observed,
            total - observed
        );
        Ok(records)
    }
}
