//! This module provides the main entry point: a configured survey that samples cities,
//! collects their weather, and writes the table and plots.

use crate::dataset::{column_counts, to_dataframe, write_csv, COL_CITY};
use crate::error::SurveyError;
use crate::filtering::{SurveyFrameFilterExt, MAX_HUMIDITY};
use crate::gazetteer::locate_city::{CityLookup, Gazetteer, GazetteerSource};
use crate::plotting::latitude_plots;
use crate::sampler::{CitySampler, DEFAULT_DRAWS};
use crate::types::coordinate::CoordinateRange;
use crate::types::units::Units;
use crate::types::weather::CityWeather;
use crate::utils::{ensure_dir_exists, ensure_parent_exists, get_cache_dir};
use crate::weather_data::client::{OpenWeatherClient, WeatherSource, DEFAULT_TIMEOUT};
use crate::weather_data::collector::WeatherCollector;
use bon::Builder;
use chrono::{Local, NaiveDate};
use log::{info, warn};
use polars::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

/// Smallest working set a survey accepts by default.
pub const DEFAULT_MIN_CITIES: usize = 500;

/// Everything a survey run needs, passed in explicitly.
///
/// # Examples
///
/// ```
/// use weather_survey::{SurveyConfig, Units};
///
/// let config = SurveyConfig::builder()
///     .api_key("my-key".to_string())
///     .units(Units::Imperial)
///     .draws(1500)
///     .build();
///
/// assert_eq!(config.min_cities, 500);
/// assert_eq!(config.output_csv.to_str(), Some("output_data/cities.csv"));
/// ```
#[derive(Debug, Clone, Builder)]
pub struct SurveyConfig {
    /// OpenWeatherMap API key.
    pub api_key: String,
    /// Weather endpoint; the public OpenWeatherMap URL when unset.
    pub base_url: Option<String>,
    #[builder(default)]
    pub units: Units,
    #[builder(default = DEFAULT_TIMEOUT)]
    pub request_timeout: Duration,
    /// Number of random coordinates drawn.
    #[builder(default = DEFAULT_DRAWS)]
    pub draws: usize,
    #[builder(default = CoordinateRange::FULL_LATITUDE)]
    pub lat_range: CoordinateRange,
    #[builder(default = CoordinateRange::FULL_LONGITUDE)]
    pub lng_range: CoordinateRange,
    pub seed: Option<u64>,
    /// Minimum working-set size; smaller samples fail the run.
    #[builder(default = DEFAULT_MIN_CITIES)]
    pub min_cities: usize,
    /// Log a warning instead of failing when the sample is below `min_cities`.
    #[builder(default)]
    pub allow_undersized: bool,
    #[builder(default = PathBuf::from("output_data/cities.csv"))]
    pub output_csv: PathBuf,
    #[builder(default = PathBuf::from("output_data"))]
    pub plot_dir: PathBuf,
    /// Render the four PNG plots.
    #[builder(default = true)]
    pub plots: bool,
    /// Also write an interactive HTML page per plot.
    #[builder(default)]
    pub interactive_plots: bool,
    #[builder(default)]
    pub gazetteer: GazetteerSource,
    /// Gazetteer cache location; the user cache directory when unset.
    pub cache_dir: Option<PathBuf>,
}

/// What a finished survey produced.
#[derive(Debug, Clone)]
pub struct SurveyReport {
    /// Unique sampled cities, in first-seen order.
    pub working_set: Vec<String>,
    pub records: Vec<CityWeather>,
    /// Cities whose humidity exceeded 100% and were left out of the humidity plot.
    pub humidity_outliers: Vec<String>,
    pub csv_path: PathBuf,
    pub plot_paths: Vec<PathBuf>,
}

impl SurveyReport {
    pub fn observed(&self) -> usize {
        self.records.iter().filter(|r| r.is_observed()).count()
    }

    pub fn not_found(&self) -> usize {
        self.records.len() - self.observed()
    }
}

/// A single survey run.
pub struct WeatherSurvey {
    config: SurveyConfig,
}

impl WeatherSurvey {
    pub fn new(config: SurveyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    /// Runs the survey against the configured gazetteer and the OpenWeatherMap API.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::Gazetteer`] if the gazetteer cannot be loaded,
    /// [`SurveyError::EmptyGazetteer`] if it has no cities, and any error of
    /// [`WeatherSurvey::run_with`].
    pub async fn run(&self) -> Result<SurveyReport, SurveyError> {
        let cache_dir = self.gazetteer_cache_dir().await?.unwrap_or_default();
        let gazetteer = Gazetteer::load(&self.config.gazetteer, &cache_dir).await?;
        if gazetteer.is_empty() {
            return Err(SurveyError::EmptyGazetteer);
        }

        let client = OpenWeatherClient::builder()
            .api_key(self.config.api_key.clone())
            .maybe_base_url(self.config.base_url.clone())
            .units(self.config.units)
            .timeout(self.config.request_timeout)
            .build()?;

        self.run_with(&gazetteer, client).await
    }

    /// Runs the survey with the given city lookup and weather source.
    ///
    /// # Errors
    ///
    /// * [`SurveyError::InvalidRange`] for a bad coordinate range.
    /// * [`SurveyError::InsufficientSample`] if fewer than `min_cities` unique
    ///   cities were sampled and `allow_undersized` is off.
    /// * [`SurveyError::WeatherData`] for any transport or decoding failure,
    ///   which aborts the whole collection.
    /// * [`SurveyError::Dataset`] / [`SurveyError::OutputIo`] if the table or
    ///   plots cannot be written, [`SurveyError::Plot`] if a PNG fails to render.
    pub async fn run_with<L, S>(&self, lookup: &L, source: S) -> Result<SurveyReport, SurveyError>
    where
        L: CityLookup,
        S: WeatherSource,
    {
        let config = &self.config;
        let sampler = CitySampler::builder()
            .draws(config.draws)
            .lat_range(config.lat_range)
            .lng_range(config.lng_range)
            .maybe_seed(config.seed)
            .build()?;

        let working_set = sampler.sample_cities(lookup);
        self.check_sample_size(working_set.len())?;

        info!("Beginning data retrieval for {} cities", working_set.len());
        let records = WeatherCollector::new(source).collect(&working_set).await?;

        let table = to_dataframe(&records)?;
        for (column, count) in column_counts(&table) {
            info!("{:>12}: {} values", column, count);
        }

        let humidity_outliers = self.report_humidity_outliers(&table)?;
        let filtered = table
            .clone()
            .lazy()
            .filter_humidity_at_most(MAX_HUMIDITY)
            .collect()?;

        let csv_path = config.output_csv.clone();
        ensure_parent_exists(&csv_path)
            .await
            .map_err(|e| SurveyError::OutputIo(csv_path.clone(), e))?;
        let table = {
            let path = csv_path.clone();
            let mut table = table;
            tokio::task::spawn_blocking(move || write_csv(&mut table, &path).map(|_| table))
                .await??
        };
        info!("Wrote {} rows to {}", table.height(), csv_path.display());

        let plot_paths = if config.plots {
            self.render_plots(&table, &filtered, Local::now().date_naive())
                .await?
        } else {
            Vec::new()
        };

        Ok(SurveyReport {
            working_set,
            records,
            humidity_outliers,
            csv_path,
            plot_paths,
        })
    }

    /// Resolves and creates the gazetteer cache directory; only downloaded
    /// gazetteers are cached, so a file source needs none.
    async fn gazetteer_cache_dir(&self) -> Result<Option<PathBuf>, SurveyError> {
        if matches!(self.config.gazetteer, GazetteerSource::File(_)) {
            return Ok(None);
        }
        let cache_dir = match &self.config.cache_dir {
            Some(dir) => dir.clone(),
            None => get_cache_dir().map_err(SurveyError::CacheDirResolution)?,
        };
        ensure_dir_exists(&cache_dir)
            .await
            .map_err(|e| SurveyError::CacheDirCreation(cache_dir.clone(), e))?;
        Ok(Some(cache_dir))
    }

    fn check_sample_size(&self, found: usize) -> Result<(), SurveyError> {
        let required = self.config.min_cities;
        if found >= required {
            return Ok(());
        }
        if self.config.allow_undersized {
            warn!(
                "Only {} unique cities were sampled (wanted {}), continuing anyway",
                found, required
            );
            Ok(())
        } else {
            Err(SurveyError::InsufficientSample { found, required })
        }
    }

    fn report_humidity_outliers(&self, table: &DataFrame) -> Result<Vec<String>, SurveyError> {
        let outliers = table
            .clone()
            .lazy()
            .humidity_outliers(MAX_HUMIDITY)
            .collect()?;
        let cities: Vec<String> = outliers
            .column(COL_CITY)?
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        if !cities.is_empty() {
            warn!(
                "Humidity above {}% for {}; excluded from the humidity plot",
                MAX_HUMIDITY,
                cities.join(", ")
            );
        }
        Ok(cities)
    }

    #[cfg(feature = "plots")]
    async fn render_plots(
        &self,
        table: &DataFrame,
        filtered: &DataFrame,
        analysis_date: NaiveDate,
    ) -> Result<Vec<PathBuf>, SurveyError> {
        let plot_dir = &self.config.plot_dir;
        ensure_dir_exists(plot_dir)
            .await
            .map_err(|e| SurveyError::OutputIo(plot_dir.clone(), e))?;
        let plots = latitude_plots(self.config.units);
        let mut written = crate::plotting::render_latitude_plots(
            &plots,
            table,
            filtered,
            analysis_date,
            plot_dir,
        )?;
        if self.config.interactive_plots {
            written.extend(crate::plotting::render_interactive_plots(
                &plots,
                table,
                filtered,
                analysis_date,
                plot_dir,
            )?);
        }
        Ok(written)
    }

    #[cfg(not(feature = "plots"))]
    async fn render_plots(
        &self,
        _table: &DataFrame,
        _filtered: &DataFrame,
        _analysis_date: NaiveDate,
    ) -> Result<Vec<PathBuf>, SurveyError> {
        let names: Vec<&str> = latitude_plots(self.config.units)
            .iter()
            .map(|p| p.name)
            .collect();
        warn!(
            "Built without the `plots` feature, skipping {}",
            names.join(", ")
        );
        Ok(Vec::new())
    }
}
