//! CLI entry point for the latitude weather survey.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use weather_survey::{
    CoordinateRange, GazetteerSource, SurveyConfig, Units, WeatherSurvey, DEFAULT_DRAWS,
    DEFAULT_MIN_CITIES, LATITUDE_BOUNDS, LONGITUDE_BOUNDS,
};

#[derive(Parser)]
#[command(
    name = "weather-survey",
    about = "Sample random cities, collect their current weather and plot it against latitude"
)]
struct Cli {
    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    api_key: String,
    /// Unit system requested from the API (metric, imperial or standard)
    #[arg(long, default_value_t = Units::Metric)]
    units: Units,
    /// Number of random coordinates to draw
    #[arg(long, default_value_t = DEFAULT_DRAWS)]
    draws: usize,
    #[arg(long, default_value_t = LATITUDE_BOUNDS.0, allow_hyphen_values = true)]
    lat_min: f64,
    #[arg(long, default_value_t = LATITUDE_BOUNDS.1, allow_hyphen_values = true)]
    lat_max: f64,
    #[arg(long, default_value_t = LONGITUDE_BOUNDS.0, allow_hyphen_values = true)]
    lng_min: f64,
    #[arg(long, default_value_t = LONGITUDE_BOUNDS.1, allow_hyphen_values = true)]
    lng_max: f64,
    /// Seed for a reproducible draw
    #[arg(long)]
    seed: Option<u64>,
    /// Fail when fewer unique cities are sampled
    #[arg(long, default_value_t = DEFAULT_MIN_CITIES)]
    min_cities: usize,
    /// Continue with a warning when the sample is below `--min-cities`
    #[arg(long)]
    allow_undersized: bool,
    /// Local gazetteer CSV (optionally gzipped) instead of the downloaded list
    #[arg(long, conflicts_with = "gazetteer_url")]
    gazetteer_file: Option<PathBuf>,
    /// Gazetteer CSV to download and cache
    #[arg(long)]
    gazetteer_url: Option<String>,
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Override the weather endpoint
    #[arg(long, env = "OPENWEATHER_URL")]
    base_url: Option<String>,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,
    #[arg(long, default_value = "output_data/cities.csv")]
    output_csv: PathBuf,
    #[arg(long, default_value = "output_data")]
    plot_dir: PathBuf,
    /// Skip rendering the latitude plots
    #[arg(long)]
    no_plots: bool,
    /// Also write an interactive HTML page next to each PNG plot
    #[arg(long, conflicts_with = "no_plots")]
    interactive_plots: bool,
}

impl Cli {
    fn into_config(self) -> SurveyConfig {
        let gazetteer = match (self.gazetteer_file, self.gazetteer_url) {
            (Some(path), _) => GazetteerSource::File(path),
            (None, Some(url)) => GazetteerSource::Url(url),
            (None, None) => GazetteerSource::default(),
        };

        SurveyConfig::builder()
            .api_key(self.api_key)
            .maybe_base_url(self.base_url)
            .units(self.units)
            .request_timeout(Duration::from_secs(self.timeout_secs))
            .draws(self.draws)
            .lat_range(CoordinateRange::new(self.lat_min, self.lat_max))
            .lng_range(CoordinateRange::new(self.lng_min, self.lng_max))
            .maybe_seed(self.seed)
            .min_cities(self.min_cities)
            .allow_undersized(self.allow_undersized)
            .output_csv(self.output_csv)
            .plot_dir(self.plot_dir)
            .plots(!self.no_plots)
            .interactive_plots(self.interactive_plots)
            .gazetteer(gazetteer)
            .maybe_cache_dir(self.cache_dir)
            .build()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let survey = WeatherSurvey::new(Cli::parse().into_config());
    match survey.run().await {
        Ok(report) => {
            info!(
                "Survey complete: {} cities, {} observed, {} not found. Table at {}",
                report.working_set.len(),
                report.observed(),
                report.not_found(),
                report.csv_path.display()
            );
            for path in &report.plot_paths {
                info!("Plot: {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let mut message = e.to_string();
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                message.push_str(&format!(": {}", cause));
                source = cause.source();
            }
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut argv = vec!["weather-survey", "--api-key", "k"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(parse(&["--timeout-secs", "0"]).is_err());
        let cli = parse(&["--timeout-secs", "3"]).unwrap();
        assert_eq!(cli.timeout_secs, 3);
    }

    #[test]
    fn test_flags_fill_config() {
        let cli = parse(&[
            "--units",
            "imperial",
            "--lat-min",
            "-60",
            "--lat-max",
            "60",
            "--seed",
            "9",
            "--gazetteer-file",
            "cities.csv",
            "--interactive-plots",
        ])
        .unwrap();
        let config = cli.into_config();
        assert_eq!(config.units, Units::Imperial);
        assert_eq!(config.lat_range, CoordinateRange::new(-60.0, 60.0));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.gazetteer, GazetteerSource::File(PathBuf::from("cities.csv")));
        assert!(config.plots && config.interactive_plots);
    }
}
