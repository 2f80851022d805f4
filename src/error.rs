use crate::gazetteer::error::GazetteerError;
use crate::types::coordinate::{Axis, CoordinateRange};
use crate::weather_data::error::WeatherDataError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurveyError {
    #[error(transparent)]
    WeatherData(#[from] WeatherDataError),

    #[error(transparent)]
    Gazetteer(#[from] GazetteerError),

    #[error("Invalid {axis} range {range}")]
    InvalidRange { axis: Axis, range: CoordinateRange },

    #[error("Gazetteer contains no cities")]
    EmptyGazetteer,

    #[error("Only {found} unique cities were sampled, at least {required} are required")]
    InsufficientSample { found: usize, required: usize },

    #[error("Failed processing survey table: {0}")]
    Dataset(#[from] PolarsError),

    #[error("Failed to write '{0}'")]
    OutputIo(PathBuf, #[source] std::io::Error),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error("Failed to render plot '{0}': {1}")]
    Plot(PathBuf, String),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
