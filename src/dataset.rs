//! Tabular form of the survey: building the Polars frame, CSV export and import.

use crate::types::weather::CityWeather;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

pub const COL_CITY: &str = "City";
pub const COL_CLOUDINESS: &str = "Cloudiness";
pub const COL_COUNTRY: &str = "Country";
pub const COL_DATE: &str = "Date"; // Unix seconds
pub const COL_HUMIDITY: &str = "Humidity";
pub const COL_LAT: &str = "Lat";
pub const COL_LNG: &str = "Lng";
pub const COL_MAX_TEMP: &str = "Max Temp";
pub const COL_WIND_SPEED: &str = "Wind Speed";

/// Column order of the survey table and its CSV file.
pub const SURVEY_COLUMNS: [&str; 9] = [
    COL_CITY,
    COL_CLOUDINESS,
    COL_COUNTRY,
    COL_DATE,
    COL_HUMIDITY,
    COL_LAT,
    COL_LNG,
    COL_MAX_TEMP,
    COL_WIND_SPEED,
];

/// The fixed schema of the survey table.
///
/// `Date` is an integer column so it is written without decimals. The other
/// measurements are floats, whatever numeric form the API used.
pub fn survey_schema() -> Schema {
    let mut schema = Schema::with_capacity(SURVEY_COLUMNS.len());
    schema.with_column(COL_CITY.into(), DataType::String);
    schema.with_column(COL_CLOUDINESS.into(), DataType::Float64);
    schema.with_column(COL_COUNTRY.into(), DataType::String);
    schema.with_column(COL_DATE.into(), DataType::Int64);
    schema.with_column(COL_HUMIDITY.into(), DataType::Float64);
    schema.with_column(COL_LAT.into(), DataType::Float64);
    schema.with_column(COL_LNG.into(), DataType::Float64);
    schema.with_column(COL_MAX_TEMP.into(), DataType::Float64);
    schema.with_column(COL_WIND_SPEED.into(), DataType::Float64);
    schema
}

/// Builds the survey table, one row per record.
///
/// [`CityWeather::NotFound`] rows keep the city and are null everywhere else.
pub fn to_dataframe(records: &[CityWeather]) -> PolarsResult<DataFrame> {
    let observations: Vec<_> = records.iter().map(|r| r.observation()).collect();

    let cities: Vec<&str> = records.iter().map(|r| r.city()).collect();
    let cloudiness: Vec<Option<f64>> = observations
        .iter()
        .map(|o| o.and_then(|o| o.cloudiness))
        .collect();
    let countries: Vec<Option<&str>> = observations
        .iter()
        .map(|o| o.and_then(|o| o.country.as_deref()))
        .collect();
    let dates: Vec<Option<i64>> = observations.iter().map(|o| o.and_then(|o| o.date)).collect();
    let humidity: Vec<Option<f64>> = observations
        .iter()
        .map(|o| o.and_then(|o| o.humidity))
        .collect();
    let lats: Vec<Option<f64>> = observations.iter().map(|o| o.and_then(|o| o.lat)).collect();
    let lngs: Vec<Option<f64>> = observations.iter().map(|o| o.and_then(|o| o.lng)).collect();
    let max_temps: Vec<Option<f64>> = observations
        .iter()
        .map(|o| o.and_then(|o| o.max_temp))
        .collect();
    let wind_speeds: Vec<Option<f64>> = observations
        .iter()
        .map(|o| o.and_then(|o| o.wind_speed))
        .collect();

    DataFrame::new(vec![
        Column::new(COL_CITY.into(), cities),
        Column::new(COL_CLOUDINESS.into(), cloudiness),
        Column::new(COL_COUNTRY.into(), countries),
        Column::new(COL_DATE.into(), dates),
        Column::new(COL_HUMIDITY.into(), humidity),
        Column::new(COL_LAT.into(), lats),
        Column::new(COL_LNG.into(), lngs),
        Column::new(COL_MAX_TEMP.into(), max_temps),
        Column::new(COL_WIND_SPEED.into(), wind_speeds),
    ])
}

/// Writes the table as CSV with a header row and no index column.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> PolarsResult<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)
}

/// Reads a survey CSV back with the fixed survey schema.
pub fn read_csv(path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_schema(Some(Arc::new(survey_schema())))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

/// Non-null values per column, in column order.
pub fn column_counts(df: &DataFrame) -> Vec<(String, usize)> {
    df.get_columns()
        .iter()
        .map(|c| (c.name().to_string(), c.len() - c.null_count()))
        .collect()
}
