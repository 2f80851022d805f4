//! Latitude scatter plots of the survey table.

use crate::dataset::{COL_CLOUDINESS, COL_HUMIDITY, COL_MAX_TEMP, COL_WIND_SPEED};
use crate::types::units::Units;
use chrono::NaiveDate;

/// Which version of the table a plot is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotData {
    /// Every row of the survey table.
    Full,
    /// Only rows with a plausible humidity.
    HumidityFiltered,
}

/// Description of one latitude-vs-metric scatter plot.
#[derive(Debug, Clone, PartialEq)]
pub struct LatitudePlot {
    /// File stem of the rendered plot.
    pub name: &'static str,
    /// Column plotted on the y axis.
    pub column: &'static str,
    /// Metric name used in the title.
    pub metric: &'static str,
    pub y_label: String,
    /// Explicit y-axis tick positions, if any.
    pub y_ticks: Option<Vec<f64>>,
    pub data: PlotData,
}

impl LatitudePlot {
    /// `City Latitude vs. <metric> (MM/DD/YY)`.
    pub fn title(&self, analysis_date: NaiveDate) -> String {
        format!(
            "City Latitude vs. {} ({})",
            self.metric,
            analysis_date.format("%m/%d/%y")
        )
    }
}

fn ticks(end: i32, step: usize) -> Vec<f64> {
    (0..=end).step_by(step).map(f64::from).collect()
}

/// The four survey plots, labelled for `units`.
pub fn latitude_plots(units: Units) -> Vec<LatitudePlot> {
    vec![
        LatitudePlot {
            name: "latitude_max_temp",
            column: COL_MAX_TEMP,
            metric: "Max Temperature",
            y_label: format!("Max Temperature ({})", units.temperature_label()),
            y_ticks: None,
            data: PlotData::Full,
        },
        LatitudePlot {
            name: "latitude_humidity",
            column: COL_HUMIDITY,
            metric: "Humidity",
            y_label: "Humidity (%)".to_string(),
            y_ticks: Some(ticks(100, 10)),
            data: PlotData::HumidityFiltered,
        },
        LatitudePlot {
            name: "latitude_cloudiness",
            column: COL_CLOUDINESS,
            metric: "Cloudiness",
            y_label: "Cloudiness (%)".to_string(),
            y_ticks: Some(ticks(100, 10)),
            data: PlotData::Full,
        },
        LatitudePlot {
            name: "latitude_wind_speed",
            column: COL_WIND_SPEED,
            metric: "Wind Speed",
            y_label: format!("Wind Speed ({})", units.speed_label()),
            y_ticks: Some(ticks(20, 5)),
            data: PlotData::Full,
        },
    ]
}

#[cfg(feature = "plots")]
pub use render::{render_interactive_plots, render_latitude_plots};

#[cfg(feature = "plots")]
mod render {
    use super::{LatitudePlot, PlotData};
    use crate::dataset::COL_LAT;
    use crate::error::SurveyError;
    use crate::filtering::SurveyFrameFilterExt;
    use crate::types::coordinate::LATITUDE_BOUNDS;
    use chrono::NaiveDate;
    use log::info;
    use plotters::prelude::{
        BitMapBackend, ChartBuilder, Circle, Color, IntoDrawingArea, RGBColor, WHITE,
    };
    use polars::prelude::*;
    use std::path::{Path, PathBuf};

    const PNG_SIZE: (u32, u32) = (960, 640);
    const POINT_COLOR: RGBColor = RGBColor(69, 157, 230);

    /// The rows of the plot's table where both latitude and the metric are set.
    fn plot_frame(
        plot: &LatitudePlot,
        full: &DataFrame,
        humidity_filtered: &DataFrame,
    ) -> PolarsResult<DataFrame> {
        let source = match plot.data {
            PlotData::Full => full,
            PlotData::HumidityFiltered => humidity_filtered,
        };
        source
            .clone()
            .lazy()
            .drop_missing(&[COL_LAT, plot.column])
            .collect()
    }

    fn scatter_points(plot: &LatitudePlot, data: &DataFrame) -> PolarsResult<Vec<(f64, f64)>> {
        let lats = data.column(COL_LAT)?.cast(&DataType::Float64)?;
        let values = data.column(plot.column)?.cast(&DataType::Float64)?;
        Ok(lats
            .f64()?
            .into_iter()
            .zip(values.f64()?)
            .filter_map(|(lat, value)| Some((lat?, value?)))
            .collect())
    }

    /// The y range covers the configured ticks and every point.
    fn y_range(plot: &LatitudePlot, points: &[(f64, f64)]) -> (f64, f64) {
        let (mut low, mut high) = match &plot.y_ticks {
            Some(ticks) => (
                ticks.first().copied().unwrap_or(0.0),
                ticks.last().copied().unwrap_or(1.0),
            ),
            None => (f64::INFINITY, f64::NEG_INFINITY),
        };
        for &(_, y) in points {
            low = low.min(y);
            high = high.max(y);
        }
        if !low.is_finite() || !high.is_finite() {
            return (0.0, 1.0);
        }
        if plot.y_ticks.is_none() || high <= low {
            let pad = ((high - low) * 0.05).max(1.0);
            low -= pad;
            high += pad;
        }
        (low, high)
    }

    fn draw_png(
        plot: &LatitudePlot,
        points: &[(f64, f64)],
        title: &str,
        path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, PNG_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let (y_low, y_high) = y_range(plot, points);

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 24))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(LATITUDE_BOUNDS.0..LATITUDE_BOUNDS.1, y_low..y_high)?;

        let mut mesh = chart.configure_mesh();
        mesh.x_desc("Latitude").y_desc(plot.y_label.as_str());
        if let Some(ticks) = &plot.y_ticks {
            mesh.y_labels(ticks.len());
        }
        mesh.draw()?;

        chart.draw_series(
            points
                .iter()
                .map(|&point| Circle::new(point, 4, POINT_COLOR.mix(0.8).filled())),
        )?;
        root.present()?;
        Ok(())
    }

    /// Renders each plot as `<name>.png` in `plot_dir`, returning the written paths.
    ///
    /// Rows where the latitude or the plotted metric is null are left out.
    pub fn render_latitude_plots(
        plots: &[LatitudePlot],
        full: &DataFrame,
        humidity_filtered: &DataFrame,
        analysis_date: NaiveDate,
        plot_dir: &Path,
    ) -> Result<Vec<PathBuf>, SurveyError> {
        let mut written = Vec::with_capacity(plots.len());
        for plot in plots {
            let data = plot_frame(plot, full, humidity_filtered)?;
            let points = scatter_points(plot, &data)?;

            let path = plot_dir.join(format!("{}.png", plot.name));
            draw_png(plot, &points, &plot.title(analysis_date), &path)
                .map_err(|e| SurveyError::Plot(path.clone(), e.to_string()))?;

            info!("Wrote {} ({} points)", path.display(), points.len());
            written.push(path);
        }
        Ok(written)
    }

    /// Renders each plot as an interactive `<name>.html` page in `plot_dir`.
    pub fn render_interactive_plots(
        plots: &[LatitudePlot],
        full: &DataFrame,
        humidity_filtered: &DataFrame,
        analysis_date: NaiveDate,
        plot_dir: &Path,
    ) -> PolarsResult<Vec<PathBuf>> {
        use plotlars::{Axis, Plot, Rgb, ScatterPlot, Text};

        let mut written = Vec::with_capacity(plots.len());
        for plot in plots {
            let data = plot_frame(plot, full, humidity_filtered)?;

            let mut y_axis = Axis::new().show_grid(true);
            if let Some(ticks) = &plot.y_ticks {
                y_axis = y_axis.tick_values(ticks.clone());
            }

            let path = plot_dir.join(format!("{}.html", plot.name));
            ScatterPlot::builder()
                .data(&data)
                .x(COL_LAT)
                .y(plot.column)
                .size(8)
                .opacity(0.8)
                .color(Rgb(POINT_COLOR.0, POINT_COLOR.1, POINT_COLOR.2))
                .plot_title(Text::from(plot.title(analysis_date).as_str()).size(18))
                .x_title("Latitude")
                .y_title(plot.y_label.as_str())
                .x_axis(&Axis::new().show_grid(true))
                .y_axis(&y_axis)
                .build()
                .write_html(path.to_string_lossy().into_owned());

            info!("Wrote {} ({} points)", path.display(), data.height());
            written.push(path);
        }
        Ok(written)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_plots_in_order() {
        let plots = latitude_plots(Units::Metric);
        let names: Vec<&str> = plots.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "latitude_max_temp",
                "latitude_humidity",
                "latitude_cloudiness",
                "latitude_wind_speed"
            ]
        );
        // Only the humidity plot uses the filtered table
        let filtered: Vec<&str> = plots
            .iter()
            .filter(|p| p.data == PlotData::HumidityFiltered)
            .map(|p| p.column)
            .collect();
        assert_eq!(filtered, vec![COL_HUMIDITY]);
    }

    #[test]
    fn test_title_embeds_analysis_date() {
        let plot = &latitude_plots(Units::Metric)[0];
        let date = NaiveDate::from_ymd_opt(2019, 3, 5).unwrap();
        assert_eq!(
            plot.title(date),
            "City Latitude vs. Max Temperature (03/05/19)"
        );
    }

    #[test]
    fn test_labels_follow_units() {
        let metric = latitude_plots(Units::Metric);
        assert_eq!(metric[0].y_label, "Max Temperature (°C)");
        assert_eq!(metric[3].y_label, "Wind Speed (m/s)");

        let imperial = latitude_plots(Units::Imperial);
        assert_eq!(imperial[0].y_label, "Max Temperature (°F)");
        assert_eq!(imperial[3].y_label, "Wind Speed (mph)");
    }

    #[test]
    fn test_ticks() {
        let plots = latitude_plots(Units::Metric);
        assert_eq!(plots[1].y_ticks.as_ref().unwrap().len(), 11);
        assert_eq!(
            plots[3].y_ticks.clone().unwrap(),
            vec![0.0, 5.0, 10.0, 15.0, 20.0]
        );
        assert!(plots[0].y_ticks.is_none());
    }
}
