//! SVG charts of the attribution tables
//!
//! Charts are drawn with `plotters` on its SVG backend, so no system fonts or
//! image libraries are needed.

use crate::errors::{AdapterError, AdapterResult};
use plotters::prelude::*;
use rsca_core::attribution::{AbsoluteContribution, SourceShare};
use rsca_core::timeseries::{FloatValue, Year};
use std::error::Error;
use std::path::Path;
use tracing::info;

pub const STACKED_FIGURE_FILE: &str = "fig_RF_stacked.svg";
pub const SHARES_FIGURE_FILE: &str = "fig_RF_shares.svg";

const FIGURE_SIZE: (u32, u32) = (1000, 600);
const FOSSIL_COLOUR: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const LAND_USE_COLOUR: RGBColor = RGBColor(0xff, 0x7f, 0x0e);

type DrawResult = Result<(), Box<dyn Error>>;

/// Stacked areas of the FF and ELUC contributions with the attributed total
/// drawn on top.
pub fn plot_stacked_forcing(
    rows: &[AbsoluteContribution],
    path: impl AsRef<Path>,
) -> AdapterResult<()> {
    let path = path.as_ref();
    let years = year_range(rows.iter().map(|row| row.year), path)?;
    draw_stacked(rows, years, path).map_err(|e| plot_error(path, e))?;

    info!(path = %path.display(), "Wrote stacked forcing chart");
    Ok(())
}

/// FF and ELUC shares in percent
pub fn plot_relative_shares(rows: &[SourceShare], path: impl AsRef<Path>) -> AdapterResult<()> {
    let path = path.as_ref();
    let years = year_range(rows.iter().map(|row| row.year), path)?;
    draw_shares(rows, years, path).map_err(|e| plot_error(path, e))?;

    info!(path = %path.display(), "Wrote share chart");
    Ok(())
}

fn plot_error(path: &Path, error: Box<dyn Error>) -> AdapterError {
    AdapterError::Plot {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

fn year_range(
    mut years: impl Iterator<Item = Year>,
    path: &Path,
) -> AdapterResult<(Year, Year)> {
    let first = years.next().ok_or_else(|| AdapterError::Plot {
        path: path.to_path_buf(),
        message: "no rows to plot".to_string(),
    })?;
    let last = years.last().unwrap_or(first);
    if last > first {
        return Ok((first, last));
    }
    // A single year still needs a non-empty axis
    match first.checked_add(1) {
        Some(next) => Ok((first, next)),
        None => Ok((first - 1, first)),
    }
}

fn draw_stacked(
    rows: &[AbsoluteContribution],
    (first, last): (Year, Year),
    path: &Path,
) -> DrawResult {
    let values = rows
        .iter()
        .flat_map(|row| [row.rf_total, row.rf_fossil, row.rf_fossil + row.rf_land_use]);
    let (low, high) = value_range(values);

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("CO2 radiative forcing by source", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(first..last, low..high)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("RF (W m-2)")
        .draw()?;

    chart
        .draw_series(AreaSeries::new(
            rows.iter().map(|row| (row.year, row.rf_fossil + row.rf_land_use)),
            0.0,
            LAND_USE_COLOUR.mix(0.6),
        ))?
        .label("ELUC")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], LAND_USE_COLOUR.filled()));

    chart
        .draw_series(AreaSeries::new(
            rows.iter().map(|row| (row.year, row.rf_fossil)),
            0.0,
            FOSSIL_COLOUR.mix(0.6),
        ))?
        .label("FF")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], FOSSIL_COLOUR.filled()));

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|row| (row.year, row.rf_total)),
            BLACK.stroke_width(2),
        ))?
        .label("Total (attributed)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_shares(rows: &[SourceShare], (first, last): (Year, Year), path: &Path) -> DrawResult {
    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Relative contribution to CO2 forcing", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(first..last, 0.0..100.0)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Share (%)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|row| (row.year, 100.0 * row.fossil)),
            FOSSIL_COLOUR.stroke_width(2),
        ))?
        .label("FF")
        .legend(|(x, y)| {
            PathElement::new(vec![(x, y), (x + 15, y)], FOSSIL_COLOUR.stroke_width(2))
        });

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|row| (row.year, 100.0 * row.land_use)),
            LAND_USE_COLOUR.stroke_width(2),
        ))?
        .label("ELUC")
        .legend(|(x, y)| {
            PathElement::new(vec![(x, y), (x + 15, y)], LAND_USE_COLOUR.stroke_width(2))
        });

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Axis bounds that always include zero, with some headroom
fn value_range(values: impl Iterator<Item = FloatValue>) -> (FloatValue, FloatValue) {
    let (low, high) = values
        .filter(|value| value.is_finite())
        .fold((0.0, 0.0), |(low, high): (FloatValue, FloatValue), value| {
            (low.min(value), high.max(value))
        });
    if high - low <= 0.0 {
        (0.0, 1.0)
    } else {
        let pad = 0.05 * (high - low);
        (if low < 0.0 { low - pad } else { 0.0 }, high + pad)
    }
}
