//! Emissions loading
//!
//! Each source (FF and ELUC) comes from its own CSV file with a `year` column
//! and a value column in GtC/yr. The values are joined onto the requested year
//! axis and cleaned:
//!
//! 1. rows with a missing or non-numeric year or value are dropped
//! 2. gaps between known years are linearly interpolated
//! 3. years after the last known value repeat that value
//! 4. years before the first known value are set to zero
//! 5. negative values are clipped to zero
//!
//! When a file does not exist a deterministic synthetic series is used in its
//! place so a run can still be demonstrated end to end.

use crate::errors::{AdapterError, AdapterResult};
use ndarray::{s, Array1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rsca_core::attribution::EmissionsInput;
use rsca_core::timeseries::{FloatValue, Year, YearAxis};
use std::path::Path;
use tracing::{debug, info, warn};

pub const YEAR_COLUMN: &str = "year";
pub const FOSSIL_COLUMN: &str = "FF_GtC";
pub const LAND_USE_COLUMN: &str = "ELUC_GtC";

/// Straight line between two values with seeded Gaussian noise, clipped at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSeries {
    /// Value in the first year (GtC/yr)
    pub start: FloatValue,
    /// Value in the last year (GtC/yr)
    pub end: FloatValue,
    /// Standard deviation of the noise (GtC/yr)
    pub noise: FloatValue,
    pub seed: u64,
}

/// Used when the FF file is missing
pub const FOSSIL_FALLBACK: SyntheticSeries = SyntheticSeries {
    start: 0.02,
    end: 9.5,
    noise: 0.1,
    seed: 1,
};

/// Used when the ELUC file is missing
pub const LAND_USE_FALLBACK: SyntheticSeries = SyntheticSeries {
    start: 0.8,
    end: 1.2,
    noise: 0.05,
    seed: 2,
};

impl SyntheticSeries {
    pub fn generate(&self, years: &YearAxis) -> AdapterResult<Array1<FloatValue>> {
        let noise = Normal::new(0.0, self.noise)
            .map_err(|e| AdapterError::Synthetic(format!("noise {}: {}", self.noise, e)))?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let trend = Array1::linspace(self.start, self.end, years.len());
        Ok(trend.mapv(|value| (value + noise.sample(&mut rng)).max(0.0)))
    }
}

/// `(year, value)` pairs from one source file, in file order
pub fn read_source_csv(
    path: impl AsRef<Path>,
    column: &str,
) -> AdapterResult<Vec<(Year, FloatValue)>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(AdapterError::csv(path))?;

    let headers = reader.headers().map_err(AdapterError::csv(path))?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| AdapterError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let year_index = find(YEAR_COLUMN)?;
    let value_index = find(column)?;

    let mut records = Vec::new();
    let mut dropped = 0;
    for record in reader.records() {
        let record = record.map_err(AdapterError::csv(path))?;
        let year = record.get(year_index).and_then(parse_year);
        let value = record
            .get(value_index)
            .and_then(|field| field.parse::<FloatValue>().ok())
            .filter(|value| value.is_finite());

        match (year, value) {
            (Some(year), Some(value)) => records.push((year, value)),
            _ => dropped += 1,
        }
    }

    debug!(
        path = %path.display(),
        column,
        rows = records.len(),
        dropped,
        "Read emissions source"
    );

    Ok(records)
}

/// Years may be written as integers or as whole floats such as `1751.0`
fn parse_year(field: &str) -> Option<Year> {
    if let Ok(year) = field.parse::<Year>() {
        return Some(year);
    }
    let value = field.parse::<f64>().ok()?;
    if value.fract() == 0.0 && value >= Year::MIN as f64 && value <= Year::MAX as f64 {
        Some(value as Year)
    } else {
        None
    }
}

/// Left-join records onto the year axis, then fill the gaps.
///
/// Records outside the axis are ignored. When a year appears more than once
/// the first value wins.
pub fn align_to_axis(years: &YearAxis, records: &[(Year, FloatValue)]) -> Array1<FloatValue> {
    let mut joined: Vec<Option<FloatValue>> = vec![None; years.len()];

    for &(year, value) in records {
        if let Some(index) = years.index_of(year) {
            if joined[index].is_some() {
                warn!(year, "Duplicate year in emissions source, keeping the first value");
                continue;
            }
            joined[index] = Some(value);
        }
    }

    fill_gaps(&joined)
}

/// Fill missing values and clip negatives to zero.
pub fn fill_gaps(values: &[Option<FloatValue>]) -> Array1<FloatValue> {
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, value)| value.map(|_| i))
        .collect();

    let mut filled = Array1::<FloatValue>::zeros(values.len());
    let (first, last) = match (known.first(), known.last()) {
        (Some(&first), Some(&last)) => (first, last),
        // Nothing known: all zeros
        _ => return filled,
    };

    for pair in known.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        let (v_left, v_right) = (value_at(values, left), value_at(values, right));
        let span = (right - left) as FloatValue;
        for i in left..right {
            let weight = (i - left) as FloatValue / span;
            filled[i] = v_left + (v_right - v_left) * weight;
        }
    }

    // Years before `first` stay at zero
    debug_assert!(first <= last);
    let last_value = value_at(values, last);
    filled.slice_mut(s![last..]).fill(last_value);

    filled.mapv_inplace(|value| value.max(0.0));
    filled
}

fn value_at(values: &[Option<FloatValue>], index: usize) -> FloatValue {
    values[index].unwrap_or(0.0)
}

/// Load one source, falling back to `fallback` when the file does not exist
pub fn load_source(
    path: impl AsRef<Path>,
    column: &str,
    years: &YearAxis,
    fallback: &SyntheticSeries,
) -> AdapterResult<Array1<FloatValue>> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(
            path = %path.display(),
            column,
            "Emissions file not found, using synthetic series"
        );
        return fallback.generate(years);
    }

    let records = read_source_csv(path, column)?;
    Ok(align_to_axis(years, &records))
}

/// Load FF and ELUC emissions for every year on the axis
pub fn load_emissions(
    ff_csv: impl AsRef<Path>,
    eluc_csv: impl AsRef<Path>,
    years: &YearAxis,
) -> AdapterResult<EmissionsInput> {
    let fossil = load_source(ff_csv, FOSSIL_COLUMN, years, &FOSSIL_FALLBACK)?;
    let land_use = load_source(eluc_csv, LAND_USE_COLUMN, years, &LAND_USE_FALLBACK)?;

    info!(
        first_year = years.first(),
        last_year = years.last(),
        total_fossil = fossil.sum(),
        total_land_use = land_use.sum(),
        "Loaded emissions (GtC)"
    );

    Ok(EmissionsInput::new(years.clone(), fossil, land_use)?)
}
