//! Year axis shared by every series in a run.

use crate::errors::{RSCAError, RSCAResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

pub type FloatValue = f64;
pub type Year = i32;

/// Floor applied to concentrations before the forcing logarithm and to the
/// attributed total before computing shares.
pub const EPSILON: FloatValue = 1e-12;

/// Ascending sequence of consecutive calendar years.
///
/// The axis can only be constructed when `years[i + 1] == years[i] + 1` holds
/// for every pair of neighbours, so the lag between index `i` and the first year
/// is always `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Year>", into = "Vec<Year>")]
pub struct YearAxis {
    years: Vec<Year>,
}

impl YearAxis {
    pub fn new(years: Vec<Year>) -> RSCAResult<Self> {
        if years.is_empty() {
            return Err(RSCAError::InvalidParameter(
                "year axis must contain at least one year".to_string(),
            ));
        }

        for (i, pair) in years.windows(2).enumerate() {
            if pair[0].checked_add(1) != Some(pair[1]) {
                return Err(RSCAError::InvalidParameter(format!(
                    "year axis must be ascending with a unit step, found {} followed by {} at position {}",
                    pair[0],
                    pair[1],
                    i + 1
                )));
            }
        }

        Ok(Self { years })
    }

    /// Inclusive range of years from `start` to `end`
    pub fn from_bounds(start: Year, end: Year) -> RSCAResult<Self> {
        if end < start {
            return Err(RSCAError::InvalidParameter(format!(
                "end year {} is before start year {}",
                end, start
            )));
        }
        Self::new((start..=end).collect())
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    /// Always false, an axis holds at least one year
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn first(&self) -> Year {
        self.years[0]
    }

    pub fn last(&self) -> Year {
        self.years[self.years.len() - 1]
    }

    pub fn values(&self) -> &[Year] {
        &self.years
    }

    pub fn iter(&self) -> impl Iterator<Item = Year> + '_ {
        self.years.iter().copied()
    }

    /// Years elapsed between the first year and the year at `index`
    pub fn lag(&self, index: usize) -> FloatValue {
        (self.years[index] - self.years[0]) as FloatValue
    }

    /// Lags for every position on the axis
    pub fn lags(&self) -> Array1<FloatValue> {
        Array1::from_iter((0..self.len()).map(|i| self.lag(i)))
    }

    pub fn index_of(&self, year: Year) -> Option<usize> {
        if year < self.first() || year > self.last() {
            return None;
        }
        Some((year - self.first()) as usize)
    }

    /// Check that a series has one value per year
    pub fn check_length(&self, name: &str, length: usize) -> RSCAResult<()> {
        if length != self.len() {
            return Err(RSCAError::ShapeMismatch {
                name: name.to_string(),
                expected: self.len(),
                actual: length,
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<Year>> for YearAxis {
    type Error = RSCAError;

    fn try_from(years: Vec<Year>) -> Result<Self, Self::Error> {
        Self::new(years)
    }
}

impl From<YearAxis> for Vec<Year> {
    fn from(axis: YearAxis) -> Self {
        axis.years
    }
}
