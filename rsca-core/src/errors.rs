use thiserror::Error;

/// Error type for invalid operations.
///
/// Non-positive concentrations ahead of the forcing logarithm are not reported here.
/// They are floored at [`crate::timeseries::EPSILON`] and logged instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RSCAError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Shape mismatch for {name}: expected {expected} values to match the year axis, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Convenience type for `Result<T, RSCAError>`.
pub type RSCAResult<T> = Result<T, RSCAError>;
