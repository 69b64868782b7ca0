//! Impulse response kernel
//!
//! Discrete-time response of atmospheric CO2 to a unit emission pulse, sampled
//! once per year of lag:
//!
//! $$ g(t) = \sum_i a_i e^{-t/\tau_i} $$
//!
//! A term with an infinite time constant contributes $a_i$ at every lag.

use crate::errors::{RSCAError, RSCAResult};
use crate::parameters::TimeConstant;
use crate::timeseries::{FloatValue, YearAxis};
use ndarray::Array1;

/// One validated exponential term of the impulse response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrfTerm {
    pub weight: FloatValue,
    pub time_constant: TimeConstant,
}

impl IrfTerm {
    /// Contribution of this term `lag` years after the pulse
    pub fn response(&self, lag: FloatValue) -> FloatValue {
        match self.time_constant {
            TimeConstant::Finite(tau) => self.weight * (-lag / tau).exp(),
            TimeConstant::Infinite => self.weight,
        }
    }

    /// Fraction of this term's reservoir remaining after one year
    pub fn annual_retention(&self) -> FloatValue {
        match self.time_constant {
            TimeConstant::Finite(tau) => (-1.0 / tau).exp(),
            TimeConstant::Infinite => 1.0,
        }
    }
}

/// Pair up weights and time constants, rejecting malformed terms.
pub fn irf_terms(a: &[FloatValue], tau: &[TimeConstant]) -> RSCAResult<Vec<IrfTerm>> {
    if a.len() != tau.len() {
        return Err(RSCAError::InvalidParameter(format!(
            "IRF weights and time constants must have the same length, got {} weights and {} time constants",
            a.len(),
            tau.len()
        )));
    }

    a.iter()
        .zip(tau.iter())
        .enumerate()
        .map(|(i, (&weight, &time_constant))| {
            if !weight.is_finite() {
                return Err(RSCAError::InvalidParameter(format!(
                    "IRF weight {} must be finite, got {}",
                    i, weight
                )));
            }
            if let TimeConstant::Finite(value) = time_constant {
                if !(value.is_finite() && value > 0.0) {
                    return Err(RSCAError::InvalidParameter(format!(
                        "IRF time constant {} must be positive, got {}",
                        i, value
                    )));
                }
            }
            Ok(IrfTerm {
                weight,
                time_constant,
            })
        })
        .collect()
}

/// Build the kernel `g[0..T-1]` for every lag covered by `years`.
pub fn build_kernel(
    years: &YearAxis,
    a: &[FloatValue],
    tau: &[TimeConstant],
) -> RSCAResult<Array1<FloatValue>> {
    let terms = irf_terms(a, tau)?;
    Ok(kernel_from_terms(years, &terms))
}

pub(crate) fn kernel_from_terms(years: &YearAxis, terms: &[IrfTerm]) -> Array1<FloatValue> {
    years
        .lags()
        .mapv(|lag| terms.iter().map(|term| term.response(lag)).sum::<FloatValue>())
}
