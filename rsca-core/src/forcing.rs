//! CO2 radiative forcing
//!
//! Forcing follows the simplified logarithmic expression of Myhre et al. (1998):
//!
//! $$ RF = k \ln\left(\frac{\max(C, \epsilon)}{C_0}\right) $$
//!
//! The floor $\epsilon$ only matters for non-positive concentrations, which
//! cannot arise from non-negative emissions and a positive $C_0$. When it is hit
//! the value is still returned and a warning is logged. NaN is passed through
//! unchanged rather than floored.

use crate::parameters::ForcingParameters;
use crate::timeseries::{FloatValue, EPSILON};
use ndarray::Array1;
use tracing::warn;

/// Forcing (W/m^2) for a single concentration (ppm)
pub fn calculate_forcing(
    concentration: FloatValue,
    c0_ppm: FloatValue,
    k: FloatValue,
) -> FloatValue {
    // `f64::max` would replace NaN with the floor
    let floored = if concentration.is_nan() {
        concentration
    } else {
        concentration.max(EPSILON)
    };
    k * (floored / c0_ppm).ln()
}

/// Forcing (W/m^2) for every value of a concentration series (ppm)
pub fn co2_forcing(
    concentration: &Array1<FloatValue>,
    c0_ppm: FloatValue,
    k: FloatValue,
) -> Array1<FloatValue> {
    for (index, &value) in concentration.iter().enumerate() {
        if value < EPSILON {
            warn!(
                index,
                concentration = value,
                "Non-positive CO2 concentration floored before taking the logarithm"
            );
        } else if value.is_nan() {
            warn!(index, "CO2 concentration is NaN");
        }
    }

    concentration.mapv(|value| calculate_forcing(value, c0_ppm, k))
}

/// Logarithmic CO2 forcing relative to a fixed pre-industrial concentration
#[derive(Debug, Clone, PartialEq)]
pub struct LogarithmicForcing {
    parameters: ForcingParameters,
    c0_ppm: FloatValue,
}

impl LogarithmicForcing {
    pub fn from_parameters(parameters: ForcingParameters, c0_ppm: FloatValue) -> Self {
        Self { parameters, c0_ppm }
    }

    pub fn calculate(&self, concentration: FloatValue) -> FloatValue {
        calculate_forcing(concentration, self.c0_ppm, self.parameters.myhre_k)
    }

    pub fn series(&self, concentration: &Array1<FloatValue>) -> Array1<FloatValue> {
        co2_forcing(concentration, self.c0_ppm, self.parameters.myhre_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn default_forcing() -> LogarithmicForcing {
        LogarithmicForcing::from_parameters(ForcingParameters::default(), 278.0)
    }

    #[test]
    fn test_forcing_at_preindustrial() {
        let forcing = default_forcing();
        assert_eq!(forcing.calculate(278.0), 0.0);
    }

    #[test]
    fn test_forcing_at_2x_co2() {
        let forcing = default_forcing();
        assert_relative_eq!(forcing.calculate(556.0), 5.35 * 2.0_f64.ln());
    }

    #[test]
    fn test_forcing_is_monotonic() {
        let forcing = default_forcing();
        let concentrations = array![100.0, 278.0, 280.5, 400.0, 1200.0];
        let values = forcing.series(&concentrations);
        for pair in values.as_slice().unwrap().windows(2) {
            assert!(pair[1] > pair[0], "{} should exceed {}", pair[1], pair[0]);
        }
        assert!(values[0] < 0.0);
    }

    #[test]
    fn test_floor_for_non_positive_concentration() {
        let values = co2_forcing(&array![0.0, -10.0], 280.0, 5.35);
        let expected = 5.35 * (EPSILON / 280.0).ln();
        assert_relative_eq!(values[0], expected);
        assert_relative_eq!(values[1], expected);
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_nan_concentration_is_not_floored() {
        let values = co2_forcing(&array![FloatValue::NAN, 281.0], 280.0, 5.35);
        assert!(values[0].is_nan());
        assert_relative_eq!(values[1], 5.35 * (281.0_f64 / 280.0).ln());
        assert!(calculate_forcing(FloatValue::NAN, 278.0, 5.35).is_nan());
    }

    #[test]
    fn test_concrete_values() {
        let values = co2_forcing(&array![280.5, 281.0, 281.5], 280.0, 5.35);
        assert_relative_eq!(values[0], 5.35 * (280.5_f64 / 280.0).ln());
        assert_relative_eq!(values[1], 5.35 * (281.0_f64 / 280.0).ln());
        assert_relative_eq!(values[2], 5.35 * (281.5_f64 / 280.0).ln());
    }
}
