//! Dependence of the attributed shares on the shock size.
//!
//! The marginal-shock attribution is a heuristic, so the shares move with
//! `shock_frac`. This module reruns the attribution over a set of shock sizes
//! and reports how far the fossil share drifts from the configured run. It only
//! measures the dependence; the attribution itself is unchanged.

use crate::attribution::{AttributionEngine, AttributionTable, EmissionsInput};
use crate::errors::RSCAResult;
use crate::timeseries::{FloatValue, EPSILON};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Summary of one attribution run with an alternative shock size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShockSensitivity {
    pub shock_frac: FloatValue,
    /// FF share in the last year of the run
    pub final_share_fossil: FloatValue,
    /// ELUC share in the last year of the run
    pub final_share_land_use: FloatValue,
    /// Largest absolute difference in FF share from the reference run, over
    /// the years where both attributed totals exceed the floor
    pub max_share_deviation: FloatValue,
}

/// Rerun `engine` with each shock fraction in `shock_fracs`.
///
/// The engine's own shock fraction is the reference. Results keep the order
/// of `shock_fracs`.
pub fn shock_sensitivity(
    engine: &AttributionEngine,
    inputs: &EmissionsInput,
    shock_fracs: &[FloatValue],
) -> RSCAResult<Vec<ShockSensitivity>> {
    let reference = engine.attribute(inputs)?;

    shock_fracs
        .par_iter()
        .map(|&shock_frac| {
            let mut parameters = engine.parameters().clone();
            parameters.attribution.shock_frac = shock_frac;
            let table = AttributionEngine::from_parameters(parameters)?
                .with_options(engine.options())
                .attribute(inputs)?;
            Ok(summarise(shock_frac, &reference, &table))
        })
        .collect()
}

fn summarise(
    shock_frac: FloatValue,
    reference: &AttributionTable,
    table: &AttributionTable,
) -> ShockSensitivity {
    let last = table.years().len() - 1;

    let max_share_deviation = reference
        .share_fossil()
        .iter()
        .zip(table.share_fossil().iter())
        .zip(reference.rf_total().iter().zip(table.rf_total().iter()))
        .filter(|(_, (&reference_total, &total))| reference_total > EPSILON && total > EPSILON)
        .map(|((&reference_share, &share), _)| (share - reference_share).abs())
        .fold(0.0, FloatValue::max);

    ShockSensitivity {
        shock_frac,
        final_share_fossil: table.share_fossil()[last],
        final_share_land_use: table.share_land_use()[last],
        max_share_deviation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ModelParameters;
    use crate::timeseries::YearAxis;
    use ndarray::Array1;

    fn inputs() -> EmissionsInput {
        let years = YearAxis::from_bounds(1751, 2014).unwrap();
        let n = years.len();
        EmissionsInput::new(
            years,
            Array1::linspace(0.02, 9.5, n),
            Array1::linspace(0.8, 1.2, n),
        )
        .unwrap()
    }

    #[test]
    fn reference_shock_has_no_deviation() {
        let engine = AttributionEngine::from_parameters(ModelParameters::default()).unwrap();
        let report = shock_sensitivity(&engine, &inputs(), &[0.2]).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].max_share_deviation, 0.0);
        assert!((report[0].final_share_fossil + report[0].final_share_land_use - 1.0).abs() < 1e-9);
    }

    #[test]
    fn order_is_preserved_and_deviation_is_small() {
        let engine = AttributionEngine::from_parameters(ModelParameters::default()).unwrap();
        let shocks = [0.5, 0.05, 0.1];
        let report = shock_sensitivity(&engine, &inputs(), &shocks).unwrap();

        let returned: Vec<_> = report.iter().map(|r| r.shock_frac).collect();
        assert_eq!(returned, shocks.to_vec());
        for entry in &report {
            assert!(entry.max_share_deviation.is_finite());
            // Forcing is close to linear over the historical period
            assert!(
                entry.max_share_deviation < 0.05,
                "shock {} deviates by {}",
                entry.shock_frac,
                entry.max_share_deviation
            );
        }
    }

    #[test]
    fn invalid_shock_is_an_error() {
        let engine = AttributionEngine::from_parameters(ModelParameters::default()).unwrap();
        assert!(shock_sensitivity(&engine, &inputs(), &[0.2, 1.5]).is_err());
    }
}
