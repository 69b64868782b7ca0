//! Emissions to concentration
//!
//! Atmospheric CO2 concentration is the pre-industrial baseline plus the causal
//! convolution of annual emissions with the impulse response kernel:
//!
//! $$ C_t = C_0 + \alpha \sum_{k=0}^{t} E_k \, g_{t-k} $$
//!
//! where $\alpha$ converts GtC to ppm. Each past emission contributes according
//! to how long ago it was emitted, never according to its calendar year.
//!
//! Two strategies evaluate the same sum:
//!
//! - [`ConvolutionStrategy::Direct`] scans every earlier year for each output
//!   year, O(T²).
//! - [`ConvolutionStrategy::Recursive`] keeps one decaying reservoir per
//!   impulse-response term, `s_t = s_{t-1} e^{-1/\tau} + a E_t`, which is O(T)
//!   and agrees with the direct sum to floating-point tolerance.

use crate::errors::RSCAResult;
use crate::kernel::{irf_terms, kernel_from_terms, IrfTerm};
use crate::parameters::{CarbonCycleParameters, TimeConstant};
use crate::timeseries::{FloatValue, YearAxis};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the convolution sum is evaluated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvolutionStrategy {
    #[default]
    Direct,
    Recursive,
}

/// Convert an emissions series (GtC/yr) into CO2 concentration (ppm).
pub fn emissions_to_concentration(
    years: &YearAxis,
    emissions: &Array1<FloatValue>,
    ppm_per_gtc: FloatValue,
    c0_ppm: FloatValue,
    a: &[FloatValue],
    tau: &[TimeConstant],
) -> RSCAResult<Array1<FloatValue>> {
    emissions_to_concentration_with(
        ConvolutionStrategy::default(),
        years,
        emissions,
        ppm_per_gtc,
        c0_ppm,
        a,
        tau,
    )
}

/// [`emissions_to_concentration`] with an explicit evaluation strategy.
pub fn emissions_to_concentration_with(
    strategy: ConvolutionStrategy,
    years: &YearAxis,
    emissions: &Array1<FloatValue>,
    ppm_per_gtc: FloatValue,
    c0_ppm: FloatValue,
    a: &[FloatValue],
    tau: &[TimeConstant],
) -> RSCAResult<Array1<FloatValue>> {
    years.check_length("emissions", emissions.len())?;
    let terms = irf_terms(a, tau)?;

    debug!(
        n_years = years.len(),
        n_terms = terms.len(),
        ?strategy,
        "Convolving emissions with impulse response"
    );

    let excess = match strategy {
        ConvolutionStrategy::Direct => {
            convolve_direct(emissions.view(), kernel_from_terms(years, &terms).view())
        }
        ConvolutionStrategy::Recursive => convolve_recursive(emissions.view(), &terms),
    };

    Ok(excess.mapv(|value| c0_ppm + value * ppm_per_gtc))
}

/// Same as [`emissions_to_concentration_with`] with the parameters taken from
/// a [`CarbonCycleParameters`].
pub fn concentration_from_parameters(
    strategy: ConvolutionStrategy,
    years: &YearAxis,
    emissions: &Array1<FloatValue>,
    parameters: &CarbonCycleParameters,
) -> RSCAResult<Array1<FloatValue>> {
    emissions_to_concentration_with(
        strategy,
        years,
        emissions,
        parameters.ppm_per_gtc,
        parameters.c0_ppm,
        &parameters.a,
        &parameters.tau,
    )
}

/// Airborne carbon per year (GtC) as the direct causal sum
fn convolve_direct(
    emissions: ArrayView1<FloatValue>,
    kernel: ArrayView1<FloatValue>,
) -> Array1<FloatValue> {
    let n = emissions.len();
    let mut excess = Array1::<FloatValue>::zeros(n);

    for t in 0..n {
        // lag j pairs the emission from t - j years ago with g[j]
        excess[t] = (0..=t)
            .map(|j| emissions[t - j] * kernel[j])
            .sum::<FloatValue>();
    }

    excess
}

/// Airborne carbon per year (GtC) from one running reservoir per term
fn convolve_recursive(emissions: ArrayView1<FloatValue>, terms: &[IrfTerm]) -> Array1<FloatValue> {
    let retention: Vec<FloatValue> = terms.iter().map(|term| term.annual_retention()).collect();
    let mut reservoirs = vec![0.0; terms.len()];
    let mut excess = Array1::<FloatValue>::zeros(emissions.len());

    for (t, &emission) in emissions.iter().enumerate() {
        for ((reservoir, term), decay) in reservoirs.iter_mut().zip(terms).zip(&retention) {
            *reservoir = *reservoir * decay + term.weight * emission;
        }
        excess[t] = reservoirs.iter().sum::<FloatValue>();
    }

    excess
}
