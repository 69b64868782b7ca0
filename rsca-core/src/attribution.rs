//! Source attribution of CO2 forcing
//!
//! Forcing is logarithmic in total concentration, so the contributions of
//! fossil-fuel (FF) and land-use change (ELUC) emissions cannot be separated
//! in closed form. Instead each source is attributed with a marginal shock:
//!
//! 1. Run the carbon cycle and forcing on `FF + ELUC` (the baseline).
//! 2. Run it again with FF reduced by `shock_frac`, holding ELUC fixed.
//! 3. Run it again with ELUC reduced by `shock_frac`, holding FF fixed.
//! 4. Each source's contribution is the baseline forcing minus its own
//!    shocked forcing.
//!
//! The attributed total is the sum of both contributions and does not in
//! general equal the baseline forcing. Shares are normalised by the attributed
//! total, floored at [`EPSILON`] for the early years where forcing is ~0.
//!
//! The three runs are independent. With [`EngineOptions::parallel`] set they are
//! evaluated concurrently, which gives identical results.

use crate::convolution::{concentration_from_parameters, ConvolutionStrategy};
use crate::errors::{RSCAError, RSCAResult};
use crate::forcing::LogarithmicForcing;
use crate::parameters::ModelParameters;
use crate::timeseries::{FloatValue, Year, YearAxis, EPSILON};
use ndarray::{Array1, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Annual emissions from both sources on a shared year axis.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionsInput {
    years: YearAxis,
    fossil: Array1<FloatValue>,
    land_use: Array1<FloatValue>,
}

impl EmissionsInput {
    /// Both series are in GtC/yr and must have one value per year.
    pub fn new(
        years: YearAxis,
        fossil: Array1<FloatValue>,
        land_use: Array1<FloatValue>,
    ) -> RSCAResult<Self> {
        years.check_length("FF emissions", fossil.len())?;
        years.check_length("ELUC emissions", land_use.len())?;
        check_finite("FF emissions", &years, &fossil)?;
        check_finite("ELUC emissions", &years, &land_use)?;
        Ok(Self {
            years,
            fossil,
            land_use,
        })
    }

    pub fn years(&self) -> &YearAxis {
        &self.years
    }

    pub fn fossil(&self) -> &Array1<FloatValue> {
        &self.fossil
    }

    pub fn land_use(&self) -> &Array1<FloatValue> {
        &self.land_use
    }

    pub fn total(&self) -> Array1<FloatValue> {
        &self.fossil + &self.land_use
    }
}

fn check_finite(name: &str, years: &YearAxis, values: &Array1<FloatValue>) -> RSCAResult<()> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(RSCAError::InvalidParameter(format!(
            "{} must be finite, got {} in {}",
            name,
            values[index],
            years.values()[index]
        ))),
        None => Ok(()),
    }
}

/// One of the three carbon-cycle runs needed for the attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Baseline,
    /// FF scaled by `1 - shock_frac`
    FossilShock,
    /// ELUC scaled by `1 - shock_frac`
    LandUseShock,
}

impl Scenario {
    pub fn total_emissions(
        &self,
        inputs: &EmissionsInput,
        shock_frac: FloatValue,
    ) -> Array1<FloatValue> {
        let retained = 1.0 - shock_frac;
        match self {
            Scenario::Baseline => inputs.total(),
            Scenario::FossilShock => inputs.fossil.mapv(|ff| retained * ff) + &inputs.land_use,
            Scenario::LandUseShock => {
                &inputs.fossil + &inputs.land_use.mapv(|eluc| retained * eluc)
            }
        }
    }
}

/// Concentration and forcing for one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRun {
    pub scenario: Scenario,
    /// unit: ppm
    pub concentration: Array1<FloatValue>,
    /// unit: W / m^2
    pub forcing: Array1<FloatValue>,
}

/// Numerical options that never change the meaning of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub strategy: ConvolutionStrategy,
    /// Evaluate the three scenarios concurrently
    pub parallel: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strategy: ConvolutionStrategy::Direct,
            parallel: true,
        }
    }
}

/// Runs the baseline and shocked scenarios and differences them.
#[derive(Debug, Clone)]
pub struct AttributionEngine {
    parameters: ModelParameters,
    options: EngineOptions,
}

impl AttributionEngine {
    /// Create an engine, failing if any parameter is out of range
    pub fn from_parameters(parameters: ModelParameters) -> RSCAResult<Self> {
        parameters.validate()?;
        crate::kernel::irf_terms(&parameters.carbon_cycle.a, &parameters.carbon_cycle.tau)?;
        Ok(Self {
            parameters,
            options: EngineOptions::default(),
        })
    }

    pub fn with_options(self, options: EngineOptions) -> Self {
        Self {
            parameters: self.parameters,
            options,
        }
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.parameters
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Concentration and forcing for a single scenario
    pub fn run_scenario(
        &self,
        inputs: &EmissionsInput,
        scenario: Scenario,
    ) -> RSCAResult<ScenarioRun> {
        let carbon_cycle = &self.parameters.carbon_cycle;
        let emissions =
            scenario.total_emissions(inputs, self.parameters.attribution.shock_frac);

        let concentration = concentration_from_parameters(
            self.options.strategy,
            inputs.years(),
            &emissions,
            carbon_cycle,
        )?;
        let forcing = LogarithmicForcing::from_parameters(
            self.parameters.forcing.clone(),
            carbon_cycle.c0_ppm,
        )
        .series(&concentration);

        debug!(?scenario, "Scenario run complete");

        Ok(ScenarioRun {
            scenario,
            concentration,
            forcing,
        })
    }

    /// Attribute forcing to FF and ELUC emissions.
    pub fn attribute(&self, inputs: &EmissionsInput) -> RSCAResult<AttributionTable> {
        let (baseline, fossil_shock, land_use_shock) = if self.options.parallel {
            let (baseline, (fossil_shock, land_use_shock)) = rayon::join(
                || self.run_scenario(inputs, Scenario::Baseline),
                || {
                    rayon::join(
                        || self.run_scenario(inputs, Scenario::FossilShock),
                        || self.run_scenario(inputs, Scenario::LandUseShock),
                    )
                },
            );
            (baseline?, fossil_shock?, land_use_shock?)
        } else {
            (
                self.run_scenario(inputs, Scenario::Baseline)?,
                self.run_scenario(inputs, Scenario::FossilShock)?,
                self.run_scenario(inputs, Scenario::LandUseShock)?,
            )
        };

        let rf_fossil = &baseline.forcing - &fossil_shock.forcing;
        let rf_land_use = &baseline.forcing - &land_use_shock.forcing;
        let rf_total = &rf_fossil + &rf_land_use;

        let share_fossil = Zip::from(&rf_fossil)
            .and(&rf_total)
            .map_collect(|&part, &total| part / total.max(EPSILON));
        let share_land_use = Zip::from(&rf_land_use)
            .and(&rf_total)
            .map_collect(|&part, &total| part / total.max(EPSILON));

        info!(
            first_year = inputs.years().first(),
            last_year = inputs.years().last(),
            shock_frac = self.parameters.attribution.shock_frac,
            "Attribution complete"
        );

        Ok(AttributionTable {
            years: inputs.years().clone(),
            rf_total,
            rf_fossil,
            rf_land_use,
            share_fossil,
            share_land_use,
            baseline_concentration: baseline.concentration,
            baseline_forcing: baseline.forcing,
        })
    }
}

/// Attribute forcing with the default engine options.
pub fn attribute(
    inputs: &EmissionsInput,
    parameters: &ModelParameters,
) -> RSCAResult<AttributionTable> {
    AttributionEngine::from_parameters(parameters.clone())?.attribute(inputs)
}

/// Row of the absolute contribution table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteContribution {
    pub year: Year,
    #[serde(rename = "RF_total_Wm2")]
    pub rf_total: FloatValue,
    #[serde(rename = "RF_FF_abs_Wm2")]
    pub rf_fossil: FloatValue,
    #[serde(rename = "RF_ELUC_abs_Wm2")]
    pub rf_land_use: FloatValue,
}

/// Row of the relative share table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceShare {
    pub year: Year,
    #[serde(rename = "FF_share")]
    pub fossil: FloatValue,
    #[serde(rename = "ELUC_share")]
    pub land_use: FloatValue,
}

/// Per-year result of an attribution run.
///
/// All forcing values are in W/m^2.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionTable {
    years: YearAxis,
    rf_total: Array1<FloatValue>,
    rf_fossil: Array1<FloatValue>,
    rf_land_use: Array1<FloatValue>,
    share_fossil: Array1<FloatValue>,
    share_land_use: Array1<FloatValue>,
    baseline_concentration: Array1<FloatValue>,
    baseline_forcing: Array1<FloatValue>,
}

impl AttributionTable {
    pub fn years(&self) -> &YearAxis {
        &self.years
    }

    /// Sum of both marginal contributions
    pub fn rf_total(&self) -> &Array1<FloatValue> {
        &self.rf_total
    }

    pub fn rf_fossil(&self) -> &Array1<FloatValue> {
        &self.rf_fossil
    }

    pub fn rf_land_use(&self) -> &Array1<FloatValue> {
        &self.rf_land_use
    }

    pub fn share_fossil(&self) -> &Array1<FloatValue> {
        &self.share_fossil
    }

    pub fn share_land_use(&self) -> &Array1<FloatValue> {
        &self.share_land_use
    }

    /// Concentration (ppm) of the unshocked run
    pub fn baseline_concentration(&self) -> &Array1<FloatValue> {
        &self.baseline_concentration
    }

    /// Forcing of the unshocked run
    pub fn baseline_forcing(&self) -> &Array1<FloatValue> {
        &self.baseline_forcing
    }

    pub fn absolute_rows(&self) -> impl Iterator<Item = AbsoluteContribution> + '_ {
        self.years
            .iter()
            .enumerate()
            .map(|(i, year)| AbsoluteContribution {
                year,
                rf_total: self.rf_total[i],
                rf_fossil: self.rf_fossil[i],
                rf_land_use: self.rf_land_use[i],
            })
    }

    pub fn share_rows(&self) -> impl Iterator<Item = SourceShare> + '_ {
        self.years.iter().enumerate().map(|(i, year)| SourceShare {
            year,
            fossil: self.share_fossil[i],
            land_use: self.share_land_use[i],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RSCAError;
    use crate::parameters::{
        AttributionParameters, CarbonCycleParameters, ForcingParameters, TimeConstant,
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    fn constant_kernel_parameters(shock_frac: FloatValue) -> ModelParameters {
        ModelParameters {
            carbon_cycle: CarbonCycleParameters {
                ppm_per_gtc: 0.5,
                c0_ppm: 280.0,
                a: vec![1.0],
                tau: vec![TimeConstant::Infinite],
            },
            forcing: ForcingParameters { myhre_k: 5.35 },
            attribution: AttributionParameters { shock_frac },
        }
    }

    fn three_years(fossil: Array1<f64>, land_use: Array1<f64>) -> EmissionsInput {
        EmissionsInput::new(YearAxis::from_bounds(1751, 1753).unwrap(), fossil, land_use).unwrap()
    }

    #[test]
    fn shocked_totals() {
        let inputs = three_years(array![2.0, 4.0, 6.0], array![1.0, 1.0, 1.0]);
        assert_eq!(
            Scenario::Baseline.total_emissions(&inputs, 0.5),
            array![3.0, 5.0, 7.0]
        );
        assert_eq!(
            Scenario::FossilShock.total_emissions(&inputs, 0.5),
            array![2.0, 3.0, 4.0]
        );
        assert_eq!(
            Scenario::LandUseShock.total_emissions(&inputs, 0.5),
            array![2.5, 4.5, 6.5]
        );
    }

    #[test]
    fn fossil_only_gets_full_share() {
        let inputs = three_years(array![1.0, 1.0, 1.0], array![0.0, 0.0, 0.0]);
        let table = attribute(&inputs, &constant_kernel_parameters(0.2)).unwrap();

        let concentration = table.baseline_concentration();
        assert_relative_eq!(concentration[0], 280.5);
        assert_relative_eq!(concentration[1], 281.0);
        assert_relative_eq!(concentration[2], 281.5);

        for i in 0..3 {
            assert_eq!(table.rf_land_use()[i], 0.0);
            assert_relative_eq!(table.share_fossil()[i], 1.0);
            assert_eq!(table.share_land_use()[i], 0.0);

            // FF shock keeps 80% of the emissions
            let shocked = 280.0 + 0.5 * 0.8 * (i + 1) as f64;
            let expected = 5.35 * (concentration[i] / 280.0).ln() - 5.35 * (shocked / 280.0).ln();
            assert_relative_eq!(table.rf_fossil()[i], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_emissions_shares_are_floored() {
        let inputs = three_years(array![0.0, 0.0, 0.0], array![0.0, 0.0, 0.0]);
        let table = attribute(&inputs, &constant_kernel_parameters(0.2)).unwrap();
        for i in 0..3 {
            assert_eq!(table.rf_total()[i], 0.0);
            assert_eq!(table.share_fossil()[i], 0.0);
            assert_eq!(table.share_land_use()[i], 0.0);
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let years = YearAxis::from_bounds(1751, 2014).unwrap();
        let n = years.len();
        let inputs = EmissionsInput::new(
            years,
            Array1::linspace(0.02, 9.5, n),
            Array1::linspace(0.8, 1.2, n),
        )
        .unwrap();
        let engine = AttributionEngine::from_parameters(ModelParameters::default()).unwrap();

        let parallel = engine
            .clone()
            .with_options(EngineOptions {
                parallel: true,
                ..Default::default()
            })
            .attribute(&inputs)
            .unwrap();
        let sequential = engine
            .with_options(EngineOptions {
                parallel: false,
                ..Default::default()
            })
            .attribute(&inputs)
            .unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn rows_follow_years() {
        let inputs = three_years(array![1.0, 2.0, 3.0], array![0.5, 0.5, 0.5]);
        let table = attribute(&inputs, &constant_kernel_parameters(0.2)).unwrap();

        let absolute: Vec<_> = table.absolute_rows().collect();
        let shares: Vec<_> = table.share_rows().collect();
        assert_eq!(absolute.len(), 3);
        assert_eq!(shares.len(), 3);
        assert_eq!(absolute[2].year, 1753);
        assert_eq!(shares[0].year, 1751);
        assert_eq!(absolute[1].rf_fossil, table.rf_fossil()[1]);
        assert_eq!(shares[1].land_use, table.share_land_use()[1]);
    }

    #[test]
    fn invalid_parameters_are_rejected_up_front() {
        let mut params = constant_kernel_parameters(0.2);
        params.carbon_cycle.tau = vec![TimeConstant::Finite(0.0)];
        assert!(matches!(
            AttributionEngine::from_parameters(params),
            Err(RSCAError::InvalidParameter(_))
        ));

        assert!(AttributionEngine::from_parameters(constant_kernel_parameters(1.0)).is_err());
    }

    #[test]
    fn emissions_length_checked() {
        let result = EmissionsInput::new(
            YearAxis::from_bounds(1751, 1753).unwrap(),
            array![1.0, 1.0, 1.0],
            array![1.0, 1.0],
        );
        assert!(matches!(result, Err(RSCAError::ShapeMismatch { .. })));
    }

    #[test]
    fn non_finite_emissions_rejected() {
        let years = YearAxis::from_bounds(1751, 1753).unwrap();
        let with_nan = EmissionsInput::new(
            years.clone(),
            array![1.0, FloatValue::NAN, 1.0],
            array![0.0, 0.0, 0.0],
        );
        assert!(matches!(
            with_nan,
            Err(RSCAError::InvalidParameter(ref msg)) if msg.contains("1752")
        ));

        let with_inf = EmissionsInput::new(
            years,
            array![1.0, 1.0, 1.0],
            array![0.0, 0.0, FloatValue::INFINITY],
        );
        assert!(matches!(with_inf, Err(RSCAError::InvalidParameter(_))));
    }

    #[test]
    fn row_headers() {
        let row = AbsoluteContribution {
            year: 1751,
            rf_total: 0.1,
            rf_fossil: 0.05,
            rf_land_use: 0.05,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"RF_total_Wm2\""));
        assert!(json.contains("\"RF_FF_abs_Wm2\""));
        assert!(json.contains("\"RF_ELUC_abs_Wm2\""));

        let share = SourceShare {
            year: 1751,
            fossil: 0.5,
            land_use: 0.5,
        };
        let json = serde_json::to_string(&share).unwrap();
        assert!(json.contains("\"FF_share\""));
        assert!(json.contains("\"ELUC_share\""));
    }
}
