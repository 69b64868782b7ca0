//! Model parameters
//!
//! Parameter structures for the carbon cycle, forcing and attribution steps.
//! Field names follow the keys used in run configuration files, so the
//! structs can be deserialised directly from the matching configuration tables.
//!
//! None of the structs use `#[serde(default)]`. A configuration file that omits
//! a model parameter is rejected instead of silently falling back to the
//! defaults below.

use crate::errors::{RSCAError, RSCAResult};
use crate::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversion factor from atmospheric carbon mass to CO2 concentration.
/// 1 ppm atmospheric CO2 ≈ 2.124 GtC
pub const PPM_PER_GTC: FloatValue = 1.0 / 2.124;

/// E-folding time of one impulse-response term.
///
/// In configuration files a time constant is either a number of years or one
/// of the markers `"inf"`, `"infinite"` or `"infinity"` (case-insensitive) for
/// the term that never decays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeConstant", into = "RawTimeConstant")]
pub enum TimeConstant {
    /// Decaying term with the given time constant (yr)
    Finite(FloatValue),
    /// Constant term
    Infinite,
}

impl TimeConstant {
    pub fn is_infinite(&self) -> bool {
        matches!(self, TimeConstant::Infinite)
    }
}

impl From<FloatValue> for TimeConstant {
    fn from(value: FloatValue) -> Self {
        if value == FloatValue::INFINITY {
            TimeConstant::Infinite
        } else {
            TimeConstant::Finite(value)
        }
    }
}

impl fmt::Display for TimeConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeConstant::Finite(tau) => write!(f, "{} yr", tau),
            TimeConstant::Infinite => write!(f, "inf"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawTimeConstant {
    Number(FloatValue),
    Text(String),
}

impl TryFrom<RawTimeConstant> for TimeConstant {
    type Error = String;

    fn try_from(raw: RawTimeConstant) -> Result<Self, Self::Error> {
        match raw {
            RawTimeConstant::Number(value)
                if value.is_nan() || value == FloatValue::NEG_INFINITY =>
            {
                Err(format!("time constant must be a number of years, got {}", value))
            }
            RawTimeConstant::Number(value) => Ok(TimeConstant::from(value)),
            RawTimeConstant::Text(text) => match text.trim().to_lowercase().as_str() {
                "inf" | "infinite" | "infinity" => Ok(TimeConstant::Infinite),
                other => Err(format!(
                    "unrecognised time constant \"{}\", expected a number or \"inf\"",
                    other
                )),
            },
        }
    }
}

impl From<TimeConstant> for RawTimeConstant {
    fn from(value: TimeConstant) -> Self {
        match value {
            TimeConstant::Finite(tau) => RawTimeConstant::Number(tau),
            TimeConstant::Infinite => RawTimeConstant::Text("inf".to_string()),
        }
    }
}

/// Parameters for the impulse-response carbon cycle.
///
/// Atmospheric excess concentration is the convolution of emissions with
///
/// $$ g(t) = \sum_i a_i e^{-t/\tau_i} $$
///
/// where a term with $\tau_i = \infty$ contributes the constant $a_i$.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonCycleParameters {
    /// Conversion from emitted carbon to atmospheric concentration.
    /// unit: ppm / GtC
    /// default: 1 / 2.124
    #[serde(rename = "ppm_per_GtC")]
    pub ppm_per_gtc: FloatValue,

    /// Pre-industrial atmospheric CO2 concentration.
    /// unit: ppm
    /// default: 278.0
    #[serde(rename = "C0_ppm")]
    pub c0_ppm: FloatValue,

    /// Weights of the impulse-response terms (dimensionless).
    pub a: Vec<FloatValue>,

    /// Time constants of the impulse-response terms, paired with `a`.
    pub tau: Vec<TimeConstant>,
}

impl Default for CarbonCycleParameters {
    /// Bern carbon cycle fit from Joos et al. (2013)
    fn default() -> Self {
        Self {
            ppm_per_gtc: PPM_PER_GTC,
            c0_ppm: 278.0,
            a: vec![0.2173, 0.2240, 0.2824, 0.2763],
            tau: vec![
                TimeConstant::Infinite,
                TimeConstant::Finite(394.4),
                TimeConstant::Finite(36.54),
                TimeConstant::Finite(4.304),
            ],
        }
    }
}

impl CarbonCycleParameters {
    /// Check the scalar parameters.
    ///
    /// The impulse-response terms are checked when the kernel is built.
    pub fn validate(&self) -> RSCAResult<()> {
        if !self.ppm_per_gtc.is_finite() {
            return Err(RSCAError::InvalidParameter(format!(
                "ppm_per_GtC must be finite, got {}",
                self.ppm_per_gtc
            )));
        }
        if !(self.c0_ppm.is_finite() && self.c0_ppm > 0.0) {
            return Err(RSCAError::InvalidParameter(format!(
                "C0_ppm must be positive and finite, got {}",
                self.c0_ppm
            )));
        }
        Ok(())
    }
}

/// Parameters for the logarithmic CO2 forcing relation.
///
/// $$ RF = k \ln\left(\frac{C}{C_0}\right) $$
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcingParameters {
    /// Scaling coefficient from Myhre et al. (1998).
    /// unit: W / m^2
    /// default: 5.35
    pub myhre_k: FloatValue,
}

impl Default for ForcingParameters {
    fn default() -> Self {
        Self { myhre_k: 5.35 }
    }
}

impl ForcingParameters {
    pub fn validate(&self) -> RSCAResult<()> {
        if !self.myhre_k.is_finite() {
            return Err(RSCAError::InvalidParameter(format!(
                "myhre_k must be finite, got {}",
                self.myhre_k
            )));
        }
        Ok(())
    }
}

/// Parameters for the marginal-shock attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionParameters {
    /// Fraction removed from one source in each counterfactual run.
    /// Must lie strictly between 0 and 1.
    /// default: 0.2
    pub shock_frac: FloatValue,
}

impl Default for AttributionParameters {
    fn default() -> Self {
        Self { shock_frac: 0.2 }
    }
}

impl AttributionParameters {
    pub fn validate(&self) -> RSCAResult<()> {
        if !(self.shock_frac > 0.0 && self.shock_frac < 1.0) {
            return Err(RSCAError::InvalidParameter(format!(
                "shock_frac must lie strictly between 0 and 1, got {}",
                self.shock_frac
            )));
        }
        Ok(())
    }
}

/// Everything needed to turn emissions into attributed forcing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub carbon_cycle: CarbonCycleParameters,
    pub forcing: ForcingParameters,
    pub attribution: AttributionParameters,
}

impl ModelParameters {
    pub fn validate(&self) -> RSCAResult<()> {
        self.carbon_cycle.validate()?;
        self.forcing.validate()?;
        self.attribution.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = ModelParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.carbon_cycle.a.len(), params.carbon_cycle.tau.len());
        assert!((params.carbon_cycle.c0_ppm - 278.0).abs() < 1e-10);
        assert!((params.forcing.myhre_k - 5.35).abs() < 1e-10);

        // Bern weights sum to one so a pulse is fully airborne at lag 0
        let total: FloatValue = params.carbon_cycle.a.iter().sum();
        assert!((total - 1.0).abs() < 1e-10, "weights sum to {}", total);
    }

    #[test]
    fn test_time_constant_markers() {
        #[derive(Deserialize)]
        struct Wrapper {
            tau: Vec<TimeConstant>,
        }

        let parsed: Wrapper =
            toml::from_str(r#"tau = ["inf", 394.4, "Infinite", 4, " infinity "]"#).unwrap();
        assert_eq!(
            parsed.tau,
            vec![
                TimeConstant::Infinite,
                TimeConstant::Finite(394.4),
                TimeConstant::Infinite,
                TimeConstant::Finite(4.0),
                TimeConstant::Infinite,
            ]
        );
    }

    #[test]
    fn test_time_constant_rejects_unknown_marker() {
        let result = serde_json::from_str::<TimeConstant>(r#""forever""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_time_constant_float_infinity() {
        assert_eq!(
            TimeConstant::from(FloatValue::INFINITY),
            TimeConstant::Infinite
        );
        assert_eq!(TimeConstant::from(10.0), TimeConstant::Finite(10.0));
    }

    #[test]
    fn test_shock_frac_bounds() {
        for shock_frac in [0.0, 1.0, -0.1, 1.5, FloatValue::NAN] {
            let params = AttributionParameters { shock_frac };
            assert!(
                params.validate().is_err(),
                "shock_frac {} should be rejected",
                shock_frac
            );
        }
        assert!(AttributionParameters { shock_frac: 0.5 }.validate().is_ok());
    }

    #[test]
    fn test_non_positive_c0_rejected() {
        let params = CarbonCycleParameters {
            c0_ppm: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(RSCAError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_serialization() {
        let params = ModelParameters::default();
        let json = serde_json::to_string(&params).expect("Serialization failed");
        assert!(json.contains("\"ppm_per_GtC\""));
        assert!(json.contains("\"inf\""));

        let parsed: ModelParameters = serde_json::from_str(&json).expect("Deserialization failed");
        assert_eq!(params, parsed);
    }

    #[test]
    fn test_missing_key_rejected() {
        let result = toml::from_str::<CarbonCycleParameters>(
            r#"
            ppm_per_GtC = 0.47
            a = [1.0]
            tau = ["inf"]
            "#,
        );
        assert!(result.is_err(), "C0_ppm is required");
    }
}
