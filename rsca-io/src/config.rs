//! Run configuration
//!
//! A run is described by a TOML file:
//!
//! ```toml
//! [period]
//! start_year = 1751
//! end_year = 2014
//!
//! [paths]
//! ff_csv = "data/ff_emissions.csv"
//! eluc_csv = "data/eluc_emissions.csv"
//! out_dir = "out"
//!
//! [carbon_cycle]
//! ppm_per_GtC = 0.4708
//! C0_ppm = 278.0
//! a = [0.2173, 0.2240, 0.2824, 0.2763]
//! tau = ["inf", 394.4, 36.54, 4.304]
//!
//! [forcing]
//! myhre_k = 5.35
//!
//! [attribution]
//! shock_frac = 0.2
//! ```
//!
//! Every key is required. Relative paths are resolved against the directory
//! holding the configuration file.

use crate::errors::{AdapterError, AdapterResult};
use rsca_core::kernel::irf_terms;
use rsca_core::parameters::{
    AttributionParameters, CarbonCycleParameters, ForcingParameters, ModelParameters,
};
use rsca_core::timeseries::{Year, YearAxis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Inclusive range of years to process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start_year: Year,
    pub end_year: Year,
}

/// Input files and output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paths {
    /// CSV with `year` and `FF_GtC` columns
    pub ff_csv: PathBuf,
    /// CSV with `year` and `ELUC_GtC` columns
    pub eluc_csv: PathBuf,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub period: Period,
    pub paths: Paths,
    pub carbon_cycle: CarbonCycleParameters,
    pub forcing: ForcingParameters,
    pub attribution: AttributionParameters,
}

impl Default for RunConfig {
    fn default() -> Self {
        let parameters = ModelParameters::default();
        Self {
            period: Period {
                start_year: 1751,
                end_year: 2014,
            },
            paths: Paths {
                ff_csv: PathBuf::from("data/ff_emissions.csv"),
                eluc_csv: PathBuf::from("data/eluc_emissions.csv"),
                out_dir: PathBuf::from("out"),
            },
            carbon_cycle: parameters.carbon_cycle,
            forcing: parameters.forcing,
            attribution: parameters.attribution,
        }
    }
}

impl RunConfig {
    /// Parse a configuration, leaving paths untouched
    pub fn from_toml_str(contents: &str) -> AdapterResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read a configuration file, resolving relative paths against its directory
    pub fn from_file(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(AdapterError::io(path))?;
        let mut config = Self::from_toml_str(&contents)?;

        if let Some(base) = path.parent() {
            config.paths.resolve_against(base);
        }
        debug!(
            config = %path.display(),
            paths = ?config.paths,
            "Loaded configuration"
        );

        Ok(config)
    }

    pub fn to_toml_string(&self) -> AdapterResult<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn year_axis(&self) -> AdapterResult<YearAxis> {
        Ok(YearAxis::from_bounds(
            self.period.start_year,
            self.period.end_year,
        )?)
    }

    pub fn model_parameters(&self) -> ModelParameters {
        ModelParameters {
            carbon_cycle: self.carbon_cycle.clone(),
            forcing: self.forcing.clone(),
            attribution: self.attribution.clone(),
        }
    }

    /// Check the period and model parameters without running anything
    pub fn validate(&self) -> AdapterResult<()> {
        self.year_axis()?;
        self.model_parameters().validate()?;
        irf_terms(&self.carbon_cycle.a, &self.carbon_cycle.tau)?;
        Ok(())
    }
}

impl Paths {
    fn resolve_against(&mut self, base: &Path) {
        for path in [&mut self.ff_csv, &mut self.eluc_csv, &mut self.out_dir] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
