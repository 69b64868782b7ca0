//! End-to-end runs: configuration in, tables and charts out.

use rsca_core::attribution::{
    AbsoluteContribution, AttributionEngine, AttributionTable, EmissionsInput, EngineOptions,
    SourceShare,
};
use rsca_core::sensitivity::{shock_sensitivity, ShockSensitivity};
use rsca_core::timeseries::{FloatValue, Year};
use rsca_io::config::RunConfig;
use rsca_io::emissions::load_emissions;
use rsca_io::output::{
    read_absolute_table, read_share_table, write_attribution_tables, OutputPaths,
};
use rsca_io::plot::{
    plot_relative_shares, plot_stacked_forcing, SHARES_FIGURE_FILE, STACKED_FIGURE_FILE,
};
use rsca_io::AdapterResult;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Locations of the written charts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FigurePaths {
    pub stacked: PathBuf,
    pub shares: PathBuf,
}

/// What a completed run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub first_year: Year,
    pub last_year: Year,
    /// Attributed forcing in the last year (W/m^2)
    pub final_rf_total: FloatValue,
    pub final_share_fossil: FloatValue,
    pub final_share_land_use: FloatValue,
    pub tables: OutputPaths,
    pub figures: Option<FigurePaths>,
}

/// Load the emissions named by `config` onto its year axis
pub fn load_inputs(config: &RunConfig) -> AdapterResult<EmissionsInput> {
    config.validate()?;
    let years = config.year_axis()?;
    load_emissions(&config.paths.ff_csv, &config.paths.eluc_csv, &years)
}

/// Attribute forcing for `config` without writing anything
pub fn compute(config: &RunConfig, options: EngineOptions) -> AdapterResult<AttributionTable> {
    let inputs = load_inputs(config)?;
    debug!(?options, years = inputs.years().len(), "Starting attribution");
    let engine =
        AttributionEngine::from_parameters(config.model_parameters())?.with_options(options);
    Ok(engine.attribute(&inputs)?)
}

/// Run the attribution and write the tables, and optionally the charts, to
/// the configured output directory.
///
/// Nothing is written unless the attribution succeeds.
pub fn execute_run(
    config: &RunConfig,
    options: EngineOptions,
    plot: bool,
) -> AdapterResult<RunSummary> {
    let table = compute(config, options)?;
    let out_dir = &config.paths.out_dir;
    let tables = write_attribution_tables(&table, out_dir)?;

    let figures = if plot {
        let absolute: Vec<_> = table.absolute_rows().collect();
        let shares: Vec<_> = table.share_rows().collect();
        Some(write_figures(&absolute, &shares, out_dir)?)
    } else {
        None
    };

    let last = table.years().len() - 1;
    let summary = RunSummary {
        first_year: table.years().first(),
        last_year: table.years().last(),
        final_rf_total: table.rf_total()[last],
        final_share_fossil: table.share_fossil()[last],
        final_share_land_use: table.share_land_use()[last],
        tables,
        figures,
    };
    info!(
        last_year = summary.last_year,
        rf_total = summary.final_rf_total,
        share_fossil = summary.final_share_fossil,
        "Run complete"
    );
    Ok(summary)
}

/// Draw the charts from tables previously written to `out_dir`
pub fn plot_from_tables(out_dir: impl AsRef<Path>) -> AdapterResult<FigurePaths> {
    let out_dir = out_dir.as_ref();
    let tables = OutputPaths::in_dir(out_dir);
    let absolute = read_absolute_table(&tables.absolute)?;
    let shares = read_share_table(&tables.shares)?;
    write_figures(&absolute, &shares, out_dir)
}

fn write_figures(
    absolute: &[AbsoluteContribution],
    shares: &[SourceShare],
    out_dir: &Path,
) -> AdapterResult<FigurePaths> {
    let figures = FigurePaths {
        stacked: out_dir.join(STACKED_FIGURE_FILE),
        shares: out_dir.join(SHARES_FIGURE_FILE),
    };
    plot_stacked_forcing(absolute, &figures.stacked)?;
    plot_relative_shares(shares, &figures.shares)?;
    Ok(figures)
}

/// Shares obtained with each shock fraction, compared against the configured one
pub fn run_sensitivity(
    config: &RunConfig,
    options: EngineOptions,
    shock_fracs: &[FloatValue],
) -> AdapterResult<Vec<ShockSensitivity>> {
    let inputs = load_inputs(config)?;
    let engine =
        AttributionEngine::from_parameters(config.model_parameters())?.with_options(options);
    Ok(shock_sensitivity(&engine, &inputs, shock_fracs)?)
}
