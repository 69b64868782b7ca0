//! rsca command line
//!
//! # Usage
//!
//! ```bash
//! rsca init-config --output run.toml
//! rsca run --config run.toml --plot
//! rsca sensitivity --config run.toml --shocks 0.05,0.1,0.2,0.5 --strategy recursive
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rsca::pipeline::{execute_run, plot_from_tables, run_sensitivity};
use rsca::rsca_core::{ConvolutionStrategy, EngineOptions};
use rsca::rsca_io::RunConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Attribute historical CO2 forcing to fossil-fuel and land-use emissions
#[derive(Parser, Debug)]
#[command(name = "rsca", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the attribution and write the result tables
    Run {
        /// TOML run configuration
        #[arg(short, long)]
        config: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Also draw the charts
        #[arg(long)]
        plot: bool,
    },
    /// Draw charts from tables written by a previous run
    Plot {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Report how the shares depend on the shock fraction
    Sensitivity {
        #[arg(short, long)]
        config: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Comma-separated shock fractions
        #[arg(long, value_delimiter = ',', default_value = "0.05,0.1,0.2,0.5")]
        shocks: Vec<f64>,
    },
    /// Print a configuration with the default parameters
    InitConfig {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Numerical options shared by every command that runs the model
#[derive(Args, Debug, Clone, Copy)]
struct EngineArgs {
    /// Convolution used for the carbon cycle
    #[arg(long, value_enum, default_value_t = Strategy::Direct)]
    strategy: Strategy,

    /// Evaluate the scenarios one after another
    #[arg(long)]
    sequential: bool,
}

impl From<EngineArgs> for EngineOptions {
    fn from(args: EngineArgs) -> Self {
        EngineOptions {
            strategy: args.strategy.into(),
            parallel: !args.sequential,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    Direct,
    Recursive,
}

impl From<Strategy> for ConvolutionStrategy {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::Direct => ConvolutionStrategy::Direct,
            Strategy::Recursive => ConvolutionStrategy::Recursive,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            engine,
            plot,
        } => {
            let run_config = load_config(&config)?;
            let summary = execute_run(&run_config, engine.into(), plot)
                .with_context(|| format!("Run failed for {}", config.display()))?;

            println!(
                "{}-{}: attributed RF {:.3} W/m2, FF {:.1}%, ELUC {:.1}%",
                summary.first_year,
                summary.last_year,
                summary.final_rf_total,
                100.0 * summary.final_share_fossil,
                100.0 * summary.final_share_land_use
            );
            println!("Wrote {}", summary.tables.absolute.display());
            println!("Wrote {}", summary.tables.shares.display());
            if let Some(figures) = summary.figures {
                println!("Wrote {}", figures.stacked.display());
                println!("Wrote {}", figures.shares.display());
            }
        }
        Commands::Plot { config } => {
            let run_config = load_config(&config)?;
            let out_dir = &run_config.paths.out_dir;
            let figures = plot_from_tables(out_dir).with_context(|| {
                format!("Could not plot the tables in {}", out_dir.display())
            })?;
            println!("Wrote {}", figures.stacked.display());
            println!("Wrote {}", figures.shares.display());
        }
        Commands::Sensitivity {
            config,
            engine,
            shocks,
        } => {
            let run_config = load_config(&config)?;
            let report = run_sensitivity(&run_config, engine.into(), &shocks)
                .context("Sensitivity run failed")?;

            println!(
                "reference shock_frac = {}",
                run_config.attribution.shock_frac
            );
            println!("shock_frac  FF_share  ELUC_share  max_FF_share_deviation");
            for entry in report {
                println!(
                    "{:>10.3}  {:>8.4}  {:>10.4}  {:>22.2e}",
                    entry.shock_frac,
                    entry.final_share_fossil,
                    entry.final_share_land_use,
                    entry.max_share_deviation
                );
            }
        }
        Commands::InitConfig { output } => {
            let contents = RunConfig::default()
                .to_toml_string()
                .context("Could not serialise the default configuration")?;
            match output {
                Some(path) => {
                    fs::write(&path, contents)
                        .with_context(|| format!("Could not write {}", path.display()))?;
                    info!(path = %path.display(), "Wrote default configuration");
                }
                None => print!("{contents}"),
            }
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<RunConfig> {
    RunConfig::from_file(path)
        .with_context(|| format!("Could not load configuration from {}", path.display()))
}
