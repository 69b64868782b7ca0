//! Historical CO2 forcing and its attribution to emission sources.
//!
//! The pipeline is a chain of pure functions:
//!
//! - [`kernel`]: impulse response kernel from weighted exponential terms
//! - [`convolution`]: emissions to atmospheric concentration
//! - [`forcing`]: concentration to radiative forcing
//! - [`attribution`]: baseline and shocked runs, differenced into per-source
//!   forcing and shares
//!
//! [`sensitivity`] reports how the shares depend on the shock size.

pub mod attribution;
pub mod convolution;
pub mod errors;
pub mod forcing;
pub mod kernel;
pub mod parameters;
pub mod sensitivity;
pub mod timeseries;

pub use attribution::{
    attribute, AbsoluteContribution, AttributionEngine, AttributionTable, EmissionsInput,
    EngineOptions, Scenario, SourceShare,
};
pub use convolution::ConvolutionStrategy;
pub use errors::{RSCAError, RSCAResult};
pub use parameters::{
    AttributionParameters, CarbonCycleParameters, ForcingParameters, ModelParameters,
    TimeConstant,
};
pub use timeseries::{FloatValue, Year, YearAxis};
