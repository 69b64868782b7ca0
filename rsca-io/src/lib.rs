//! Inputs and outputs around the attribution model.
//!
//! - [`config`]: TOML run configuration
//! - [`emissions`]: FF and ELUC emissions from CSV, with gap filling and a
//!   synthetic fallback for missing files
//! - [`output`]: CSV tables of absolute contributions and shares
//! - [`plot`]: SVG charts of those tables

pub mod config;
pub mod emissions;
pub mod errors;
pub mod output;
pub mod plot;

pub use config::RunConfig;
pub use errors::{AdapterError, AdapterResult};
pub use output::OutputPaths;
