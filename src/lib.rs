//! Historical CO2 radiative forcing attributed to fossil-fuel (FF) and
//! land-use change (ELUC) emissions.
//!
//! The model itself lives in [`rsca_core`] and the file handling in
//! [`rsca_io`]. [`pipeline`] joins them into the runs exposed by the `rsca`
//! binary.

pub mod pipeline;

pub use rsca_core;
pub use rsca_io;
