//! Reliability Ensemble Averaging (REA) of climate-model projections at
//! observation sites
//!
//! REA weights each model of an ensemble by two reliability factors: its bias
//! against the observations over a reference period, and the distance of its
//! projected change from the ensemble consensus. Both are measured relative to the
//! natural variability of the observations, so differences smaller than that
//! variability are not penalised.
//!
//! The workspace is split in three:
//!
//! - [`rea_core`]: timeseries, calendars, grids, parameters and errors
//! - [`rea_components`]: the numerical stages and the per-site [`ReaEngine`]
//! - this crate: the run [`config`], the data collaborators in [`sources`], the
//!   output [`tables`] and the [`ReaDriver`] that ties them together
//!
//! ```rust
//! use rea::config::RunConfig;
//! use rea::driver::ReaDriver;
//! use rea::sources::{MemoryGridSource, MemorySink, MemoryStationSource};
//!
//! let config = RunConfig::from_toml_str(
//!     r#"
//! variable = "tas"
//! reference_period = { start = "1981-01-01", end = "2011-01-01" }
//! projection_period = { start = "2071-01-01", end = "2101-01-01" }
//! models = [{ name = "M1", historical = "m1_hist.nc", projection = "m1_rcp85.nc" }]
//! "#,
//! )
//! .unwrap();
//! let driver = ReaDriver::new(config).unwrap();
//!
//! // No grids and no stations: nothing to process, the model is reported
//! let mut sink = MemorySink::new();
//! let summary = driver
//!     .run(&MemoryGridSource::new(), &MemoryStationSource::default(), &mut sink)
//!     .unwrap();
//! assert!(summary.processed.is_empty());
//! assert_eq!(summary.skips.len(), 1);
//! ```

pub mod config;
pub mod driver;
pub mod sources;
pub mod tables;

pub use driver::ReaDriver;
pub use rea_components;
pub use rea_components::engine::ReaEngine;
pub use rea_core;
