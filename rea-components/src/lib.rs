//! The numerical stages of Reliability Ensemble Averaging (REA)
//!
//! Each stage lives in [`components`] and can be used on its own:
//!
//! - `climatology`: per-period mean of a series over the reference period
//! - `BiasCalculator`: floored absolute model bias
//! - `VariabilityEstimator`: natural variability $\varepsilon$ from the observations
//! - `ReliabilityCombiner`: the iterative bias and convergence reliability factors
//! - `EnsembleAggregator`: weighted change, series and uncertainty ranges
//!
//! [`engine::ReaEngine`] runs them in order for one site.

pub mod components;
pub mod diagnostics;
pub mod engine;
