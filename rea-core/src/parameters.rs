//! REA parameters
//!
//! Tunable constants of the Reliability Ensemble Averaging pipeline. Defaults
//! reproduce the reference behaviour (11 iterations, 0.01 floor, decadal rolling
//! window with at least 2 samples).

use crate::errors::{ReaError, ReaResult};
use crate::timeseries::{Calendar, FloatValue};
use serde::{Deserialize, Serialize};

/// Parameters for the REA pipeline.
///
/// Can be read from a TOML table; missing keys take their default value.
///
/// ```rust
/// use rea_core::parameters::ReaParameters;
///
/// let params = ReaParameters::from_toml_str("rea_iterations = 5").unwrap();
/// assert_eq!(params.rea_iterations, 5);
/// assert_eq!(params.epsilon_floor, 0.01);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaParameters {
    /// Treat series as year-aligned instead of month-aligned.
    ///
    /// Climatologies then have a single period and the natural variability is
    /// estimated over the full annual series.
    /// Default: false
    pub annual_mode: bool,

    /// Number of convergence iterations of the reliability loop.
    /// Default: 11
    pub rea_iterations: usize,

    /// Lower bound applied to biases, distances and reliability factors.
    /// Default: 0.01
    pub epsilon_floor: FloatValue,

    /// Length of the rolling window used for natural variability (periods).
    /// Default: 10
    pub rolling_window: usize,

    /// Minimum number of present samples for a rolling mean value.
    /// Default: 2
    pub rolling_min_periods: usize,

    /// Process sites on the rayon thread pool.
    /// Default: false
    pub parallel: bool,
}

impl Default for ReaParameters {
    fn default() -> Self {
        Self {
            annual_mode: false,
            rea_iterations: 11,
            epsilon_floor: 0.01,
            rolling_window: 10,
            rolling_min_periods: 2,
            parallel: false,
        }
    }
}

impl ReaParameters {
    /// Parse and validate parameters from a TOML document
    pub fn from_toml_str(s: &str) -> ReaResult<Self> {
        let parameters: ReaParameters = toml::from_str(s)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Calendar implied by `annual_mode`
    pub fn calendar(&self) -> Calendar {
        if self.annual_mode {
            Calendar::Annual
        } else {
            Calendar::Monthly
        }
    }

    /// Check that the parameters can drive the pipeline
    pub fn validate(&self) -> ReaResult<()> {
        let invalid = |name: &str, reason: &str| {
            Err(ReaError::InvalidParameter {
                name: name.to_string(),
                reason: reason.to_string(),
            })
        };
        if self.rea_iterations == 0 {
            return invalid("rea_iterations", "at least one iteration is required");
        }
        if !self.epsilon_floor.is_finite() || self.epsilon_floor < 0.0 {
            return invalid("epsilon_floor", "must be finite and non-negative");
        }
        if self.rolling_window == 0 {
            return invalid("rolling_window", "must be at least 1");
        }
        if self.rolling_min_periods == 0 || self.rolling_min_periods > self.rolling_window {
            return invalid(
                "rolling_min_periods",
                "must be between 1 and rolling_window",
            );
        }
        Ok(())
    }
}
