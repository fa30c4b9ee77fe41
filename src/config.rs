//! Run configuration
//!
//! A run is described by a TOML document:
//!
//! ```toml
//! variable = "tas"
//!
//! [reference_period]
//! start = "1981-01-01"
//! end = "2011-01-01"
//!
//! [projection_period]
//! start = "2071-01-01"
//! end = "2101-01-01"
//!
//! [[models]]
//! name = "CNRM-ALADIN"
//! historical = "grids/cnrm_hist.nc"
//! projection = "grids/cnrm_rcp85.nc"
//!
//! [parameters]
//! rea_iterations = 11
//! ```
//!
//! Dates are quoted ISO-8601 strings; both periods are half-open `[start, end)`.

use rea_core::errors::{ReaError, ReaResult};
use rea_core::parameters::ReaParameters;
use rea_core::timeseries::TimeRange;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Gridded inputs of one ensemble member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRun {
    pub name: String,
    /// Grid covering the reference period
    pub historical: PathBuf,
    /// Grid covering the projection period
    pub projection: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Name of the variable read from every grid
    pub variable: String,
    pub reference_period: TimeRange,
    pub projection_period: TimeRange,
    pub models: Vec<ModelRun>,
    #[serde(default)]
    pub parameters: ReaParameters,
}

impl RunConfig {
    pub fn from_toml_str(s: &str) -> ReaResult<Self> {
        let config: RunConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ReaResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ReaError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Check the periods, the model list and the parameters
    pub fn validate(&self) -> ReaResult<()> {
        for (name, range) in [
            ("reference_period", &self.reference_period),
            ("projection_period", &self.projection_period),
        ] {
            if range.end <= range.start {
                return Err(ReaError::Config(format!(
                    "{} must end after it starts ({} .. {})",
                    name, range.start, range.end
                )));
            }
        }
        if self.models.is_empty() {
            return Err(ReaError::Config("at least one model is required".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.models.iter().find(|m| !seen.insert(m.name.as_str())) {
            return Err(ReaError::Config(format!(
                "model '{}' is listed more than once",
                duplicate.name
            )));
        }
        self.parameters.validate()
    }
}
