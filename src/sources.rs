//! Collaborators of a run
//!
//! The driver does not read files itself. Gridded model output, station
//! observations and the destination of the tables are reached through the traits
//! below; the in-memory implementations serve tests and embedding applications that
//! already hold their data.

use crate::tables::ReaTables;
use chrono::NaiveDate;
use rea_core::errors::{ReaError, ReaResult};
use rea_core::grid_transform::normalize_coordinates;
use rea_core::spatial::{GriddedField, Site};
use rea_core::timeseries::{FloatValue, TimeRange};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of gridded model output
pub trait GridSource {
    /// Load `variable` from the grid at `path`, restricted to `range`
    ///
    /// Coordinate names of the returned field must be normalized to
    /// `time`, `lat` and `lon`.
    fn load_grid(&self, path: &Path, variable: &str, range: &TimeRange)
        -> ReaResult<GriddedField>;
}

/// A station and its raw observations
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub site: Site,
    /// Dated raw samples, in any order and at any sub-period frequency
    pub samples: Vec<(NaiveDate, FloatValue)>,
}

/// Source of the station table and observations
pub trait StationSource {
    fn stations(&self) -> ReaResult<Vec<StationRecord>>;
}

/// Destination of the produced tables
pub trait OutputSink {
    fn write_tables(&mut self, tables: &ReaTables) -> ReaResult<()>;
}

/// Grids held in memory, keyed by path and variable
#[derive(Debug, Clone, Default)]
pub struct MemoryGridSource {
    grids: HashMap<(PathBuf, String), GriddedField>,
}

impl MemoryGridSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        path: impl Into<PathBuf>,
        variable: impl Into<String>,
        field: GriddedField,
    ) {
        self.grids.insert((path.into(), variable.into()), field);
    }
}

impl GridSource for MemoryGridSource {
    fn load_grid(
        &self,
        path: &Path,
        variable: &str,
        range: &TimeRange,
    ) -> ReaResult<GriddedField> {
        let field = self
            .grids
            .get(&(path.to_path_buf(), variable.to_string()))
            .ok_or_else(|| {
                ReaError::Error(format!("no '{}' grid at {}", variable, path.display()))
            })?;
        normalize_coordinates(field.clone())?.select_time(range)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStationSource {
    records: Vec<StationRecord>,
}

impl MemoryStationSource {
    pub fn new(records: Vec<StationRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, site: Site, samples: Vec<(NaiveDate, FloatValue)>) {
        self.records.push(StationRecord { site, samples });
    }
}

impl StationSource for MemoryStationSource {
    fn stations(&self) -> ReaResult<Vec<StationRecord>> {
        Ok(self.records.clone())
    }
}

/// Collects every table written to it
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub written: Vec<ReaTables>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently written tables
    pub fn last(&self) -> Option<&ReaTables> {
        self.written.last()
    }
}

impl OutputSink for MemorySink {
    fn write_tables(&mut self, tables: &ReaTables) -> ReaResult<()> {
        self.written.push(tables.clone());
        Ok(())
    }
}
