//! Synthetic ensembles served through the in-memory collaborators.
#![allow(dead_code)]

use chrono::NaiveDate;
use ndarray::Array3;
use rea::config::{ModelRun, RunConfig};
use rea::sources::{MemoryGridSource, MemoryStationSource, StationRecord};
use rea::tables::ReaTables;
use rea_core::parameters::ReaParameters;
use rea_core::spatial::{GriddedField, Site};
use rea_core::timeseries::{Calendar, TimeAxis, TimeRange, MISSING};

pub const YEARS: usize = 10;
pub const VARIABLE: &str = "tas";

pub fn date(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

/// Values alternating between `+amplitude` and `-amplitude` from one year to the next
pub fn alternating(amplitude: f64) -> impl Fn(usize, usize) -> f64 {
    move |year, _| if year % 2 == 0 { amplitude } else { -amplitude }
}

/// A monthly grid over `[40, 41] x [0, 1]` holding the same value at every node
pub fn uniform_grid(start: NaiveDate, f: &dyn Fn(usize, usize) -> f64) -> GriddedField {
    let months = YEARS * 12;
    let axis = TimeAxis::new(Calendar::Monthly, start, months).unwrap();
    let data = Array3::from_shape_fn((months, 2, 2), |(t, _, _)| f(t / 12, t % 12));
    GriddedField::new(
        data,
        ["time", "lat", "lon"],
        axis,
        vec![40.0, 41.0],
        vec![0.0, 1.0],
    )
    .unwrap()
}

/// Two raw samples a month, on the 1st and the 15th
pub fn station(name: &str, f: &dyn Fn(usize, usize) -> f64) -> StationRecord {
    let mut samples = Vec::new();
    for year in 0..YEARS {
        for month in 0..12 {
            let value = f(year, month);
            for day in [1, 15] {
                let stamp =
                    NaiveDate::from_ymd_opt(1981 + year as i32, month as u32 + 1, day).unwrap();
                samples.push((stamp, value));
            }
        }
    }
    StationRecord {
        site: Site::new(name, 40.5, 0.5),
        samples,
    }
}

/// Replace every raw sample of `month` (0-based) with the missing marker
pub fn drop_month(mut record: StationRecord, month: u32) -> StationRecord {
    use chrono::Datelike;
    for (stamp, value) in record.samples.iter_mut() {
        if stamp.month0() == month {
            *value = MISSING;
        }
    }
    record
}

/// A model defined by its offset from the observations and its projected change
pub struct SyntheticModel {
    pub name: String,
    pub bias: f64,
    pub change: Box<dyn Fn(usize) -> f64 + Send + Sync>,
}

impl SyntheticModel {
    pub fn new(name: &str, bias: f64, change: f64) -> Self {
        Self::with_monthly_change(name, bias, move |_| change)
    }

    pub fn with_monthly_change(
        name: &str,
        bias: f64,
        change: impl Fn(usize) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            bias,
            change: Box::new(change),
        }
    }
}

/// Run configuration, grids and stations for a synthetic ensemble
///
/// Each model reproduces `climate` shifted by its bias over 1981-1990, and the
/// same shifted climate plus its monthly change over 2071-2080.
pub fn ensemble(
    parameters: ReaParameters,
    climate: &dyn Fn(usize, usize) -> f64,
    models: &[SyntheticModel],
    stations: Vec<StationRecord>,
) -> (RunConfig, MemoryGridSource, MemoryStationSource) {
    let mut grids = MemoryGridSource::new();
    let mut runs = Vec::new();
    for model in models {
        let historical = format!("{}_hist.nc", model.name);
        let projection = format!("{}_proj.nc", model.name);
        grids.insert(
            historical.as_str(),
            VARIABLE,
            uniform_grid(date(1981, 1), &|y, m| climate(y, m) + model.bias),
        );
        grids.insert(
            projection.as_str(),
            VARIABLE,
            uniform_grid(date(2071, 1), &|y, m| {
                climate(y, m) + model.bias + (model.change)(m)
            }),
        );
        runs.push(ModelRun {
            name: model.name.clone(),
            historical: historical.into(),
            projection: projection.into(),
        });
    }
    let config = RunConfig {
        variable: VARIABLE.to_string(),
        reference_period: TimeRange::new(date(1981, 1), date(1991, 1)),
        projection_period: TimeRange::new(date(2071, 1), date(2081, 1)),
        models: runs,
        parameters,
    };
    (config, grids, MemoryStationSource::new(stations))
}

/// Every float of the tables as raw bits, in table order
pub fn table_bits(tables: &ReaTables) -> Vec<u64> {
    let mut bits = Vec::new();
    for row in &tables.changes {
        bits.extend(
            [row.change, row.uncertainty, row.series_uncertainty, row.epsilon].map(f64::to_bits),
        );
    }
    for row in &tables.series {
        bits.push(row.value.to_bits());
    }
    for row in &tables.reliabilities {
        bits.extend([row.bias, row.delta, row.r_b, row.r_d, row.r].map(f64::to_bits));
    }
    bits
}
