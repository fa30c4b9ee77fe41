//! Calendar-aligned timeseries with a distinguished missing marker
//!
//! All series handled by the REA pipeline are sampled once per period, where a
//! period is either a calendar month or a calendar year (see [`Calendar`]). Period
//! stamps are the first day of the period and are contiguous over a half-open
//! interval `[start, end)`.
//!
//! Missing values are represented by [`MISSING`] (a NaN). Stages never rely on NaN
//! arithmetic to drop values: they test with [`is_missing`] and filter explicitly.

use crate::errors::{ReaError, ReaResult};
use chrono::{Datelike, NaiveDate};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type FloatValue = f64;

/// The missing marker
pub const MISSING: FloatValue = FloatValue::NAN;

/// Test a value against the missing marker.
///
/// Any non-finite value is treated as missing, so an overflow to infinity is never
/// mistaken for data.
#[inline]
pub fn is_missing(value: FloatValue) -> bool {
    !value.is_finite()
}

/// Temporal resolution of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Calendar {
    /// One value per calendar month, climatologies have 12 periods
    #[default]
    Monthly,
    /// One value per calendar year, climatologies have a single period
    Annual,
}

impl Calendar {
    /// Number of periods in a climatology built on this calendar
    pub fn n_periods(self) -> usize {
        match self {
            Calendar::Monthly => 12,
            Calendar::Annual => 1,
        }
    }

    /// Zero-based period index of a date (month - 1 for monthly series)
    pub fn period_index(self, date: NaiveDate) -> usize {
        match self {
            Calendar::Monthly => date.month0() as usize,
            Calendar::Annual => 0,
        }
    }

    /// Label used for a period index in output tables (1..=12, or 1 for annual)
    pub fn period_label(self, index: usize) -> usize {
        index + 1
    }

    /// Linear ordinal of the period containing `date`
    fn ordinal(self, date: NaiveDate) -> i64 {
        match self {
            Calendar::Monthly => date.year() as i64 * 12 + date.month0() as i64,
            Calendar::Annual => date.year() as i64,
        }
    }

    /// First day of the period with the given ordinal
    fn from_ordinal(self, ordinal: i64) -> Option<NaiveDate> {
        match self {
            Calendar::Monthly => {
                let year = i32::try_from(ordinal.div_euclid(12)).ok()?;
                let month = ordinal.rem_euclid(12) as u32 + 1;
                NaiveDate::from_ymd_opt(year, month, 1)
            }
            Calendar::Annual => NaiveDate::from_ymd_opt(i32::try_from(ordinal).ok()?, 1, 1),
        }
    }

    /// First day of the period containing `date`
    pub fn align(self, date: NaiveDate) -> NaiveDate {
        match self {
            Calendar::Monthly => date.with_day(1).unwrap_or(date),
            Calendar::Annual => date.with_ordinal(1).unwrap_or(date),
        }
    }
}

/// Half-open date interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Contiguous sequence of period stamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    calendar: Calendar,
    stamps: Vec<NaiveDate>,
}

impl TimeAxis {
    /// Build an axis of `len` periods starting at the period containing `start`
    pub fn new(calendar: Calendar, start: NaiveDate, len: usize) -> ReaResult<Self> {
        let first = calendar.ordinal(start);
        let stamps = (0..len as i64)
            .map(|i| {
                calendar.from_ordinal(first + i).ok_or_else(|| {
                    ReaError::Error(format!("period {} after {} is out of range", i, start))
                })
            })
            .collect::<ReaResult<Vec<_>>>()?;
        Ok(Self { calendar, stamps })
    }

    /// Build the axis covering every period that starts inside `[start, end)`
    ///
    /// The first period is the one containing `start`.
    pub fn spanning(calendar: Calendar, range: &TimeRange) -> ReaResult<Self> {
        if range.end <= range.start {
            return Self::new(calendar, range.start, 0);
        }
        let first = calendar.ordinal(range.start);
        let last = calendar.ordinal(range.end);
        // The period containing `end` only counts when it starts strictly before `end`
        let end_is_aligned = calendar.align(range.end) == range.end;
        let len = (last - first + if end_is_aligned { 0 } else { 1 }).max(0);
        Self::new(calendar, range.start, len as usize)
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn stamps(&self) -> &[NaiveDate] {
        &self.stamps
    }

    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.stamps.get(index).copied()
    }

    /// Period index of the stamp at `index`
    pub fn period_at(&self, index: usize) -> usize {
        self.calendar.period_index(self.stamps[index])
    }

    /// Position of the period containing `date`, if it lies on the axis
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        let first = self.stamps.first()?;
        let offset = self.calendar.ordinal(date) - self.calendar.ordinal(*first);
        if offset < 0 || offset as usize >= self.len() {
            None
        } else {
            Some(offset as usize)
        }
    }

    /// Axis restricted to the periods whose stamp lies in `range`
    ///
    /// Returns the index of the first kept stamp together with the new axis.
    pub fn select(&self, range: &TimeRange) -> (usize, TimeAxis) {
        let first = self
            .stamps
            .iter()
            .position(|d| range.contains(*d))
            .unwrap_or(self.len());
        let stamps: Vec<NaiveDate> = self.stamps[first..]
            .iter()
            .take_while(|d| range.contains(**d))
            .copied()
            .collect();
        (
            first,
            TimeAxis {
                calendar: self.calendar,
                stamps,
            },
        )
    }
}

/// A calendar-aligned series of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeseries {
    axis: Arc<TimeAxis>,
    values: Array1<FloatValue>,
}

impl Timeseries {
    pub fn new(values: Array1<FloatValue>, axis: Arc<TimeAxis>) -> ReaResult<Self> {
        if values.len() != axis.len() {
            return Err(ReaError::LengthMismatch {
                expected: axis.len(),
                got: values.len(),
            });
        }
        Ok(Self { axis, values })
    }

    pub fn from_values(values: Vec<FloatValue>, axis: TimeAxis) -> ReaResult<Self> {
        Self::new(Array1::from(values), Arc::new(axis))
    }

    /// Resample dated raw samples to one mean value per period
    ///
    /// Missing raw samples are skipped by the mean, but a period that contains any
    /// missing raw sample is masked as a whole. Periods inside the covered span
    /// without samples are missing.
    pub fn resample_mean(samples: &[(NaiveDate, FloatValue)], calendar: Calendar) -> ReaResult<Self> {
        let (first, last) = match (
            samples.iter().map(|(d, _)| *d).min(),
            samples.iter().map(|(d, _)| *d).max(),
        ) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ReaError::Error("cannot resample an empty sample set".to_string())),
        };
        let len = (calendar.ordinal(last) - calendar.ordinal(first) + 1) as usize;
        let axis = TimeAxis::new(calendar, first, len)?;

        let mut sums = vec![0.0; len];
        let mut counts = vec![0usize; len];
        let mut masked = vec![false; len];
        for (date, value) in samples {
            // Every sample lies between first and last, so the position always exists
            let Some(i) = axis.position(*date) else {
                continue;
            };
            if is_missing(*value) {
                masked[i] = true;
            } else {
                sums[i] += value;
                counts[i] += 1;
            }
        }

        let values: Vec<FloatValue> = (0..len)
            .map(|i| {
                if masked[i] || counts[i] == 0 {
                    MISSING
                } else {
                    sums[i] / counts[i] as FloatValue
                }
            })
            .collect();
        Self::from_values(values, axis)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn shared_axis(&self) -> Arc<TimeAxis> {
        Arc::clone(&self.axis)
    }

    pub fn calendar(&self) -> Calendar {
        self.axis.calendar()
    }

    pub fn values(&self) -> &Array1<FloatValue> {
        &self.values
    }

    pub fn at(&self, index: usize) -> Option<FloatValue> {
        self.values.get(index).copied()
    }

    /// Number of non-missing values
    pub fn count_present(&self) -> usize {
        self.values.iter().filter(|v| !is_missing(**v)).count()
    }

    pub fn is_all_missing(&self) -> bool {
        self.count_present() == 0
    }

    /// Iterate over `(stamp, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, FloatValue)> + '_ {
        self.axis
            .stamps()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Sub-series of the periods whose stamp lies in `range`
    pub fn select(&self, range: &TimeRange) -> Timeseries {
        let (first, axis) = self.axis.select(range);
        let values = self
            .values
            .slice(ndarray::s![first..first + axis.len()])
            .to_owned();
        Timeseries {
            axis: Arc::new(axis),
            values,
        }
    }

    /// The series placed on `axis`; periods it does not cover are missing
    pub fn reindex(&self, axis: Arc<TimeAxis>) -> ReaResult<Timeseries> {
        if axis.calendar() != self.calendar() {
            return Err(ReaError::Error(format!(
                "cannot place a {:?} series on a {:?} axis",
                self.calendar(),
                axis.calendar()
            )));
        }
        let values: Array1<FloatValue> = axis
            .stamps()
            .iter()
            .map(|d| {
                self.axis
                    .position(*d)
                    .map_or(MISSING, |i| self.values[i])
            })
            .collect();
        Timeseries::new(values, axis)
    }

    /// Values grouped by period index, each group in chronological order
    pub fn group_by_period(&self) -> Vec<Vec<FloatValue>> {
        let calendar = self.calendar();
        self.iter().fold(
            vec![Vec::new(); calendar.n_periods()],
            |mut groups, (date, value)| {
                groups[calendar.period_index(date)].push(value);
                groups
            },
        )
    }
}
