//! Per-period value vectors
//!
//! Climatologies, natural-variability amplitudes and the per-period outputs of the
//! ensemble all share one shape: a value for each period of a [`Calendar`]
//! (12 for monthly series, 1 for annual series).

use crate::errors::{ReaError, ReaResult};
use crate::timeseries::{is_missing, Calendar, FloatValue, MISSING};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// A value per calendar period, possibly missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodValues {
    calendar: Calendar,
    values: Vec<FloatValue>,
}

impl PeriodValues {
    /// Build from explicit values
    ///
    /// `values` must have one entry per period of `calendar`.
    pub fn new(calendar: Calendar, values: Vec<FloatValue>) -> ReaResult<Self> {
        if values.len() != calendar.n_periods() {
            return Err(ReaError::LengthMismatch {
                expected: calendar.n_periods(),
                got: values.len(),
            });
        }
        Ok(Self { calendar, values })
    }

    /// Every period missing
    pub fn missing(calendar: Calendar) -> Self {
        Self::filled(calendar, MISSING)
    }

    pub fn filled(calendar: Calendar, value: FloatValue) -> Self {
        Self {
            calendar,
            values: vec![value; calendar.n_periods()],
        }
    }

    /// Build by evaluating `f` for every period index
    pub fn from_fn(calendar: Calendar, f: impl FnMut(usize) -> FloatValue) -> Self {
        Self {
            calendar,
            values: (0..calendar.n_periods()).map(f).collect(),
        }
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, period: usize) -> Option<FloatValue> {
        self.values.get(period).copied()
    }

    pub fn is_missing_at(&self, period: usize) -> bool {
        self.get(period).map_or(true, is_missing)
    }

    pub fn as_slice(&self) -> &[FloatValue] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = FloatValue> + '_ {
        self.values.iter().copied()
    }

    /// Elementwise combination of two vectors on the same calendar
    ///
    /// Missing inputs give a missing output without calling `f`.
    pub fn zip_with(
        &self,
        other: &PeriodValues,
        mut f: impl FnMut(FloatValue, FloatValue) -> FloatValue,
    ) -> ReaResult<PeriodValues> {
        if self.calendar != other.calendar {
            return Err(ReaError::Error(format!(
                "cannot combine {:?} and {:?} period vectors",
                self.calendar, other.calendar
            )));
        }
        Ok(Self::from_fn(self.calendar, |p| {
            let (a, b) = (self.values[p], other.values[p]);
            if is_missing(a) || is_missing(b) {
                MISSING
            } else {
                f(a, b)
            }
        }))
    }
}

impl Index<usize> for PeriodValues {
    type Output = FloatValue;

    fn index(&self, period: usize) -> &Self::Output {
        &self.values[period]
    }
}
