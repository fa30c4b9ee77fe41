//! Natural variability estimator
//!
//! Estimates the amplitude of natural variability, $\varepsilon$, of each calendar
//! period from the observations:
//!
//! 1. Take the observed values of the period in chronological order.
//! 2. Remove a least-squares linear trend fitted against the index `1..=n`.
//! 3. Apply a trailing rolling mean (decadal window, at least 2 samples).
//! 4. $\varepsilon$ is the range (max - min) of the rolling mean.
//!
//! Differences between a model and the observations or between models that are
//! smaller than $\varepsilon$ are indistinguishable from natural variability and are
//! not penalised by the reliability factors.

use log::trace;
use rea_core::parameters::ReaParameters;
use rea_core::periodic::PeriodValues;
use rea_core::timeseries::{is_missing, FloatValue, Timeseries, MISSING};
use rea_core::utils::stats::{detrend, nan_range, rolling_mean};
use serde::{Deserialize, Serialize};

/// Ranges smaller than this fraction of the data magnitude are treated as zero
const ZERO_RANGE_TOLERANCE: FloatValue = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariabilityEstimator {
    window: usize,
    min_periods: usize,
}

impl VariabilityEstimator {
    pub fn from_parameters(parameters: &ReaParameters) -> Self {
        Self::new(parameters.rolling_window, parameters.rolling_min_periods)
    }

    pub fn new(window: usize, min_periods: usize) -> Self {
        Self {
            window,
            min_periods,
        }
    }

    /// $\varepsilon$ of a single chronological sub-series
    ///
    /// Missing if fewer than two values are present.
    pub fn amplitude(&self, values: &[FloatValue]) -> FloatValue {
        let present = values.iter().filter(|v| !is_missing(**v)).count();
        if present < 2 {
            return MISSING;
        }

        let detrended = detrend(values);
        let rolling = rolling_mean(&detrended, self.window, self.min_periods);
        let range = nan_range(&rolling);
        trace!("rolling mean {:?}, range {}", rolling, range);
        if is_missing(range) {
            return MISSING;
        }

        let scale = values
            .iter()
            .filter(|v| !is_missing(**v))
            .fold(1.0, |acc: FloatValue, v| acc.max(v.abs()));
        if range <= ZERO_RANGE_TOLERANCE * scale {
            0.0
        } else {
            range
        }
    }

    /// $\varepsilon$ for every period of the observed series
    ///
    /// In annual mode the series has a single period, so $\varepsilon$ is computed
    /// over the full annual series.
    pub fn epsilon(&self, observed: &Timeseries) -> PeriodValues {
        let groups = observed.group_by_period();
        PeriodValues::from_fn(observed.calendar(), |p| self.amplitude(&groups[p]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use rea_core::timeseries::{Calendar, TimeAxis};

    fn estimator() -> VariabilityEstimator {
        VariabilityEstimator::from_parameters(&ReaParameters::default())
    }

    fn monthly_years(n_years: usize, f: impl Fn(usize, usize) -> f64) -> Timeseries {
        let axis = TimeAxis::new(
            Calendar::Monthly,
            NaiveDate::from_ymd_opt(1981, 1, 1).unwrap(),
            n_years * 12,
        )
        .unwrap();
        let values = (0..n_years * 12).map(|i| f(i / 12, i % 12)).collect();
        Timeseries::from_values(values, axis).unwrap()
    }

    #[test]
    fn pure_trend_has_zero_amplitude() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        assert_eq!(estimator().amplitude(&values), 0.0);
    }

    #[test]
    fn fewer_than_two_values_is_missing() {
        assert!(is_missing(estimator().amplitude(&[1.0])));
        assert!(is_missing(estimator().amplitude(&[MISSING, 2.0, MISSING])));
    }

    #[test]
    fn empty_window_gives_missing_amplitude() {
        let e = VariabilityEstimator::new(0, 1).amplitude(&[0.0, 2.0, 0.0, 1.0]);
        assert!(is_missing(e));
    }

    #[test]
    fn amplitude_of_known_series() {
        // Symmetric, so the fitted slope is zero.
        // residuals [-2/3, 4/3, -2/3]; rolling means [nan, 1/3, 0]
        let e = estimator().amplitude(&[0.0, 2.0, 0.0]);
        assert_abs_diff_eq!(e, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn epsilon_is_per_month() {
        // January alternates, every other month is a straight line
        let ts = monthly_years(10, |year, month| {
            if month == 0 {
                if year % 2 == 0 {
                    1.0
                } else {
                    -1.0
                }
            } else {
                year as f64
            }
        });
        let eps = estimator().epsilon(&ts);
        assert_eq!(eps.len(), 12);
        assert!(eps[0] > 0.0);
        for m in 1..12 {
            assert_eq!(eps[m], 0.0);
        }
    }

    #[test]
    fn missing_month_gives_missing_epsilon() {
        let ts = monthly_years(5, |year, month| {
            if month == 1 {
                MISSING
            } else {
                (year * month) as f64
            }
        });
        let eps = estimator().epsilon(&ts);
        assert!(eps.is_missing_at(1));
        assert!(!eps.is_missing_at(2));
    }

    #[test]
    fn epsilon_is_non_negative() {
        let ts = monthly_years(20, |year, month| ((year * 7 + month * 3) % 5) as f64 - 2.0);
        let eps = estimator().epsilon(&ts);
        assert!(eps.iter().all(|e| e >= 0.0));
    }

    #[test]
    fn annual_epsilon_uses_whole_series() {
        let axis = TimeAxis::new(
            Calendar::Annual,
            NaiveDate::from_ymd_opt(1981, 1, 1).unwrap(),
            3,
        )
        .unwrap();
        let ts = Timeseries::from_values(vec![0.0, 2.0, 0.0], axis).unwrap();
        let eps = estimator().epsilon(&ts);
        assert_eq!(eps.len(), 1);
        assert_abs_diff_eq!(eps[0], 1.0 / 3.0, epsilon = 1e-12);
    }
}
