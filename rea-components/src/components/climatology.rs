//! Climatology builder
//!
//! Reduces a calendar-aligned series to one mean per period: the mean of all
//! January values, all February values, and so on (or a single mean in annual mode).

use rea_core::periodic::PeriodValues;
use rea_core::timeseries::Timeseries;
use rea_core::utils::stats::nan_mean;

/// Mean of the present values of each period
///
/// A period without any present value is missing.
pub fn climatology(series: &Timeseries) -> PeriodValues {
    let groups = series.group_by_period();
    PeriodValues::from_fn(series.calendar(), |p| nan_mean(&groups[p]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rea_core::timeseries::{Calendar, TimeAxis, MISSING};

    fn monthly(values: Vec<f64>) -> Timeseries {
        let axis = TimeAxis::new(
            Calendar::Monthly,
            NaiveDate::from_ymd_opt(1991, 1, 1).unwrap(),
            values.len(),
        )
        .unwrap();
        Timeseries::from_values(values, axis).unwrap()
    }

    #[test]
    fn mean_per_calendar_month() {
        // Two years: value = month + 12 * year_index
        let values: Vec<f64> = (0..24).map(|i| i as f64).collect();
        let clim = climatology(&monthly(values));
        assert_eq!(clim.len(), 12);
        assert_eq!(clim[0], 6.0);
        assert_eq!(clim[11], 17.0);
    }

    #[test]
    fn missing_values_are_skipped() {
        let mut values = vec![1.0; 24];
        values[0] = MISSING;
        values[12] = 3.0;
        let clim = climatology(&monthly(values));
        assert_eq!(clim[0], 3.0);
    }

    #[test]
    fn fully_missing_month_is_missing() {
        let mut values = vec![1.0; 24];
        values[1] = MISSING;
        values[13] = MISSING;
        let clim = climatology(&monthly(values));
        assert!(clim.is_missing_at(1));
        assert_eq!(clim[2], 1.0);
    }

    #[test]
    fn short_series_leaves_months_missing() {
        let clim = climatology(&monthly(vec![4.0, 5.0]));
        assert_eq!(clim[1], 5.0);
        assert!(clim.is_missing_at(2));
    }

    #[test]
    fn annual_series_has_one_period() {
        let axis = TimeAxis::new(
            Calendar::Annual,
            NaiveDate::from_ymd_opt(1991, 1, 1).unwrap(),
            4,
        )
        .unwrap();
        let ts = Timeseries::from_values(vec![1.0, 2.0, 3.0, MISSING], axis).unwrap();
        let clim = climatology(&ts);
        assert_eq!(clim.as_slice(), &[2.0]);
    }
}
