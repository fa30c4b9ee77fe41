//! Missing-aware descriptive statistics.
//!
//! Every function treats non-finite values as missing and skips them. Functions
//! that cannot produce a value return NaN rather than failing.

use num::Float;

/// Mean of the present values, NaN if none are present.
///
/// # Example
/// ```
/// use rea_core::utils::stats::nan_mean;
///
/// assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
/// assert!(nan_mean::<f64>(&[f64::NAN]).is_nan());
/// ```
pub fn nan_mean<F: Float>(values: &[F]) -> F {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((F::zero(), 0usize), |(s, c), v| (s + *v, c + 1));
    if count == 0 {
        F::nan()
    } else {
        sum / F::from(count).unwrap_or_else(F::nan)
    }
}

/// Largest minus smallest present value, NaN if none are present.
pub fn nan_range<F: Float>(values: &[F]) -> F {
    let mut present = values.iter().copied().filter(|v| v.is_finite());
    let Some(first) = present.next() else {
        return F::nan();
    };
    let (lo, hi) = present.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    hi - lo
}

/// Residuals of a least-squares line fitted against the index `1..=n`.
///
/// Missing inputs are excluded from the fit and stay missing in the output.
/// With fewer than two present values every output is NaN.
///
/// # Example
/// ```
/// use rea_core::utils::stats::detrend;
///
/// let d: Vec<f64> = detrend(&[1.0, 2.0, 3.0, 4.0]);
/// assert!(d.iter().all(|v| v.abs() < 1e-12));
/// ```
pub fn detrend<F: Float>(values: &[F]) -> Vec<F> {
    let points: Vec<(F, F)> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .filter_map(|(i, v)| F::from(i + 1).map(|x| (x, *v)))
        .collect();
    if points.len() < 2 {
        return vec![F::nan(); values.len()];
    }

    let n = F::from(points.len()).unwrap_or_else(F::nan);
    let (sx, sy) = points
        .iter()
        .fold((F::zero(), F::zero()), |(sx, sy), (x, y)| (sx + *x, sy + *y));
    let (mean_x, mean_y) = (sx / n, sy / n);
    let (sxy, sxx) = points.iter().fold((F::zero(), F::zero()), |(sxy, sxx), (x, y)| {
        let dx = *x - mean_x;
        (sxy + dx * (*y - mean_y), sxx + dx * dx)
    });
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    values
        .iter()
        .enumerate()
        .map(|(i, v)| match F::from(i + 1) {
            Some(x) if v.is_finite() => *v - (intercept + slope * x),
            _ => F::nan(),
        })
        .collect()
}

/// Trailing rolling mean.
///
/// Element `i` is the mean of the present values in `values[i + 1 - window ..= i]`
/// (clamped at the start), or NaN when fewer than `min_periods` values are present.
/// An empty window gives NaN everywhere.
pub fn rolling_mean<F: Float>(values: &[F], window: usize, min_periods: usize) -> Vec<F> {
    if window == 0 {
        return vec![F::nan(); values.len()];
    }
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let (sum, count) = values[start..=i]
                .iter()
                .filter(|v| v.is_finite())
                .fold((F::zero(), 0usize), |(s, c), v| (s + *v, c + 1));
            if count == 0 || count < min_periods {
                F::nan()
            } else {
                sum / F::from(count).unwrap_or_else(F::nan)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const NAN: f64 = f64::NAN;

    #[test]
    fn mean_skips_missing() {
        assert_eq!(nan_mean(&[2.0, NAN, 4.0, f64::INFINITY]), 3.0);
        assert!(nan_mean::<f64>(&[]).is_nan());
    }

    #[test]
    fn range_of_present_values() {
        assert_eq!(nan_range(&[3.0, NAN, -1.0, 2.0]), 4.0);
        assert_eq!(nan_range(&[5.0]), 0.0);
        assert!(nan_range(&[NAN, NAN]).is_nan());
    }

    #[test]
    fn detrend_of_a_line_is_zero() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let d = detrend(&values);
        assert_eq!(d.len(), 10);
        for v in d {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn detrend_keeps_oscillation_around_trend() {
        // 2x plus an alternating +-1
        let values: Vec<f64> = (1..=6)
            .map(|i| 2.0 * i as f64 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let d = detrend(&values);
        let mean: f64 = d.iter().sum::<f64>() / d.len() as f64;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
        assert!(d[0] < 0.0 && d[1] > 0.0);
    }

    #[test]
    fn detrend_skips_missing_points() {
        let d = detrend(&[1.0, NAN, 3.0, 4.0]);
        assert!(d[1].is_nan());
        assert_abs_diff_eq!(d[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d[3], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn detrend_needs_two_points() {
        assert!(detrend(&[1.0]).iter().all(|v| v.is_nan()));
        assert!(detrend(&[NAN, 2.0]).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rolling_mean_starts_at_min_periods() {
        let r = rolling_mean(&[1.0, 3.0, 5.0, 7.0], 10, 2);
        assert!(r[0].is_nan());
        assert_eq!(r[1], 2.0);
        assert_eq!(r[2], 3.0);
        assert_eq!(r[3], 4.0);
    }

    #[test]
    fn rolling_mean_window_slides() {
        let r = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 2, 2);
        assert_eq!(&r[1..], &[1.5, 2.5, 3.5, 4.5]);
    }

    #[test]
    fn rolling_mean_counts_only_present_values() {
        let r = rolling_mean(&[1.0, NAN, 3.0], 3, 2);
        assert!(r[1].is_nan());
        assert_eq!(r[2], 2.0);
    }

    #[test]
    fn rolling_mean_empty_window_is_nan() {
        let r = rolling_mean(&[1.0, 2.0], 0, 1);
        assert_eq!(r.len(), 2);
        assert!(r.iter().all(|v| v.is_nan()));
    }
}
