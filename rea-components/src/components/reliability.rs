//! Reliability factor combiner
//!
//! Each model $k$ receives, for each period $m$, a reliability
//!
//! $$ R_{k,m} = \max(R_{B,k,m} \cdot R_{D,k,m}, f) $$
//!
//! where $f$ is `epsilon_floor` and
//!
//! - the bias factor $R_B = \min(1, \varepsilon / B)$ rewards models whose bias $B$
//!   against the observations is small compared to natural variability,
//! - the convergence factor $R_D = \min(1, \varepsilon / D)$ rewards models whose
//!   projected change lies close to the ensemble consensus, $D$ being the distance
//!   between the model's change and the reference change.
//!
//! Both factors are floored at $f$ as well, which keeps every factor in $(0, 1]$
//! when $f > 0$.
//!
//! The consensus depends on the weights, so the computation is iterated a fixed
//! number of times: the first iteration uses the plain ensemble mean as reference,
//! later iterations use the weighted change of the previous iteration. A period
//! whose reference, distances or weighted change leave the finite range is
//! reported and its change and reliabilities are missing.

use crate::diagnostics::{record, IssueKind, PeriodIssue};
use log::trace;
use ndarray::Array2;
use rea_core::errors::{ReaError, ReaResult};
use rea_core::parameters::ReaParameters;
use rea_core::periodic::PeriodValues;
use rea_core::timeseries::{is_missing, Calendar, FloatValue, MISSING};
use serde::{Deserialize, Serialize};

/// Final reliability factors, indexed `[model, period]`
///
/// Entries of models that do not take part in a period (missing bias or change)
/// are missing, as are all entries of a period with missing $\varepsilon$.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reliabilities {
    pub r_b: Array2<FloatValue>,
    pub r_d: Array2<FloatValue>,
    pub r: Array2<FloatValue>,
    /// Weighted change of the last iteration
    pub change: PeriodValues,
    pub issues: Vec<PeriodIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityCombiner {
    iterations: usize,
    floor: FloatValue,
}

/// `min(1, epsilon / distance)` floored at `floor`
fn clipped_factor(epsilon: FloatValue, distance: FloatValue, floor: FloatValue) -> FloatValue {
    let factor = if distance <= epsilon {
        1.0
    } else {
        epsilon / distance
    };
    factor.max(floor)
}

impl ReliabilityCombiner {
    pub fn from_parameters(parameters: &ReaParameters) -> Self {
        Self::new(parameters.rea_iterations, parameters.epsilon_floor)
    }

    pub fn new(iterations: usize, floor: FloatValue) -> Self {
        Self { iterations, floor }
    }

    /// Bias reliability factor for one model and period
    pub fn bias_factor(&self, epsilon: FloatValue, bias: FloatValue) -> FloatValue {
        clipped_factor(epsilon, bias, self.floor)
    }

    /// Convergence reliability factor for one model and period
    pub fn distance_factor(&self, epsilon: FloatValue, distance: FloatValue) -> FloatValue {
        clipped_factor(epsilon, distance.max(self.floor), self.floor)
    }

    /// Run the convergence loop for every period
    ///
    /// # Arguments
    ///
    /// * `epsilon` - natural variability per period
    /// * `biases` - one bias vector per model (already floored)
    /// * `deltas` - one projected change vector per model (projection minus historical)
    pub fn combine(
        &self,
        epsilon: &PeriodValues,
        biases: &[PeriodValues],
        deltas: &[PeriodValues],
    ) -> ReaResult<Reliabilities> {
        if biases.len() != deltas.len() {
            return Err(ReaError::LengthMismatch {
                expected: deltas.len(),
                got: biases.len(),
            });
        }
        let calendar = epsilon.calendar();
        let n_periods = calendar.n_periods();
        let n_models = deltas.len();
        check_calendars(calendar, biases)?;
        check_calendars(calendar, deltas)?;

        let mut r_b = Array2::from_elem((n_models, n_periods), MISSING);
        let mut r_d = Array2::from_elem((n_models, n_periods), MISSING);
        let mut r = Array2::from_elem((n_models, n_periods), MISSING);
        let mut change = vec![MISSING; n_periods];
        let mut issues = Vec::new();

        for p in 0..n_periods {
            let eps = epsilon[p];
            if is_missing(eps) {
                continue;
            }
            let members: Vec<usize> = (0..n_models)
                .filter(|&k| !is_missing(biases[k][p]) && !is_missing(deltas[k][p]))
                .collect();
            if members.is_empty() {
                continue;
            }

            for &k in &members {
                r_b[[k, p]] = self.bias_factor(eps, biases[k][p]);
            }

            let mut reference = match weighted_mean(&members, |_| 1.0, |k| deltas[k][p]) {
                Ok(value) => value,
                Err(kind) => {
                    record(&mut issues, PeriodIssue::new(p, kind));
                    continue;
                }
            };
            let mut current = MISSING;

            for iteration in 0..self.iterations {
                let distances: Vec<FloatValue> = members
                    .iter()
                    .map(|&k| (deltas[k][p] - reference).abs())
                    .collect();
                if distances.iter().any(|d| !d.is_finite()) {
                    record(&mut issues, PeriodIssue::new(p, IssueKind::NumericOverflow));
                    current = MISSING;
                    break;
                }
                for (&k, &distance) in members.iter().zip(&distances) {
                    r_d[[k, p]] = self.distance_factor(eps, distance);
                    r[[k, p]] = (r_b[[k, p]] * r_d[[k, p]]).max(self.floor);
                }
                current = match weighted_mean(&members, |k| r[[k, p]], |k| deltas[k][p]) {
                    Ok(value) => value,
                    Err(kind) => {
                        record(&mut issues, PeriodIssue::new(p, kind));
                        MISSING
                    }
                };
                trace!("period {} iteration {} change {}", p + 1, iteration, current);
                if is_missing(current) {
                    break;
                }
                reference = current;
            }
            if is_missing(current) {
                for &k in &members {
                    r_d[[k, p]] = MISSING;
                    r[[k, p]] = MISSING;
                }
            }
            change[p] = current;
        }

        Ok(Reliabilities {
            r_b,
            r_d,
            r,
            change: PeriodValues::new(calendar, change)?,
            issues,
        })
    }
}

fn check_calendars(calendar: Calendar, vectors: &[PeriodValues]) -> ReaResult<()> {
    match vectors.iter().find(|v| v.calendar() != calendar) {
        Some(v) => Err(ReaError::Error(format!(
            "expected {:?} period vectors, got {:?}",
            calendar,
            v.calendar()
        ))),
        None => Ok(()),
    }
}

/// $\sum_k w_k x_k / \sum_k w_k$ over `members`
///
/// Fails with [`IssueKind::DegenerateWeight`] when the weights do not sum to a
/// positive number and with [`IssueKind::NumericOverflow`] when the result is not
/// finite.
pub(crate) fn weighted_mean(
    members: &[usize],
    weight: impl Fn(usize) -> FloatValue,
    value: impl Fn(usize) -> FloatValue,
) -> Result<FloatValue, IssueKind> {
    let (total, weighted) = members.iter().fold((0.0, 0.0), |(total, weighted), &k| {
        (total + weight(k), weighted + weight(k) * value(k))
    });
    if !total.is_finite() || !weighted.is_finite() {
        return Err(IssueKind::NumericOverflow);
    }
    if total <= 0.0 {
        return Err(IssueKind::DegenerateWeight);
    }
    let mean = weighted / total;
    if mean.is_finite() {
        Ok(mean)
    } else {
        Err(IssueKind::NumericOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn annual(v: f64) -> PeriodValues {
        PeriodValues::filled(Calendar::Annual, v)
    }

    fn combiner() -> ReliabilityCombiner {
        ReliabilityCombiner::from_parameters(&ReaParameters::default())
    }

    #[test]
    fn factors_clip_to_one_within_epsilon() {
        let c = combiner();
        assert_eq!(c.bias_factor(0.5, 0.1), 1.0);
        assert_eq!(c.bias_factor(1.0, 5.0), 0.2);
        assert_eq!(c.distance_factor(0.5, 1.0), 0.5);
        assert_eq!(c.distance_factor(1.0, 0.0), 1.0);
    }

    #[test]
    fn zero_epsilon_floors_factor() {
        assert_eq!(combiner().bias_factor(0.0, 0.3), 0.01);
    }

    #[test]
    fn two_symmetric_models() {
        // eps 0.5, small biases, changes 1 and 3
        let result = combiner()
            .combine(
                &annual(0.5),
                &[annual(0.1), annual(0.1)],
                &[annual(1.0), annual(3.0)],
            )
            .unwrap();
        assert_eq!(result.r_b[[0, 0]], 1.0);
        assert_eq!(result.r_d[[0, 0]], 0.5);
        assert_eq!(result.r[[1, 0]], 0.5);
        assert_eq!(result.change[0], 2.0);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn biased_model_is_down_weighted() {
        let result = combiner()
            .combine(
                &annual(1.0),
                &[annual(0.5), annual(5.0)],
                &[annual(2.0), annual(2.0)],
            )
            .unwrap();
        assert_eq!(result.r[[0, 0]], 1.0);
        assert_abs_diff_eq!(result.r[[1, 0]], 0.2, epsilon = 1e-15);
        assert_abs_diff_eq!(result.change[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn outlier_pulls_less_after_iterating() {
        let result = combiner()
            .combine(
                &annual(1.0),
                &[annual(0.1), annual(0.1), annual(0.1)],
                &[annual(0.0), annual(1.0), annual(10.0)],
            )
            .unwrap();
        let change = result.change[0];
        assert!(change.is_finite());
        assert!(change < 11.0 / 3.0);
        assert!((0.0..=10.0).contains(&change));
        assert!(result.r[[2, 0]] < result.r[[1, 0]]);
    }

    #[test]
    fn iteration_count_matters() {
        let eps = annual(1.0);
        let biases = [annual(0.1), annual(0.1), annual(0.1)];
        let deltas = [annual(0.0), annual(1.0), annual(10.0)];
        let once = ReliabilityCombiner::new(1, 0.01)
            .combine(&eps, &biases, &deltas)
            .unwrap();
        let many = ReliabilityCombiner::new(11, 0.01)
            .combine(&eps, &biases, &deltas)
            .unwrap();
        assert_ne!(once.change[0], many.change[0]);
    }

    #[test]
    fn weights_bounded() {
        let result = combiner()
            .combine(
                &annual(0.3),
                &[annual(0.01), annual(2.0), annual(50.0)],
                &[annual(-4.0), annual(0.5), annual(7.0)],
            )
            .unwrap();
        for w in result.r.iter().chain(result.r_b.iter()).chain(result.r_d.iter()) {
            assert!(*w > 0.0 && *w <= 1.0, "weight {} out of bounds", w);
        }
    }

    #[test]
    fn missing_delta_excludes_model_for_that_period() {
        let result = combiner()
            .combine(
                &annual(10.0),
                &[annual(0.1), annual(0.1)],
                &[annual(1.0), annual(MISSING)],
            )
            .unwrap();
        assert_eq!(result.change[0], 1.0);
        assert!(is_missing(result.r[[1, 0]]));
    }

    #[test]
    fn missing_epsilon_gives_missing_change() {
        let result = combiner()
            .combine(&annual(MISSING), &[annual(0.1)], &[annual(1.0)])
            .unwrap();
        assert!(result.change.is_missing_at(0));
        assert!(result.issues.is_empty());
    }

    #[test]
    fn zero_floor_and_zero_epsilon_degenerate() {
        let result = ReliabilityCombiner::new(11, 0.0)
            .combine(&annual(0.0), &[annual(1.0), annual(2.0)], &[annual(1.0), annual(3.0)])
            .unwrap();
        assert!(result.change.is_missing_at(0));
        assert_eq!(
            result.issues,
            vec![PeriodIssue::new(0, IssueKind::DegenerateWeight)]
        );
    }

    #[test]
    fn overflow_is_reported() {
        let result = combiner()
            .combine(
                &annual(1.0),
                &[annual(0.1), annual(0.1)],
                &[annual(f64::MAX), annual(f64::MAX)],
            )
            .unwrap();
        assert!(result.change.is_missing_at(0));
        assert!(is_missing(result.r[[0, 0]]) && is_missing(result.r[[1, 0]]));
        assert_eq!(
            result.issues,
            vec![PeriodIssue::new(0, IssueKind::NumericOverflow)]
        );
    }

    #[test]
    fn overflowing_distance_is_reported() {
        // The reference is finite but the outlier's distance to it is not
        let result = combiner()
            .combine(
                &annual(1.0),
                &[annual(0.1), annual(0.1), annual(0.1)],
                &[annual(f64::MAX), annual(-f64::MAX), annual(-f64::MAX)],
            )
            .unwrap();
        assert!(result.change.is_missing_at(0));
        assert!(result.r.iter().all(|w| is_missing(*w)));
        assert_eq!(
            result.issues,
            vec![PeriodIssue::new(0, IssueKind::NumericOverflow)]
        );
    }

    #[test]
    fn overflow_is_confined_to_its_period() {
        let monthly = |first: f64| {
            let mut values = vec![1.0; 12];
            values[0] = first;
            PeriodValues::new(Calendar::Monthly, values).unwrap()
        };
        let result = combiner()
            .combine(
                &PeriodValues::filled(Calendar::Monthly, 1.0),
                &[
                    PeriodValues::filled(Calendar::Monthly, 0.1),
                    PeriodValues::filled(Calendar::Monthly, 0.1),
                ],
                &[monthly(f64::MAX), monthly(f64::MAX)],
            )
            .unwrap();
        assert!(result.change.is_missing_at(0));
        for p in 1..12 {
            assert_eq!(result.change[p], 1.0);
        }
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn mismatched_inputs_rejected() {
        let result = combiner().combine(&annual(1.0), &[annual(0.1)], &[]);
        assert!(result.is_err());

        let monthly = PeriodValues::filled(Calendar::Monthly, 1.0);
        let result = combiner().combine(&annual(1.0), &[monthly.clone()], &[monthly]);
        assert!(result.is_err());
    }
}
