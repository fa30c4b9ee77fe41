//! Weighted ensemble aggregator
//!
//! Combines the ensemble with the final reliabilities $R_{k,m}$:
//!
//! - REA change: $\bar{\Delta}_m = \sum_k R_{k,m} \Delta_{k,m} / \sum_k R_{k,m}$
//! - Uncertainty range: $2 \sqrt{\sum_k R_{k,m} (\Delta_{k,m} - \bar{\Delta}_m)^2 / \sum_k R_{k,m}}$
//! - REA series: the same weighted mean applied to every projected value, using the
//!   weights of the value's calendar period
//! - Series uncertainty: the uncertainty range of the per-model period means of the
//!   projection around the period mean of the REA series

use crate::components::reliability::weighted_mean;
use crate::diagnostics::{record, PeriodIssue};
use ndarray::{Array1, Array2};
use rea_core::errors::{ReaError, ReaResult};
use rea_core::periodic::PeriodValues;
use rea_core::timeseries::{is_missing, FloatValue, Timeseries, MISSING};
use rea_core::utils::stats::nan_mean;
use serde::{Deserialize, Serialize};

/// Ensemble outputs for one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleProjection {
    pub change: PeriodValues,
    pub uncertainty: PeriodValues,
    /// Weighted projection on the projection time axis
    pub series: Timeseries,
    pub series_uncertainty: PeriodValues,
    pub issues: Vec<PeriodIssue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnsembleAggregator;

impl EnsembleAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate the ensemble
    ///
    /// # Arguments
    ///
    /// * `r` - final reliabilities indexed `[model, period]`
    /// * `deltas` - projected change per model
    /// * `projections` - projected series per model, all on one time axis
    pub fn aggregate(
        &self,
        r: &Array2<FloatValue>,
        deltas: &[PeriodValues],
        projections: &[&Timeseries],
    ) -> ReaResult<EnsembleProjection> {
        let n_models = deltas.len();
        if projections.len() != n_models || r.nrows() != n_models {
            return Err(ReaError::LengthMismatch {
                expected: n_models,
                got: projections.len().min(r.nrows()),
            });
        }
        let first = projections.first().ok_or_else(|| {
            ReaError::Error("cannot aggregate an empty ensemble".to_string())
        })?;
        if let Some(other) = projections.iter().find(|p| p.axis() != first.axis()) {
            return Err(ReaError::Error(format!(
                "projections must share one time axis, got lengths {} and {}",
                first.len(),
                other.len()
            )));
        }
        let calendar = first.calendar();
        let n_periods = calendar.n_periods();
        if r.ncols() != n_periods {
            return Err(ReaError::LengthMismatch {
                expected: n_periods,
                got: r.ncols(),
            });
        }

        let mut issues = Vec::new();
        let weighted = |members: &[usize],
                        p: usize,
                        value: &dyn Fn(usize) -> FloatValue,
                        issues: &mut Vec<PeriodIssue>| {
            match weighted_mean(members, |k| r[[k, p]], value) {
                Ok(v) => v,
                Err(kind) => {
                    record(issues, PeriodIssue::new(p, kind));
                    MISSING
                }
            }
        };

        let weighted_members = |p: usize, value: &dyn Fn(usize) -> FloatValue| -> Vec<usize> {
            (0..n_models)
                .filter(|&k| !is_missing(r[[k, p]]) && !is_missing(value(k)))
                .collect()
        };

        let mut change = vec![MISSING; n_periods];
        let mut uncertainty = vec![MISSING; n_periods];
        for p in 0..n_periods {
            let delta = |k: usize| deltas[k][p];
            let members = weighted_members(p, &delta);
            if members.is_empty() {
                continue;
            }
            change[p] = weighted(&members, p, &delta, &mut issues);
            if is_missing(change[p]) {
                continue;
            }
            let spread = |k: usize| (deltas[k][p] - change[p]).powi(2);
            uncertainty[p] = 2.0 * weighted(&members, p, &spread, &mut issues).sqrt();
        }

        let axis = first.axis();
        let series_values: Array1<FloatValue> = (0..first.len())
            .map(|t| {
                let p = axis.period_at(t);
                let value = |k: usize| projections[k].values()[t];
                let members = weighted_members(p, &value);
                if members.is_empty() {
                    MISSING
                } else {
                    weighted(&members, p, &value, &mut issues)
                }
            })
            .collect();
        let series = Timeseries::new(series_values, first.shared_axis())?;

        let series_groups = series.group_by_period();
        let model_means: Vec<Vec<FloatValue>> = projections
            .iter()
            .map(|proj| proj.group_by_period().iter().map(|g| nan_mean(g)).collect())
            .collect();
        let mut series_uncertainty = vec![MISSING; n_periods];
        for p in 0..n_periods {
            let series_mean = nan_mean(&series_groups[p]);
            if is_missing(series_mean) {
                continue;
            }
            let model_mean = |k: usize| model_means[k][p];
            let members = weighted_members(p, &model_mean);
            if members.is_empty() {
                continue;
            }
            let spread = |k: usize| (model_means[k][p] - series_mean).powi(2);
            series_uncertainty[p] = 2.0 * weighted(&members, p, &spread, &mut issues).sqrt();
        }

        Ok(EnsembleProjection {
            change: PeriodValues::new(calendar, change)?,
            uncertainty: PeriodValues::new(calendar, uncertainty)?,
            series,
            series_uncertainty: PeriodValues::new(calendar, series_uncertainty)?,
            issues,
        })
    }
}
