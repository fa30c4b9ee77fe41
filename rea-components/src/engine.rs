//! REA for a single site
//!
//! [`ReaEngine`] runs the stages in order on the point series of one site:
//!
//! 1. climatologies of the observations, of each model's historical run and of each
//!    projection
//! 2. natural variability $\varepsilon$ from the observations
//! 3. model biases and projected changes (projection minus historical climatology)
//! 4. the reliability convergence loop
//! 5. the weighted ensemble change, series and uncertainties
//!
//! Models whose series do not fit the site's calendar, the observed time axis or the
//! ensemble's projection axis are excluded and reported; the site fails only when no model is left or the
//! observations are unusable.

use crate::components::{
    climatology, BiasCalculator, EnsembleAggregator, ReliabilityCombiner, VariabilityEstimator,
};
use crate::diagnostics::{record, PeriodIssue};
use log::{debug, warn};
use ndarray::Array2;
use rea_core::errors::{ReaError, ReaResult};
use rea_core::parameters::ReaParameters;
use rea_core::periodic::PeriodValues;
use rea_core::timeseries::{Calendar, FloatValue, Timeseries};
use rea_core::timeseries_collection::{EnsembleMember, TimeseriesCollection};
use serde::{Deserialize, Serialize};

/// The REA bundle of one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteReaResult {
    pub site: String,
    pub calendar: Calendar,
    /// Names of the models that took part, in row order of the matrices below
    pub models: Vec<String>,
    pub observed_climatology: PeriodValues,
    pub epsilon: PeriodValues,
    /// Floored absolute bias, `[model, period]`
    pub bias: Array2<FloatValue>,
    /// Projected change, `[model, period]`
    pub delta: Array2<FloatValue>,
    pub r_b: Array2<FloatValue>,
    pub r_d: Array2<FloatValue>,
    pub r: Array2<FloatValue>,
    pub change: PeriodValues,
    pub uncertainty: PeriodValues,
    pub series: Timeseries,
    pub series_uncertainty: PeriodValues,
    /// Recovered per-period failures
    pub issues: Vec<PeriodIssue>,
    /// Models excluded for this site, as [`ReaError::GridMismatch`]
    pub excluded: Vec<ReaError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaEngine {
    parameters: ReaParameters,
}

fn rows(calendar: Calendar, vectors: &[PeriodValues]) -> Array2<FloatValue> {
    Array2::from_shape_fn((vectors.len(), calendar.n_periods()), |(k, p)| vectors[k][p])
}

impl ReaEngine {
    /// Create an engine, validating the parameters
    pub fn from_parameters(parameters: ReaParameters) -> ReaResult<Self> {
        parameters.validate()?;
        Ok(Self { parameters })
    }

    pub fn parameters(&self) -> &ReaParameters {
        &self.parameters
    }

    /// Check one ensemble member against the site calendar, the observed axis and the
    /// projection axis of the first accepted member
    fn check_member(
        &self,
        site: &str,
        member: &EnsembleMember,
        observed: &Timeseries,
        projection_axis: Option<&Timeseries>,
    ) -> Result<(), ReaError> {
        let calendar = self.parameters.calendar();
        let mismatch = |reason: String| ReaError::GridMismatch {
            site: site.to_string(),
            model: member.name.to_string(),
            reason,
        };
        for (label, series) in [
            ("historical", member.historical),
            ("projection", member.projection),
        ] {
            if series.calendar() != calendar {
                return Err(mismatch(format!(
                    "{} run is {:?}, expected {:?}",
                    label,
                    series.calendar(),
                    calendar
                )));
            }
            if series.is_all_missing() {
                return Err(mismatch(format!("{} run has no values", label)));
            }
        }
        if member.historical.axis() != observed.axis() {
            return Err(mismatch(
                "historical time axis differs from the observations".to_string(),
            ));
        }
        if let Some(reference) = projection_axis {
            if reference.axis() != member.projection.axis() {
                return Err(mismatch(
                    "projection time axis differs from the rest of the ensemble".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Run REA for one site
    ///
    /// # Errors
    ///
    /// * [`ReaError::MissingObservations`] if there is no observed series or it has
    ///   no present value
    /// * [`ReaError::EmptyEnsemble`] if no model survives the compatibility checks
    pub fn compute_site(
        &self,
        site: &str,
        inputs: &TimeseriesCollection,
    ) -> ReaResult<SiteReaResult> {
        let calendar = self.parameters.calendar();
        let observed = match inputs.observed() {
            Some(observed) if !observed.is_all_missing() => observed,
            _ => {
                return Err(ReaError::MissingObservations {
                    site: site.to_string(),
                })
            }
        };
        if observed.calendar() != calendar {
            return Err(ReaError::Error(format!(
                "observations for '{}' are {:?}, expected {:?}",
                site,
                observed.calendar(),
                calendar
            )));
        }

        let mut excluded: Vec<ReaError> = inputs
            .unpaired_names()
            .into_iter()
            .map(|name| ReaError::GridMismatch {
                site: site.to_string(),
                model: name.to_string(),
                reason: "historical run and projection must both be present".to_string(),
            })
            .collect();

        let mut members: Vec<EnsembleMember> = Vec::new();
        for member in inputs.members() {
            let first_projection = members.first().map(|m| m.projection);
            match self.check_member(site, &member, observed, first_projection) {
                Ok(()) => members.push(member),
                Err(e) => excluded.push(e),
            }
        }
        for e in &excluded {
            warn!("{}", e);
        }
        if members.is_empty() {
            return Err(ReaError::EmptyEnsemble {
                site: site.to_string(),
            });
        }
        debug!("site '{}': {} ensemble members", site, members.len());

        let observed_climatology = climatology(observed);
        let epsilon = VariabilityEstimator::from_parameters(&self.parameters).epsilon(observed);
        debug!("site '{}': epsilon {:?}", site, epsilon.as_slice());

        let bias_calculator = BiasCalculator::from_parameters(&self.parameters);
        let mut biases = Vec::with_capacity(members.len());
        let mut deltas = Vec::with_capacity(members.len());
        for member in &members {
            let historical = climatology(member.historical);
            let projected = climatology(member.projection);
            biases.push(bias_calculator.bias(&historical, &observed_climatology)?);
            deltas.push(projected.zip_with(&historical, |p, h| p - h)?);
        }

        let reliabilities = ReliabilityCombiner::from_parameters(&self.parameters)
            .combine(&epsilon, &biases, &deltas)?;
        let projections: Vec<&Timeseries> = members.iter().map(|m| m.projection).collect();
        let ensemble = EnsembleAggregator::new().aggregate(&reliabilities.r, &deltas, &projections)?;

        let mut issues = reliabilities.issues;
        for issue in ensemble.issues {
            record(&mut issues, issue);
        }
        for issue in &issues {
            warn!("{}", issue.to_error(site));
        }

        Ok(SiteReaResult {
            site: site.to_string(),
            calendar,
            models: members.iter().map(|m| m.name.to_string()).collect(),
            observed_climatology,
            epsilon,
            bias: rows(calendar, &biases),
            delta: rows(calendar, &deltas),
            r_b: reliabilities.r_b,
            r_d: reliabilities.r_d,
            r: reliabilities.r,
            change: ensemble.change,
            uncertainty: ensemble.uncertainty,
            series: ensemble.series,
            series_uncertainty: ensemble.series_uncertainty,
            issues,
            excluded,
        })
    }
}
