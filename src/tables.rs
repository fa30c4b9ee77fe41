//! Flat output tables and the run summary
//!
//! Rows are keyed by site name and 1-based period label so that they can be
//! written by any [`crate::sources::OutputSink`] without further reshaping.

use chrono::NaiveDate;
use rea_components::diagnostics::IssueKind;
use rea_components::engine::SiteReaResult;
use rea_core::errors::ReaError;
use rea_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};

/// Ensemble change of one site and period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub site: String,
    pub period: usize,
    pub change: FloatValue,
    pub uncertainty: FloatValue,
    pub series_uncertainty: FloatValue,
    pub epsilon: FloatValue,
}

/// One value of the weighted projection series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub site: String,
    pub date: NaiveDate,
    pub value: FloatValue,
}

/// Per-model diagnostics of one site and period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityRow {
    pub site: String,
    pub period: usize,
    pub model: String,
    pub bias: FloatValue,
    pub delta: FloatValue,
    pub r_b: FloatValue,
    pub r_d: FloatValue,
    pub r: FloatValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReaTables {
    pub changes: Vec<ChangeRow>,
    pub series: Vec<SeriesRow>,
    pub reliabilities: Vec<ReliabilityRow>,
}

impl ReaTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the rows of one site
    pub fn push_site(&mut self, result: &SiteReaResult) {
        let calendar = result.calendar;
        for p in 0..calendar.n_periods() {
            let period = calendar.period_label(p);
            self.changes.push(ChangeRow {
                site: result.site.clone(),
                period,
                change: result.change[p],
                uncertainty: result.uncertainty[p],
                series_uncertainty: result.series_uncertainty[p],
                epsilon: result.epsilon[p],
            });
            for (k, model) in result.models.iter().enumerate() {
                self.reliabilities.push(ReliabilityRow {
                    site: result.site.clone(),
                    period,
                    model: model.clone(),
                    bias: result.bias[[k, p]],
                    delta: result.delta[[k, p]],
                    r_b: result.r_b[[k, p]],
                    r_d: result.r_d[[k, p]],
                    r: result.r[[k, p]],
                });
            }
        }
        self.series
            .extend(result.series.iter().map(|(date, value)| SeriesRow {
                site: result.site.clone(),
                date,
                value,
            }));
    }

    /// Append every row of `other`, keeping its order
    pub fn extend(&mut self, other: ReaTables) {
        self.changes.extend(other.changes);
        self.series.extend(other.series);
        self.reliabilities.extend(other.reliabilities);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.series.is_empty() && self.reliabilities.is_empty()
    }

    /// Change rows of one site, in period order
    pub fn changes_for<'a>(&'a self, site: &'a str) -> impl Iterator<Item = &'a ChangeRow> + 'a {
        self.changes.iter().filter(move |row| row.site == site)
    }
}

/// A site, a model, or a model at one site that was left out of the run
///
/// `site` is `None` when a model's grids could not be loaded at all; `model` is
/// `None` when the whole site was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub site: Option<String>,
    pub model: Option<String>,
    pub reason: ReaError,
}

/// A period whose output was replaced by the missing marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthIssue {
    pub site: String,
    /// 1-based period label
    pub period: usize,
    pub kind: IssueKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Sites with results, in site-table order
    pub processed: Vec<String>,
    pub skips: Vec<SkipRecord>,
    pub issues: Vec<MonthIssue>,
}

impl RunSummary {
    /// Skips that removed a whole site
    pub fn skipped_sites(&self) -> impl Iterator<Item = &SkipRecord> {
        self.skips.iter().filter(|s| s.model.is_none())
    }

    pub fn extend(&mut self, other: RunSummary) {
        self.processed.extend(other.processed);
        self.skips.extend(other.skips);
        self.issues.extend(other.issues);
    }
}
