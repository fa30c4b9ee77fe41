//! Recoverable per-period failures
//!
//! A period whose weights degenerate or whose arithmetic leaves the finite range
//! is reported here and its output becomes the missing marker. Other periods are
//! unaffected.

use rea_core::errors::ReaError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// The reliability weights of a period summed to zero
    DegenerateWeight,
    /// A non-finite intermediate value
    NumericOverflow,
}

/// A recovered failure for one period (zero-based index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodIssue {
    pub period: usize,
    pub kind: IssueKind,
}

impl PeriodIssue {
    pub fn new(period: usize, kind: IssueKind) -> Self {
        Self { period, kind }
    }

    /// The error this issue represents for `site`, with a 1-based period label
    pub fn to_error(&self, site: &str) -> ReaError {
        let site = site.to_string();
        let period = self.period + 1;
        match self.kind {
            IssueKind::DegenerateWeight => ReaError::DegenerateWeight { site, period },
            IssueKind::NumericOverflow => ReaError::NumericOverflow { site, period },
        }
    }
}

/// Append `issue` unless it is already recorded
pub(crate) fn record(issues: &mut Vec<PeriodIssue>, issue: PeriodIssue) {
    if !issues.contains(&issue) {
        issues.push(issue);
    }
}
