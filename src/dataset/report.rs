//! Cleaning report emitted alongside the clean dataset.

use super::{leakage_check, CleanDataset, LeakageCheck};
use crate::validation::{RejectionReason, ValidationOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row accounting and schema summary for one pipeline run.
///
/// `dropped_rows` counts records failing at least one predicate (the union
/// of the per-reason sets), so `original_rows == final_rows + dropped_rows`
/// always holds while the `rejections` counts may sum to more than
/// `dropped_rows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Rows in the raw input
    pub original_rows: usize,
    /// Rows removed by the validity filter
    pub dropped_rows: usize,
    /// Rows in the clean dataset
    pub final_rows: usize,
    /// Records failing each predicate
    pub rejections: BTreeMap<RejectionReason, usize>,
    /// Zero-based raw row indices of the dropped records
    pub dropped_row_indices: Vec<usize>,
    /// Final column list
    pub columns: Vec<String>,
    /// Leakage check over `columns`
    pub leakage: LeakageCheck,
}

impl CleaningReport {
    /// Builds the report from the validation outcome and the built dataset.
    #[must_use]
    pub fn new(original_rows: usize, outcome: &ValidationOutcome, dataset: &CleanDataset) -> Self {
        let columns = dataset.columns();
        let leakage = leakage_check(&columns);
        Self {
            original_rows,
            dropped_rows: outcome.rejected.len(),
            final_rows: dataset.len(),
            rejections: outcome.breakdown(),
            dropped_row_indices: outcome.rejected.iter().map(|r| r.record.row).collect(),
            columns,
            leakage,
        }
    }

    /// True when the row counts add up.
    #[must_use]
    pub fn reconciles(&self) -> bool {
        self.original_rows == self.final_rows + self.dropped_rows
    }

    /// Count for one rejection reason (zero when absent).
    #[must_use]
    pub fn rejected_for(&self, reason: RejectionReason) -> usize {
        self.rejections.get(&reason).copied().unwrap_or(0)
    }
}
