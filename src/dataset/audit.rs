//! Audit of a persisted clean dataset file.
//!
//! Works on the raw cells rather than [`CleanDataset`](super::CleanDataset)
//! so that a leaky or malformed file can still be inspected and reported.

use super::{leakage_check, LeakageCheck, TARGET_COLUMN};
use crate::error::Result;
use crate::schema::{CanonicalField, RawTable};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Min/mean/max of the target column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldSummary {
    /// Smallest yield
    pub min: f64,
    /// Mean yield
    pub mean: f64,
    /// Largest yield
    pub max: f64,
}

/// Findings of a persisted-file audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Data rows
    pub rows: usize,
    /// Header of the file
    pub columns: Vec<String>,
    /// Forbidden columns present
    pub leakage: LeakageCheck,
    /// Smallest parseable pH, if the column exists
    pub min_ph: Option<f64>,
    /// Whether the target column exists
    pub target_present: bool,
    /// Ceiling used for the spike check
    pub efficiency_ceiling: f64,
    /// Rows whose yield is at or above the ceiling, or unparseable
    pub spike_rows: usize,
    /// Target distribution over parseable rows
    pub yield_summary: Option<YieldSummary>,
}

impl AuditReport {
    /// pH check: passes when every pH is positive (or there is no data).
    #[must_use]
    pub fn ph_passed(&self) -> bool {
        self.min_ph.map_or(true, |ph| ph > 0.0)
    }

    /// True when every check passes.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.leakage.passed() && self.ph_passed() && self.target_present && self.spike_rows == 0
    }
}

fn column(table: &RawTable, name: &str) -> Option<usize> {
    table
        .headers()
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn parsed(table: &RawTable, idx: usize) -> impl Iterator<Item = Option<f64>> + '_ {
    table
        .rows()
        .iter()
        .map(move |row| row[idx].trim().parse::<f64>().ok())
}

/// Audits a table read from a persisted clean dataset.
#[must_use]
pub fn audit(table: &RawTable, efficiency_ceiling: f64) -> AuditReport {
    let columns = table.headers().to_vec();
    let leakage = leakage_check(&columns);

    let min_ph = column(table, CanonicalField::Ph.as_str()).and_then(|idx| {
        parsed(table, idx)
            .map(|v| v.unwrap_or(f64::NAN))
            .reduce(|a, b| if b.is_nan() || b < a { b } else { a })
    });

    let target = column(table, TARGET_COLUMN);
    let (spike_rows, yield_summary) = match target {
        Some(idx) => {
            let values: Vec<Option<f64>> = parsed(table, idx).collect();
            let spikes = values
                .iter()
                .filter(|v| v.map_or(true, |y| y.is_nan() || y >= efficiency_ceiling))
                .count();
            let finite: Vec<f64> = values
                .iter()
                .flatten()
                .copied()
                .filter(|y| y.is_finite())
                .collect();
            let summary = (!finite.is_empty()).then(|| YieldSummary {
                min: finite.iter().copied().fold(f64::INFINITY, f64::min),
                mean: finite.iter().sum::<f64>() / finite.len() as f64,
                max: finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            });
            (spikes, summary)
        }
        None => (0, None),
    };

    let report = AuditReport {
        rows: table.n_rows(),
        columns,
        leakage,
        min_ph,
        target_present: target.is_some(),
        efficiency_ceiling,
        spike_rows,
        yield_summary,
    };

    if report.passed() {
        info!(rows = report.rows, "audit passed");
    } else {
        warn!(
            leakage = ?report.leakage.forbidden_present,
            min_ph = ?report.min_ph,
            spike_rows = report.spike_rows,
            target_present = report.target_present,
            "audit failed"
        );
    }
    report
}

/// Reads and audits a persisted clean dataset file.
///
/// # Errors
///
/// Returns an error if the file cannot be read as CSV.
pub fn audit_path<P: AsRef<Path>>(path: P, efficiency_ceiling: f64) -> Result<AuditReport> {
    let table = RawTable::from_csv_path(path)?;
    Ok(audit(&table, efficiency_ceiling))
}
