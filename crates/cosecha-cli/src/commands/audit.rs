//! Audit command: re-check a persisted clean dataset.

use super::{load_config, require_file};
use crate::error::{CliError, Result};
use crate::output;
use cosecha::dataset::{audit_path, AuditReport};
use std::path::Path;

/// Audits `file`; fails with a validation error when any check fails.
pub(crate) fn run(file: &Path, ceiling: Option<f64>, config: Option<&Path>, json: bool) -> Result<()> {
    require_file(file)?;
    let config = load_config(config)?;
    let ceiling = ceiling.unwrap_or(config.limits.efficiency_ceiling);
    if !ceiling.is_finite() || ceiling <= 0.0 {
        return Err(CliError::InvalidArgument(format!(
            "--ceiling must be a positive number, got {ceiling}"
        )));
    }

    let report = audit_path(file, ceiling)?;
    if json {
        output::json(&report)?;
    } else {
        print_report(&report);
    }

    if report.passed() {
        Ok(())
    } else {
        Err(CliError::ValidationFailed(failure_summary(&report)))
    }
}

fn print_report(report: &AuditReport) {
    output::section("Shape");
    output::kv("Rows", report.rows);
    output::kv("Columns", report.columns.len());

    output::section("Checks");
    if report.leakage.passed() {
        output::success("leakage: no forbidden columns");
    } else {
        output::fail(&format!(
            "leakage: {} present",
            report.leakage.forbidden_present.join(", ")
        ));
    }
    match report.min_ph {
        Some(ph) if report.ph_passed() => output::success(&format!("pH: minimum {ph:.2}")),
        Some(ph) => output::fail(&format!("pH: minimum {ph} is not positive")),
        None => output::warning("pH: column absent"),
    }
    if !report.target_present {
        output::fail("target: yield_per_ha column absent");
    } else if report.spike_rows == 0 {
        output::success(&format!(
            "yield: no rows at or above {}",
            report.efficiency_ceiling
        ));
    } else {
        output::fail(&format!(
            "yield: {} rows at or above {}",
            report.spike_rows, report.efficiency_ceiling
        ));
    }
    if let Some(summary) = report.yield_summary {
        output::kv(
            "Yield min/mean/max",
            format!("{:.3} / {:.3} / {:.3}", summary.min, summary.mean, summary.max),
        );
    }
}

fn failure_summary(report: &AuditReport) -> String {
    let mut failed = Vec::new();
    if !report.leakage.passed() {
        failed.push("leakage");
    }
    if !report.ph_passed() {
        failed.push("ph");
    }
    if !report.target_present {
        failed.push("target");
    }
    if report.spike_rows > 0 {
        failed.push("yield spike");
    }
    format!("audit checks failed: {}", failed.join(", "))
}
