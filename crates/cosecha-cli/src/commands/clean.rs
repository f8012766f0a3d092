//! Clean command: raw survey CSV to leakage-free dataset.

use super::{load_config, require_file};
use crate::error::Result;
use crate::output;
use cosecha::dataset::CleaningReport;
use cosecha::pipeline::CleaningPipeline;
use std::path::Path;

/// Runs the cleaning pipeline on `input` and writes the clean CSV to `output_path`.
pub(crate) fn run(input: &Path, output_path: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    require_file(input)?;
    let config = load_config(config)?;
    let pipeline = CleaningPipeline::from_config(&config)?;

    let run = pipeline.run_path(input)?;
    run.dataset.save_csv(output_path)?;

    if json {
        return output::json(&run.report);
    }
    print_report(&run.report);
    output::info(&format!("clean dataset written to {}", output_path.display()));
    Ok(())
}

fn print_report(report: &CleaningReport) {
    output::section("Cleaning Report");
    output::kv("Original rows", report.original_rows);
    output::kv("Dropped rows", report.dropped_rows);
    output::kv("Final rows", report.final_rows);

    if !report.rejections.is_empty() {
        output::section("Rejections");
        for (reason, count) in &report.rejections {
            output::kv(reason.as_str(), count);
        }
    }

    output::section("Schema");
    output::kv("Columns", report.columns.join(", "));
    if report.leakage.passed() {
        output::success("no leakage columns in the clean schema");
    } else {
        output::fail(&format!(
            "leakage columns present: {}",
            report.leakage.forbidden_present.join(", ")
        ));
    }
    if !report.reconciles() {
        output::warning("row counts do not reconcile");
    }
}
