//! Evaluate command: random-forest baseline under grouped cross-validation.

use super::{fold_splitter, load_config, load_dataset};
use crate::error::{CliError, Result};
use crate::output;
use cosecha::experiment::{run_experiment, ExperimentResult};
use cosecha::tree::RandomForestRegressor;
use std::path::Path;

/// Options of the evaluate command.
pub(crate) struct EvaluateOptions<'a> {
    pub(crate) folds: Option<usize>,
    pub(crate) drop: &'a [String],
    pub(crate) trees: usize,
    pub(crate) seed: u64,
    pub(crate) config: Option<&'a Path>,
    pub(crate) json: bool,
}

/// Cross-validates a random forest on `file`, grouped by district.
pub(crate) fn run(file: &Path, options: &EvaluateOptions<'_>) -> Result<()> {
    if options.trees == 0 {
        return Err(CliError::InvalidArgument("--trees must be at least 1".to_string()));
    }
    let config = load_config(options.config)?;
    let cv = fold_splitter(options.folds, &config)?;
    let dataset = load_dataset(file)?;

    let name = if options.drop.is_empty() {
        "all features".to_string()
    } else {
        format!("without {}", options.drop.join(", "))
    };
    let forest = RandomForestRegressor::new(options.trees).with_random_state(options.seed);
    let result = run_experiment(&dataset, &name, options.drop, &forest, &cv)?;

    if options.json {
        return output::json(&result);
    }
    print_result(&result);
    Ok(())
}

fn print_result(result: &ExperimentResult) {
    output::section(&format!("Experiment: {}", result.name));
    output::kv("Features", result.features.join(", "));
    output::kv("Folds", result.cv.folds.len());
    output::kv("Mean R²", output::format_r2(result.mean_r2()));
    output::kv("Mean RMSE", format!("{:.4}", result.mean_rmse()));
    output::kv("Mean MAE", format!("{:.4}", result.cv.mean_mae));
    if !result.cv.degenerate_folds.is_empty() {
        output::warning(&format!(
            "folds {:?} had constant held-out yield and are excluded from R²",
            result.cv.degenerate_folds
        ));
    }

    output::section("Per-fold");
    for fold in &result.cv.folds {
        output::kv(
            &format!("Fold {}", fold.fold),
            format!(
                "rmse={:.4} r2={} held out: {}",
                fold.rmse,
                output::format_r2(fold.r2),
                fold.held_out_groups.join(", ")
            ),
        );
    }

    let ranked = result.ranked_importances();
    if !ranked.is_empty() {
        output::section("Feature Importances");
        for (feature, importance) in ranked {
            output::kv(&feature, format!("{importance:.4}"));
        }
    }
}
