//! Tune command: hyperparameter search and model export.

use super::{fold_splitter, load_config, load_dataset};
use crate::error::{CliError, Result};
use crate::output;
use cosecha::artifact::ModelArtifact;
use cosecha::automl::{HyperparameterSearch, SearchOutcome, TrainingFit, ValidationScore};
use cosecha::tree::BoosterParams;
use serde::Serialize;
use std::path::Path;

/// Options of the tune command.
pub(crate) struct TuneOptions<'a> {
    pub(crate) trials: Option<usize>,
    pub(crate) folds: Option<usize>,
    pub(crate) seed: Option<u64>,
    pub(crate) config: Option<&'a Path>,
    pub(crate) json: bool,
}

#[derive(Serialize)]
struct TuneSummary<'a> {
    artifact: &'a Path,
    n_trials: usize,
    best_trial: usize,
    params: &'a BoosterParams,
    validation: &'a ValidationScore,
    training_fit: &'a TrainingFit,
}

/// Searches booster configurations on `file` and writes the artifact to `output_path`.
pub(crate) fn run(file: &Path, output_path: &Path, options: &TuneOptions<'_>) -> Result<()> {
    let mut config = load_config(options.config)?;
    if let Some(trials) = options.trials {
        if trials == 0 {
            return Err(CliError::InvalidArgument("--trials must be at least 1".to_string()));
        }
        config.search.n_trials = trials;
    }
    if let Some(seed) = options.seed {
        config.search.seed = seed;
    }
    let cv = fold_splitter(options.folds, &config)?;
    let dataset = load_dataset(file)?;

    let outcome = HyperparameterSearch::new(config.search, cv).run(&dataset)?;
    let artifact = ModelArtifact::from_outcome(&outcome, &dataset)?;
    artifact.save_json(output_path)?;

    if options.json {
        return output::json(&TuneSummary {
            artifact: output_path,
            n_trials: outcome.trials.len(),
            best_trial: outcome.best.index,
            params: &outcome.best.params,
            validation: &outcome.validation,
            training_fit: &outcome.training_fit,
        });
    }
    print_outcome(&outcome);
    output::info(&format!("model artifact written to {}", output_path.display()));
    Ok(())
}

fn print_outcome(outcome: &SearchOutcome) {
    output::section("Search");
    output::kv("Trials", outcome.trials.len());
    output::kv("Best trial", format!("#{} {}", outcome.best.index, outcome.best.trial));
    output::kv("Configuration", outcome.best.params);

    output::section("Validation (grouped cross-validation)");
    let validation = &outcome.validation;
    output::kv("RMSE", format!("{:.4} ± {:.4}", validation.rmse, validation.rmse_std));
    output::kv("MAE", format!("{:.4}", validation.mae));
    output::kv("R²", output::format_r2(validation.r2));
    output::kv("Folds", validation.n_folds);

    output::section("Training-set fit");
    let fit = &outcome.training_fit;
    output::kv("RMSE", format!("{:.4}", fit.rmse));
    output::kv("R²", output::format_r2(fit.r2));
    output::warning(&fit.note);
}
