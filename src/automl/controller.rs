//! Hyperparameter search over grouped cross-validation.
//!
//! Every trial is scored with the same [`FoldAssignment`], so trials are
//! directly comparable. The reported accuracy of the winner is its own
//! out-of-fold score; the score of the refit model on its training data is
//! kept in a separate, explicitly labelled field.

use super::params::BoosterParam;
use super::search::{RandomSearch, SearchSpace, SearchStrategy, Trial};
use crate::dataset::CleanDataset;
use crate::error::{CosechaError, Result};
use crate::metrics::{mae, r_squared, rmse};
use crate::model_selection::{
    check_cancelled, cross_validate_grouped, CancellationToken, FoldAssignment, GroupKFold,
    GroupedCvResult,
};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use crate::tree::{BoosterParams, GradientBoostingRegressor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Trial budget, seed and space of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Number of configurations to evaluate
    pub n_trials: usize,
    /// Seed for configuration sampling and for the booster's own sampling
    pub seed: u64,
    /// Candidate values per parameter
    pub space: SearchSpace<BoosterParam>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_trials: 50,
            seed: 42,
            space: SearchSpace::booster_default(),
        }
    }
}

impl SearchConfig {
    /// Creates a validated search configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InvalidHyperparameter`] when `n_trials` is zero.
    pub fn new(n_trials: usize, seed: u64, space: SearchSpace<BoosterParam>) -> Result<Self> {
        let config = Self {
            n_trials,
            seed,
            space,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-checks a deserialized configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InvalidHyperparameter`] when `n_trials` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.n_trials == 0 {
            return Err(CosechaError::invalid_param("search.n_trials", 0, ">= 1"));
        }
        Ok(())
    }

    /// Booster parameters for one trial: defaults, this search's seed, then
    /// the trial's values.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InvalidHyperparameter`] for an out-of-domain
    /// trial value.
    pub fn booster_params(&self, trial: &Trial<BoosterParam>) -> Result<BoosterParams> {
        let mut params = BoosterParams {
            seed: self.seed,
            ..BoosterParams::default()
        };
        for (key, value) in &trial.values {
            key.apply(*value, &mut params)?;
        }
        params.validate()?;
        Ok(params)
    }
}

/// One evaluated configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialScore {
    /// Position in draw order
    pub index: usize,
    /// Sampled values
    pub trial: Trial<BoosterParam>,
    /// Full booster configuration the trial ran with
    pub params: BoosterParams,
    /// Out-of-fold result
    pub cv: GroupedCvResult,
}

/// Cross-validated score of the selected configuration.
///
/// This is the number to report as the model's accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationScore {
    /// Mean out-of-fold RMSE
    pub rmse: f64,
    /// Standard deviation of per-fold RMSE
    pub rmse_std: f64,
    /// Mean out-of-fold MAE
    pub mae: f64,
    /// Mean out-of-fold R²; `None` when every fold was degenerate
    pub r2: Option<f64>,
    /// Fold count
    pub n_folds: usize,
}

impl From<&GroupedCvResult> for ValidationScore {
    fn from(cv: &GroupedCvResult) -> Self {
        Self {
            rmse: cv.mean_rmse,
            rmse_std: cv.std_rmse(),
            mae: cv.mean_mae,
            r2: cv.mean_r2,
            n_folds: cv.folds.len(),
        }
    }
}

/// Score of the refit model on its own training data.
///
/// Overfit by construction; never a generalization estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingFit {
    /// In-sample RMSE
    pub rmse: f64,
    /// In-sample MAE
    pub mae: f64,
    /// In-sample R²
    pub r2: Option<f64>,
    /// Fixed caveat carried alongside the numbers
    pub note: String,
}

impl TrainingFit {
    /// Caveat attached to every training-fit score.
    pub const NOTE: &'static str =
        "training-set fit of the refit model; not representative of generalization";

    fn measure(
        model: &GradientBoostingRegressor,
        x: &Matrix<f64>,
        y: &Vector<f64>,
    ) -> Result<Self> {
        let predictions = model.predict(x)?;
        Ok(Self {
            rmse: rmse(&predictions, y),
            mae: mae(&predictions, y),
            r2: r_squared(&predictions, y),
            note: Self::NOTE.to_string(),
        })
    }
}

impl fmt::Display for TrainingFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rmse={:.4}", self.rmse)?;
        if let Some(r2) = self.r2 {
            write!(f, ", r2={r2:.4}")?;
        }
        write!(f, " ({})", self.note)
    }
}

/// Trials that finished before the run ended.
#[derive(Debug, Clone)]
pub struct SearchProgress {
    /// Completed trials in draw order
    pub completed: Vec<TrialScore>,
    /// Whether cancellation discarded any trial
    pub interrupted: bool,
}

/// Result of a completed search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Selected trial
    pub best: TrialScore,
    /// Every trial in draw order
    pub trials: Vec<TrialScore>,
    /// Honest accuracy: the selected trial's cross-validated score
    pub validation: ValidationScore,
    /// In-sample score of the refit model, labelled as such
    pub training_fit: TrainingFit,
    /// Selected configuration refit on the whole dataset
    pub model: GradientBoostingRegressor,
}

/// Random search controller for the gradient-boosted regressor.
///
/// # Example
///
/// ```no_run
/// use cosecha::automl::{HyperparameterSearch, SearchConfig};
/// use cosecha::dataset::CleanDataset;
/// use cosecha::model_selection::GroupKFold;
///
/// let dataset = CleanDataset::load_csv("clean.csv").unwrap();
/// let search = HyperparameterSearch::new(SearchConfig::default(), GroupKFold::new(5).unwrap());
/// let outcome = search.run(&dataset).unwrap();
/// println!("validation RMSE {:.3}", outcome.validation.rmse);
/// ```
#[derive(Debug, Clone)]
pub struct HyperparameterSearch {
    config: SearchConfig,
    cv: GroupKFold,
    cancel: Option<CancellationToken>,
}

impl HyperparameterSearch {
    /// Creates a controller.
    #[must_use]
    pub fn new(config: SearchConfig, cv: GroupKFold) -> Self {
        Self {
            config,
            cv,
            cancel: None,
        }
    }

    /// Attaches a cancellation token checked between trials and folds.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Search configuration.
    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Configurations this controller will evaluate, in draw order.
    #[must_use]
    pub fn draw_trials(&self) -> Vec<Trial<BoosterParam>> {
        let n = self.config.n_trials;
        RandomSearch::new(n)
            .with_seed(self.config.seed)
            .suggest(&self.config.space, n)
    }

    /// Evaluates every drawn trial, keeping those that finished.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InsufficientGroups`] when the dataset has
    /// fewer districts than folds, or the first non-cancellation error of
    /// any trial.
    pub fn run_trials(&self, dataset: &CleanDataset) -> Result<SearchProgress> {
        self.config.validate()?;
        let x = dataset.features();
        let y = dataset.target();
        let assignment = self.cv.assign(&dataset.groups())?;
        let trials = self.draw_trials();
        info!(
            n_trials = trials.len(),
            n_folds = self.cv.n_folds(),
            n_samples = dataset.len(),
            "starting hyperparameter search"
        );

        let results: Vec<Result<TrialScore>> = trials
            .into_par_iter()
            .enumerate()
            .map(|(index, trial)| self.evaluate_trial(index, trial, &x, &y, &assignment))
            .collect();

        let mut completed = Vec::with_capacity(results.len());
        let mut interrupted = false;
        for result in results {
            match result {
                Ok(score) => completed.push(score),
                Err(CosechaError::Cancelled) => interrupted = true,
                Err(err) => return Err(err),
            }
        }
        if interrupted {
            warn!(
                completed = completed.len(),
                "search cancelled; unfinished trials discarded"
            );
        }
        Ok(SearchProgress {
            completed,
            interrupted,
        })
    }

    fn evaluate_trial(
        &self,
        index: usize,
        trial: Trial<BoosterParam>,
        x: &Matrix<f64>,
        y: &Vector<f64>,
        assignment: &FoldAssignment,
    ) -> Result<TrialScore> {
        check_cancelled(self.cancel.as_ref())?;
        let params = self.config.booster_params(&trial)?;
        let model = GradientBoostingRegressor::with_params(params);
        let cv = cross_validate_grouped(&model, x, y, assignment, self.cancel.as_ref())?;
        debug!(
            index,
            trial = %trial,
            rmse = cv.mean_rmse,
            r2 = ?cv.mean_r2,
            "trial evaluated"
        );
        Ok(TrialScore {
            index,
            trial,
            params,
            cv,
        })
    }

    /// Runs the search, selects the best trial and refits it on all data.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::Cancelled`] if the token fired before every
    /// trial finished, plus any error from [`Self::run_trials`] or the refit.
    pub fn run(&self, dataset: &CleanDataset) -> Result<SearchOutcome> {
        let progress = self.run_trials(dataset)?;
        if progress.interrupted {
            return Err(CosechaError::Cancelled);
        }
        let best = select_best(&progress.completed)
            .cloned()
            .ok_or_else(|| CosechaError::empty_input("completed trials"))?;

        let x = dataset.features();
        let y = dataset.target();
        let mut model = GradientBoostingRegressor::with_params(best.params);
        model.fit(&x, &y)?;
        let training_fit = TrainingFit::measure(&model, &x, &y)?;
        let validation = ValidationScore::from(&best.cv);

        info!(
            best = %best.trial,
            validation_rmse = validation.rmse,
            validation_r2 = ?validation.r2,
            training_rmse = training_fit.rmse,
            "search finished; training-set score is not a generalization estimate"
        );
        Ok(SearchOutcome {
            best,
            trials: progress.completed,
            validation,
            training_fit,
            model,
        })
    }
}

/// Lowest mean RMSE; ties go to the higher mean R², then the earlier draw.
#[must_use]
pub fn select_best(trials: &[TrialScore]) -> Option<&TrialScore> {
    let r2 = |t: &TrialScore| t.cv.mean_r2.unwrap_or(f64::NEG_INFINITY);
    trials.iter().min_by(|a, b| {
        a.cv.mean_rmse
            .total_cmp(&b.cv.mean_rmse)
            .then_with(|| r2(b).total_cmp(&r2(a)))
            .then_with(|| a.index.cmp(&b.index))
    })
}

#[cfg(test)]
#[path = "tests_search_contract.rs"]
mod tests_search_contract;
