//! Grouped cross-validation.
//!
//! This module provides tools for:
//! - Assigning whole groups (districts) to folds ([`GroupKFold`])
//! - Inspecting that assignment as a value ([`FoldAssignment`])
//! - Out-of-fold evaluation of an [`Estimator`] ([`cross_validate_grouped`])
//!
//! A group never appears on both sides of a split, so the reported error
//! measures generalization to unseen geography rather than interpolation
//! within districts the model has already seen.

mod cancel;

pub use cancel::CancellationToken;
pub(crate) use cancel::check as check_cancelled;

use crate::dataset::CleanDataset;
use crate::error::{CosechaError, Result};
use crate::metrics::{mae, r_squared, rmse};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Group K-Fold cross-validator.
///
/// Groups are ordered by record count (largest first, ties by first
/// appearance) and each is placed in the fold holding the fewest groups so
/// far, ties going to the fold with fewer records and then to the lower
/// index. Group counts per fold therefore differ by at most one, and the
/// assignment depends only on the input ordering and K.
///
/// # Example
///
/// ```rust
/// use cosecha::model_selection::GroupKFold;
///
/// let groups = ["a", "a", "b", "c", "c", "c", "d"];
/// let assignment = GroupKFold::new(2).unwrap().assign(&groups).unwrap();
///
/// for (train_idx, test_idx) in assignment.splits() {
///     for t in &test_idx {
///         assert!(!train_idx.iter().any(|i| groups[*i] == groups[*t]));
///     }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GroupKFoldRepr", into = "GroupKFoldRepr")]
pub struct GroupKFold {
    n_folds: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupKFoldRepr {
    #[serde(default = "default_n_folds")]
    n_folds: usize,
}

fn default_n_folds() -> usize {
    5
}

impl TryFrom<GroupKFoldRepr> for GroupKFold {
    type Error = CosechaError;

    fn try_from(repr: GroupKFoldRepr) -> Result<Self> {
        Self::new(repr.n_folds)
    }
}

impl From<GroupKFold> for GroupKFoldRepr {
    fn from(cv: GroupKFold) -> Self {
        Self {
            n_folds: cv.n_folds,
        }
    }
}

impl Default for GroupKFold {
    fn default() -> Self {
        Self {
            n_folds: default_n_folds(),
        }
    }
}

impl GroupKFold {
    /// Creates a grouped K-fold splitter.
    ///
    /// # Errors
    ///
    /// Returns an error if `n_folds < 2`.
    pub fn new(n_folds: usize) -> Result<Self> {
        if n_folds < 2 {
            return Err(CosechaError::invalid_param("n_folds", n_folds, ">= 2"));
        }
        Ok(Self { n_folds })
    }

    /// Number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Assigns every distinct group to exactly one fold.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InsufficientGroups`] when there are fewer
    /// distinct groups than folds.
    pub fn assign<S: AsRef<str>>(&self, groups: &[S]) -> Result<FoldAssignment> {
        // Distinct groups in first-appearance order with their sizes.
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        let mut distinct: Vec<(&str, usize)> = Vec::new();
        for g in groups {
            let g = g.as_ref();
            match index_of.get(g) {
                Some(&i) => distinct[i].1 += 1,
                None => {
                    index_of.insert(g, distinct.len());
                    distinct.push((g, 1));
                }
            }
        }

        if distinct.len() < self.n_folds {
            return Err(CosechaError::InsufficientGroups {
                n_groups: distinct.len(),
                n_folds: self.n_folds,
            });
        }

        let mut order: Vec<usize> = (0..distinct.len()).collect();
        order.sort_by(|&a, &b| distinct[b].1.cmp(&distinct[a].1));

        let mut fold_groups = vec![0usize; self.n_folds];
        let mut fold_samples = vec![0usize; self.n_folds];
        let mut group_fold = vec![0usize; distinct.len()];
        for gi in order {
            let fold = (0..self.n_folds)
                .min_by_key(|&f| (fold_groups[f], fold_samples[f], f))
                .unwrap_or(0);
            group_fold[gi] = fold;
            fold_groups[fold] += 1;
            fold_samples[fold] += distinct[gi].1;
        }

        let sample_folds = groups
            .iter()
            .map(|g| group_fold[index_of[g.as_ref()]])
            .collect();
        let group_folds = distinct
            .iter()
            .zip(&group_fold)
            .map(|((g, _), &f)| ((*g).to_string(), f))
            .collect();

        debug!(
            n_groups = distinct.len(),
            n_folds = self.n_folds,
            groups_per_fold = ?fold_groups,
            samples_per_fold = ?fold_samples,
            "assigned groups to folds"
        );

        Ok(FoldAssignment {
            n_folds: self.n_folds,
            group_folds,
            sample_folds,
        })
    }
}

/// Explicit group-to-fold mapping, plus the derived per-sample fold index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldAssignment {
    n_folds: usize,
    group_folds: Vec<(String, usize)>,
    sample_folds: Vec<usize>,
}

impl FoldAssignment {
    /// Number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Number of samples covered.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.sample_folds.len()
    }

    /// `(group, fold)` pairs in first-appearance order.
    #[must_use]
    pub fn group_folds(&self) -> &[(String, usize)] {
        &self.group_folds
    }

    /// Fold index of each sample.
    #[must_use]
    pub fn sample_folds(&self) -> &[usize] {
        &self.sample_folds
    }

    /// Fold holding a group out, if the group is known.
    #[must_use]
    pub fn fold_of(&self, group: &str) -> Option<usize> {
        self.group_folds
            .iter()
            .find(|(g, _)| g == group)
            .map(|(_, f)| *f)
    }

    /// Groups held out by a fold.
    #[must_use]
    pub fn held_out_groups(&self, fold: usize) -> Vec<&str> {
        self.group_folds
            .iter()
            .filter(|(_, f)| *f == fold)
            .map(|(g, _)| g.as_str())
            .collect()
    }

    /// Sample indices held out by a fold.
    #[must_use]
    pub fn test_indices(&self, fold: usize) -> Vec<usize> {
        (0..self.sample_folds.len())
            .filter(|&i| self.sample_folds[i] == fold)
            .collect()
    }

    /// Sample indices trained on for a fold.
    #[must_use]
    pub fn train_indices(&self, fold: usize) -> Vec<usize> {
        (0..self.sample_folds.len())
            .filter(|&i| self.sample_folds[i] != fold)
            .collect()
    }

    /// `(train_indices, test_indices)` for every fold, in fold order.
    #[must_use]
    pub fn splits(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        (0..self.n_folds)
            .map(|k| (self.train_indices(k), self.test_indices(k)))
            .collect()
    }
}

/// Out-of-fold scores for one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldScore {
    /// Fold index
    pub fold: usize,
    /// Training records
    pub n_train: usize,
    /// Held-out records
    pub n_test: usize,
    /// Held-out root mean squared error
    pub rmse: f64,
    /// Held-out mean absolute error
    pub mae: f64,
    /// Held-out R²; `None` for a degenerate fold (constant targets)
    pub r2: Option<f64>,
    /// Groups held out by this fold
    pub held_out_groups: Vec<String>,
    /// Feature importances of this fold's model, aligned to the feature
    /// columns; `None` if the model does not expose importances
    #[serde(default)]
    pub importances: Option<Vec<f64>>,
}

impl FoldScore {
    /// Whether the held-out targets had zero variance.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.r2.is_none()
    }
}

/// Aggregate of a grouped cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedCvResult {
    /// Per-fold scores, in fold order
    pub folds: Vec<FoldScore>,
    /// Mean RMSE over all folds
    pub mean_rmse: f64,
    /// Mean MAE over all folds
    pub mean_mae: f64,
    /// Mean R² over non-degenerate folds; `None` when every fold was
    /// degenerate
    pub mean_r2: Option<f64>,
    /// Element-wise mean of per-fold importances, aligned to the feature
    /// columns; `None` if the model does not expose importances
    pub mean_importances: Option<Vec<f64>>,
    /// Indices of folds excluded from the R² mean
    pub degenerate_folds: Vec<usize>,
}

impl GroupedCvResult {
    /// Standard deviation of per-fold RMSE.
    #[must_use]
    pub fn std_rmse(&self) -> f64 {
        if self.folds.is_empty() {
            return 0.0;
        }
        let variance = self
            .folds
            .iter()
            .map(|f| (f.rmse - self.mean_rmse).powi(2))
            .sum::<f64>()
            / self.folds.len() as f64;
        variance.sqrt()
    }

    fn aggregate(folds: Vec<FoldScore>) -> Self {
        let n = folds.len().max(1) as f64;
        let mean_rmse = folds.iter().map(|f| f.rmse).sum::<f64>() / n;
        let mean_mae = folds.iter().map(|f| f.mae).sum::<f64>() / n;

        let defined: Vec<f64> = folds.iter().filter_map(|f| f.r2).collect();
        let mean_r2 =
            (!defined.is_empty()).then(|| defined.iter().sum::<f64>() / defined.len() as f64);
        let degenerate_folds = folds
            .iter()
            .filter(|f| f.is_degenerate())
            .map(|f| f.fold)
            .collect();

        let mean_importances = folds
            .iter()
            .map(|f| f.importances.as_deref())
            .collect::<Option<Vec<&[f64]>>>()
            .and_then(|all| {
                let width = all.first()?.len();
                let mut mean = vec![0.0; width];
                for fold in &all {
                    for (m, v) in mean.iter_mut().zip(fold.iter()) {
                        *m += v;
                    }
                }
                let count = all.len() as f64;
                mean.iter_mut().for_each(|m| *m /= count);
                Some(mean)
            });

        Self {
            folds,
            mean_rmse,
            mean_mae,
            mean_r2,
            mean_importances,
            degenerate_folds,
        }
    }
}

/// Cross-validates an estimator over a precomputed fold assignment.
///
/// Folds train in parallel on clones of `estimator`. The optional token is
/// checked before and after each fold's training; a fold that sees it is
/// abandoned and the whole call returns [`CosechaError::Cancelled`].
///
/// # Errors
///
/// Returns an error on shape mismatch between `x`, `y` and the assignment,
/// if any fold fails to train, or on cancellation.
pub fn cross_validate_grouped<E>(
    estimator: &E,
    x: &Matrix<f64>,
    y: &Vector<f64>,
    assignment: &FoldAssignment,
    cancel: Option<&CancellationToken>,
) -> Result<GroupedCvResult>
where
    E: Estimator + Clone,
{
    let n_samples = x.n_rows();
    if y.len() != n_samples {
        return Err(CosechaError::dimension_mismatch("targets", n_samples, y.len()));
    }
    if assignment.n_samples() != n_samples {
        return Err(CosechaError::dimension_mismatch(
            "fold assignment samples",
            n_samples,
            assignment.n_samples(),
        ));
    }

    let folds: Vec<FoldScore> = (0..assignment.n_folds())
        .into_par_iter()
        .map(|fold| -> Result<FoldScore> {
            check_cancelled(cancel)?;
            let train_idx = assignment.train_indices(fold);
            let test_idx = assignment.test_indices(fold);
            let (x_train, y_train) = extract_samples(x, y, &train_idx);
            let (x_test, y_test) = extract_samples(x, y, &test_idx);

            let mut model = estimator.clone();
            model.fit(&x_train, &y_train)?;
            check_cancelled(cancel)?;
            let predictions = model.predict(&x_test)?;

            let score = FoldScore {
                fold,
                n_train: train_idx.len(),
                n_test: test_idx.len(),
                rmse: rmse(&predictions, &y_test),
                mae: mae(&predictions, &y_test),
                r2: r_squared(&predictions, &y_test),
                held_out_groups: assignment
                    .held_out_groups(fold)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                importances: model.feature_importances(),
            };
            debug!(
                fold,
                n_train = score.n_train,
                n_test = score.n_test,
                rmse = score.rmse,
                r2 = ?score.r2,
                "fold evaluated"
            );
            Ok(score)
        })
        .collect::<Result<Vec<_>>>()?;

    let result = GroupedCvResult::aggregate(folds);

    if !result.degenerate_folds.is_empty() {
        warn!(
            folds = ?result.degenerate_folds,
            "held-out targets constant; folds excluded from the R² mean"
        );
    }
    info!(
        n_folds = assignment.n_folds(),
        mean_rmse = result.mean_rmse,
        mean_r2 = ?result.mean_r2,
        "grouped cross-validation finished"
    );
    Ok(result)
}

/// Cross-validates on a clean dataset, grouping by district.
///
/// # Errors
///
/// Returns [`CosechaError::InsufficientGroups`] when the dataset has fewer
/// districts than folds, plus any error from [`cross_validate_grouped`].
pub fn evaluate_dataset<E>(
    estimator: &E,
    dataset: &CleanDataset,
    cv: &GroupKFold,
    cancel: Option<&CancellationToken>,
) -> Result<GroupedCvResult>
where
    E: Estimator + Clone,
{
    let assignment = cv.assign(&dataset.groups())?;
    cross_validate_grouped(
        estimator,
        &dataset.features(),
        &dataset.target(),
        &assignment,
        cancel,
    )
}

/// Gathers the rows at `indices`.
pub(crate) fn extract_samples(
    x: &Matrix<f64>,
    y: &Vector<f64>,
    indices: &[usize],
) -> (Matrix<f64>, Vector<f64>) {
    (x.select_rows(indices), y.select(indices))
}

#[cfg(test)]
#[path = "tests_group_kfold_contract.rs"]
mod tests_group_kfold_contract;
