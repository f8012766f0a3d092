//! Feature-ablation baselines.
//!
//! An experiment drops a set of features from the clean dataset, runs the
//! grouped cross-validation evaluator on what remains and reports the
//! averaged scores with importances keyed by feature name. Identity columns
//! (state, district) and the target are never features, so they need not be
//! listed.

use crate::dataset::CleanDataset;
use crate::error::Result;
use crate::model_selection::{evaluate_dataset, GroupKFold, GroupedCvResult};
use crate::traits::Estimator;
use crate::tree::RandomForestRegressor;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Trees in the baseline forest.
pub const BASELINE_TREES: usize = 100;

/// Seed of the baseline forest.
pub const BASELINE_SEED: u64 = 42;

/// The baseline estimator: a 100-tree random forest seeded with 42.
#[must_use]
pub fn baseline_forest() -> RandomForestRegressor {
    RandomForestRegressor::new(BASELINE_TREES).with_random_state(BASELINE_SEED)
}

/// Scores of one ablation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Experiment label
    pub name: String,
    /// Features dropped before training
    pub dropped: Vec<String>,
    /// Features the model was trained on, in column order
    pub features: Vec<String>,
    /// Full grouped cross-validation result
    pub cv: GroupedCvResult,
}

impl ExperimentResult {
    /// Mean out-of-fold R², `None` when every fold was degenerate.
    #[must_use]
    pub fn mean_r2(&self) -> Option<f64> {
        self.cv.mean_r2
    }

    /// Mean out-of-fold RMSE.
    #[must_use]
    pub fn mean_rmse(&self) -> f64 {
        self.cv.mean_rmse
    }

    /// `(feature, importance)` pairs sorted by decreasing importance.
    #[must_use]
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let Some(importances) = &self.cv.mean_importances else {
            return Vec::new();
        };
        let mut ranked: Vec<(String, f64)> = self
            .features
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

/// Drops `features_to_drop` and cross-validates `estimator` on the rest.
///
/// # Errors
///
/// Returns [`CosechaError::ColumnNotFound`](crate::error::CosechaError::ColumnNotFound)
/// for a name that is not a feature column, and any error of the grouped
/// evaluator.
///
/// # Examples
///
/// ```no_run
/// use cosecha::dataset::CleanDataset;
/// use cosecha::experiment::{baseline_forest, run_experiment};
/// use cosecha::model_selection::GroupKFold;
///
/// let dataset = CleanDataset::load_csv("clean.csv").unwrap();
/// let cv = GroupKFold::new(5).unwrap();
/// let full = run_experiment(&dataset, "all features", &[] as &[&str], &baseline_forest(), &cv).unwrap();
/// let no_soil = run_experiment(&dataset, "no soil", &["clay", "sand", "silt"], &baseline_forest(), &cv).unwrap();
/// println!("{:?} vs {:?}", full.mean_r2(), no_soil.mean_r2());
/// ```
pub fn run_experiment<E, S>(
    dataset: &CleanDataset,
    name: &str,
    features_to_drop: &[S],
    estimator: &E,
    cv: &GroupKFold,
) -> Result<ExperimentResult>
where
    E: Estimator + Clone,
    S: AsRef<str>,
{
    let reduced = dataset.without_features(features_to_drop)?;
    let features: Vec<String> = reduced
        .feature_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    info!(
        experiment = name,
        n_features = features.len(),
        features = ?features,
        "running experiment"
    );

    let cv_result = evaluate_dataset(estimator, &reduced, cv, None)?;
    info!(
        experiment = name,
        mean_r2 = ?cv_result.mean_r2,
        mean_rmse = cv_result.mean_rmse,
        "experiment finished"
    );
    Ok(ExperimentResult {
        name: name.to_string(),
        dropped: features_to_drop
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect(),
        features,
        cv: cv_result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CleanRecord;
    use crate::error::CosechaError;
    use crate::schema::CanonicalField;

    /// Yield driven by pH only; temperature is noise.
    fn dataset() -> CleanDataset {
        let mut records = Vec::new();
        for d in 0..6 {
            for r in 0..4 {
                let ph = 5.0 + ((d * 4 + r) % 7) as f64 * 0.3;
                let temp = 20.0 + ((d * 5 + r * 3) % 9) as f64;
                records.push(CleanRecord {
                    state: Some("Kano".to_string()),
                    district: format!("district-{d}"),
                    features: vec![temp, ph],
                    yield_per_ha: 0.8 * ph - 2.0,
                });
            }
        }
        CleanDataset::new(
            true,
            vec![CanonicalField::AvgTemp, CanonicalField::Ph],
            records,
        )
        .expect("valid")
    }

    fn cv() -> GroupKFold {
        GroupKFold::new(3).expect("valid")
    }

    #[test]
    fn test_full_feature_experiment() {
        let forest = RandomForestRegressor::new(20).with_random_state(1);
        let result = run_experiment(&dataset(), "all", &[] as &[&str], &forest, &cv())
            .expect("runs");
        assert_eq!(result.features, vec!["avg_temp", "ph"]);
        assert_eq!(result.cv.folds.len(), 3);
        let ranked = result.ranked_importances();
        assert_eq!(ranked[0].0, "ph");
        assert!((ranked.iter().map(|(_, v)| v).sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dropping_the_driver_hurts() {
        let forest = RandomForestRegressor::new(20).with_random_state(1);
        let full = run_experiment(&dataset(), "all", &[] as &[&str], &forest, &cv())
            .expect("runs");
        let ablated = run_experiment(&dataset(), "no ph", &["ph"], &forest, &cv()).expect("runs");
        assert_eq!(ablated.features, vec!["avg_temp"]);
        assert_eq!(ablated.dropped, vec!["ph"]);
        assert!(ablated.mean_rmse() > full.mean_rmse());
    }

    #[test]
    fn test_unknown_feature_is_an_error() {
        let err = run_experiment(&dataset(), "bad", &["humidity"], &baseline_forest(), &cv())
            .expect_err("unknown column");
        assert!(matches!(err, CosechaError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_baseline_forest_settings() {
        let forest = baseline_forest();
        assert_eq!(forest.n_estimators(), BASELINE_TREES);
    }
}
