// =========================================================================
// FALSIFY-GKF: grouped K-fold contract (cosecha model_selection)
//
//   GKF-001: every group is held out by exactly one fold
//   GKF-002: train and held-out groups are disjoint within each fold
//   GKF-003: group counts per fold differ by at most one
//   GKF-004: fewer groups than folds is an error, never an empty fold
//   GKF-005: assignment is reproducible for the same input ordering
//   GKF-006: degenerate folds drop out of the R² mean only
//
// References:
//   - Roberts et al. (2017) "Cross-validation strategies for data with
//     temporal, spatial, hierarchical, or phylogenetic structure"
// =========================================================================

use super::*;
use std::collections::HashSet;

fn districts(n_groups: usize, per_group: usize) -> Vec<String> {
    (0..n_groups)
        .flat_map(|g| std::iter::repeat(format!("district-{g}")).take(per_group))
        .collect()
}

/// Predicts the training mean; reports a fixed importance vector.
#[derive(Clone, Default)]
struct MeanModel {
    mean: Option<f64>,
}

impl Estimator for MeanModel {
    fn fit(&mut self, _x: &Matrix<f64>, y: &Vector<f64>) -> Result<()> {
        if y.is_empty() {
            return Err(CosechaError::empty_input("targets"));
        }
        self.mean = Some(y.mean());
        Ok(())
    }

    fn predict(&self, x: &Matrix<f64>) -> Result<Vector<f64>> {
        let mean = self.mean.ok_or(CosechaError::NotFitted { model: "MeanModel" })?;
        Ok(Vector::from_vec(vec![mean; x.n_rows()]))
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.mean.map(|m| vec![m, 1.0])
    }
}

/// FALSIFY-GKF-001: every district held out exactly once (scenario: 10 districts, K=5)
#[test]
fn falsify_gkf_001_each_group_held_out_once() {
    let groups = districts(10, 3);
    let assignment = GroupKFold::new(5).expect("k").assign(&groups).expect("assign");

    let mut seen = HashSet::new();
    for fold in 0..5 {
        for g in assignment.held_out_groups(fold) {
            assert!(
                seen.insert(g.to_string()),
                "FALSIFIED GKF-001: {g} held out by more than one fold"
            );
        }
    }
    assert_eq!(seen.len(), 10, "FALSIFIED GKF-001: not every district held out");
}

/// FALSIFY-GKF-002: no district on both sides of any split
#[test]
fn falsify_gkf_002_train_test_groups_disjoint() {
    let groups = districts(10, 4);
    let assignment = GroupKFold::new(5).expect("k").assign(&groups).expect("assign");

    for (fold, (train, test)) in assignment.splits().iter().enumerate() {
        let train_groups: HashSet<&str> = train.iter().map(|&i| groups[i].as_str()).collect();
        let test_groups: HashSet<&str> = test.iter().map(|&i| groups[i].as_str()).collect();
        let overlap: Vec<_> = train_groups.intersection(&test_groups).collect();
        assert!(
            overlap.is_empty(),
            "FALSIFIED GKF-002: fold {fold} shares districts {overlap:?}"
        );
        assert_eq!(train.len() + test.len(), groups.len());
    }
}

/// FALSIFY-GKF-003: balanced group counts, even with unequal group sizes
#[test]
fn falsify_gkf_003_balanced_group_counts() {
    let mut groups = Vec::new();
    for (g, size) in [9, 1, 1, 4, 2, 7, 3].iter().enumerate() {
        groups.extend(std::iter::repeat(format!("g{g}")).take(*size));
    }
    let assignment = GroupKFold::new(3).expect("k").assign(&groups).expect("assign");

    let counts: Vec<usize> = (0..3).map(|k| assignment.held_out_groups(k).len()).collect();
    let max = counts.iter().max().copied().unwrap_or(0);
    let min = counts.iter().min().copied().unwrap_or(0);
    assert!(max - min <= 1, "FALSIFIED GKF-003: group counts {counts:?}");
}

/// FALSIFY-GKF-004: InsufficientGroups instead of an empty fold
#[test]
fn falsify_gkf_004_insufficient_groups() {
    let groups = districts(3, 5);
    let err = GroupKFold::new(5).expect("k").assign(&groups).expect_err("3 < 5");
    assert!(
        matches!(err, CosechaError::InsufficientGroups { n_groups: 3, n_folds: 5 }),
        "FALSIFIED GKF-004: got {err:?}"
    );
}

/// FALSIFY-GKF-005: identical input, identical assignment
#[test]
fn falsify_gkf_005_deterministic() {
    let groups = districts(8, 2);
    let cv = GroupKFold::new(4).expect("k");
    let a = cv.assign(&groups).expect("assign");
    let b = cv.assign(&groups).expect("assign");
    assert_eq!(a, b, "FALSIFIED GKF-005: assignment changed between runs");
}

#[test]
fn test_fold_count_validated() {
    assert!(GroupKFold::new(1).is_err());
    assert!(GroupKFold::new(0).is_err());
    assert_eq!(GroupKFold::default().n_folds(), 5);
}

#[test]
fn test_largest_group_placed_first() {
    let groups = ["small", "big", "big", "big", "mid", "mid"];
    let assignment = GroupKFold::new(3).expect("k").assign(&groups).expect("assign");
    assert_eq!(assignment.fold_of("big"), Some(0));
    assert_eq!(assignment.fold_of("mid"), Some(1));
    assert_eq!(assignment.fold_of("small"), Some(2));
    assert_eq!(assignment.fold_of("absent"), None);
    assert_eq!(assignment.sample_folds(), &[2, 0, 0, 0, 1, 1]);
}

#[test]
fn test_cross_validate_scores_every_fold() {
    let groups = districts(4, 3);
    let x = Matrix::from_vec(12, 2, (0..24).map(f64::from).collect()).expect("matrix");
    let y = Vector::from_vec((0..12).map(f64::from).collect());
    let assignment = GroupKFold::new(4).expect("k").assign(&groups).expect("assign");

    let result =
        cross_validate_grouped(&MeanModel::default(), &x, &y, &assignment, None).expect("cv");
    assert_eq!(result.folds.len(), 4);
    assert!(result.degenerate_folds.is_empty());
    assert!(result.mean_r2.is_some());
    for (k, fold) in result.folds.iter().enumerate() {
        assert_eq!(fold.fold, k);
        assert_eq!(fold.n_test, 3);
        assert_eq!(fold.n_train, 9);
        assert_eq!(fold.held_out_groups.len(), 1);
    }
    let importances = result.mean_importances.expect("model reports importances");
    assert_eq!(importances.len(), 2);
    assert!((importances[1] - 1.0).abs() < 1e-12);
}

#[test]
fn test_fold_importances_kept_alongside_mean() {
    let groups = districts(4, 3);
    let x = Matrix::from_vec(12, 2, (0..24).map(f64::from).collect()).expect("matrix");
    let y = Vector::from_vec((0..12).map(f64::from).collect());
    let assignment = GroupKFold::new(4).expect("k").assign(&groups).expect("assign");

    let result =
        cross_validate_grouped(&MeanModel::default(), &x, &y, &assignment, None).expect("cv");
    let per_fold: Vec<&Vec<f64>> = result
        .folds
        .iter()
        .map(|f| f.importances.as_ref().expect("fold reports importances"))
        .collect();
    assert_eq!(per_fold.len(), 4);

    // MeanModel's first importance is its training mean, so folds differ.
    let firsts: Vec<f64> = per_fold.iter().map(|v| v[0]).collect();
    assert!(firsts.windows(2).any(|w| (w[0] - w[1]).abs() > 1e-9));

    let mean = result.mean_importances.expect("every fold reports importances");
    let expected = firsts.iter().sum::<f64>() / 4.0;
    assert!((mean[0] - expected).abs() < 1e-12);
}

#[test]
fn test_fold_importances_absent_without_model_support() {
    #[derive(Clone, Default)]
    struct Opaque(MeanModel);

    impl Estimator for Opaque {
        fn fit(&mut self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<()> {
            self.0.fit(x, y)
        }

        fn predict(&self, x: &Matrix<f64>) -> Result<Vector<f64>> {
            self.0.predict(x)
        }
    }

    let groups = districts(3, 2);
    let x = Matrix::from_vec(6, 1, (0..6).map(f64::from).collect()).expect("matrix");
    let y = Vector::from_vec((0..6).map(f64::from).collect());
    let assignment = GroupKFold::new(3).expect("k").assign(&groups).expect("assign");

    let result = cross_validate_grouped(&Opaque::default(), &x, &y, &assignment, None).expect("cv");
    assert!(result.folds.iter().all(|f| f.importances.is_none()));
    assert!(result.mean_importances.is_none());
}

/// FALSIFY-GKF-006: constant held-out targets give r2 = None, not 0
#[test]
fn falsify_gkf_006_degenerate_fold_excluded_from_r2() {
    // Each district has a constant target, so every held-out fold is flat.
    let groups = districts(3, 2);
    let x = Matrix::from_vec(6, 1, vec![0.0; 6]).expect("matrix");
    let y = Vector::from_slice(&[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
    let assignment = GroupKFold::new(3).expect("k").assign(&groups).expect("assign");

    let result =
        cross_validate_grouped(&MeanModel::default(), &x, &y, &assignment, None).expect("cv");
    assert_eq!(result.degenerate_folds, vec![0, 1, 2]);
    assert!(
        result.mean_r2.is_none(),
        "FALSIFIED GKF-006: all-degenerate R² reported as {:?}",
        result.mean_r2
    );
    assert!(result.mean_rmse > 0.0);
}

#[test]
fn test_partially_degenerate_mean_uses_defined_folds_only() {
    let groups = ["a", "a", "b", "b"];
    let x = Matrix::from_vec(4, 1, vec![0.0; 4]).expect("matrix");
    // Fold holding "a" sees [1, 3]; fold holding "b" sees the constant [5, 5].
    let y = Vector::from_slice(&[1.0, 3.0, 5.0, 5.0]);
    let assignment = GroupKFold::new(2).expect("k").assign(&groups).expect("assign");
    let result =
        cross_validate_grouped(&MeanModel::default(), &x, &y, &assignment, None).expect("cv");

    let defined: Vec<f64> = result.folds.iter().filter_map(|f| f.r2).collect();
    assert_eq!(defined.len(), 1);
    assert_eq!(result.degenerate_folds.len(), 1);
    assert_eq!(result.mean_r2, Some(defined[0]));
}

#[test]
fn test_shape_mismatch_rejected() {
    let groups = districts(2, 2);
    let assignment = GroupKFold::new(2).expect("k").assign(&groups).expect("assign");
    let x = Matrix::from_vec(3, 1, vec![0.0; 3]).expect("matrix");
    let y = Vector::from_slice(&[1.0, 2.0, 3.0]);
    assert!(matches!(
        cross_validate_grouped(&MeanModel::default(), &x, &y, &assignment, None),
        Err(CosechaError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_cancelled_run_returns_no_partial_result() {
    let groups = districts(4, 2);
    let assignment = GroupKFold::new(4).expect("k").assign(&groups).expect("assign");
    let x = Matrix::from_vec(8, 1, vec![0.0; 8]).expect("matrix");
    let y = Vector::from_vec((0..8).map(f64::from).collect());
    let token = CancellationToken::new();
    token.cancel();
    assert!(matches!(
        cross_validate_grouped(&MeanModel::default(), &x, &y, &assignment, Some(&token)),
        Err(CosechaError::Cancelled)
    ));
}

#[test]
fn test_group_kfold_deserialize_validates() {
    let cv: GroupKFold = serde_json::from_str(r#"{"n_folds": 3}"#).expect("valid");
    assert_eq!(cv.n_folds(), 3);
    assert!(serde_json::from_str::<GroupKFold>(r#"{"n_folds": 1}"#).is_err());
    let default: GroupKFold = serde_json::from_str("{}").expect("defaults");
    assert_eq!(default.n_folds(), 5);
}

mod gkf_proptest_falsify {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// FALSIFY-GKF-001/002-prop: coverage and disjointness for random layouts
        #[test]
        fn falsify_gkf_prop_coverage_and_disjointness(
            labels in proptest::collection::vec(0u8..12, 12..60),
            k in 2usize..6,
        ) {
            let groups: Vec<String> = labels.iter().map(|l| format!("d{l}")).collect();
            let distinct: HashSet<&String> = groups.iter().collect();
            let cv = GroupKFold::new(k).expect("k >= 2");
            match cv.assign(&groups) {
                Err(CosechaError::InsufficientGroups { n_groups, .. }) => {
                    prop_assert!(n_groups < k);
                    prop_assert_eq!(n_groups, distinct.len());
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                Ok(assignment) => {
                    let mut test_counts = vec![0usize; groups.len()];
                    for (train, test) in assignment.splits() {
                        prop_assert!(!test.is_empty());
                        let train_groups: HashSet<&String> = train.iter().map(|&i| &groups[i]).collect();
                        for &i in &test {
                            test_counts[i] += 1;
                            prop_assert!(!train_groups.contains(&groups[i]));
                        }
                    }
                    prop_assert!(test_counts.iter().all(|&c| c == 1));
                }
            }
        }
    }
}
