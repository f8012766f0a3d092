// =========================================================================
// FALSIFY-GBR: gradient-boosted regression contract (cosecha tree)
//
//   GBR-001: training loss decreases with more rounds
//   GBR-002: L2 penalty shrinks leaf weights toward zero
//   GBR-003: L1 penalty zeroes weak leaves entirely
//   GBR-004: importances are normalized and favour the informative feature
//   GBR-005: same seed, same model (with row/column sampling)
//   GBR-006: out-of-domain parameters rejected at fit
//
// References:
//   - Friedman (2001) "Greedy Function Approximation: A Gradient Boosting Machine"
//   - Chen & Guestrin (2016) "XGBoost: A Scalable Tree Boosting System"
// =========================================================================

use super::*;
use crate::metrics::mse;

fn linear_data(n: usize) -> (Matrix<f64>, Vector<f64>) {
    let mut data = Vec::with_capacity(n * 3);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let a = i as f64;
        let noise = ((i * 7) % 5) as f64;
        data.extend_from_slice(&[a, noise, (i % 2) as f64]);
        y.push(0.5 * a + 1.0);
    }
    (
        Matrix::from_vec(n, 3, data).expect("valid matrix"),
        Vector::from_vec(y),
    )
}

fn training_mse(model: &GradientBoostingRegressor, x: &Matrix<f64>, y: &Vector<f64>) -> f64 {
    mse(&model.predict(x).expect("predict"), y)
}

/// FALSIFY-GBR-001: more rounds never hurt the training fit here
#[test]
fn falsify_gbr_001_loss_decreases_with_rounds() {
    let (x, y) = linear_data(40);
    let mut few = GradientBoostingRegressor::new().with_n_estimators(5);
    let mut many = GradientBoostingRegressor::new().with_n_estimators(100);
    few.fit(&x, &y).expect("fit");
    many.fit(&x, &y).expect("fit");
    let (mse_few, mse_many) = (training_mse(&few, &x, &y), training_mse(&many, &x, &y));
    assert!(
        mse_many < mse_few,
        "FALSIFIED GBR-001: mse(100 rounds)={mse_many} >= mse(5 rounds)={mse_few}"
    );
}

/// FALSIFY-GBR-002: a large lambda keeps predictions near the base score
#[test]
fn falsify_gbr_002_l2_shrinks() {
    let (x, y) = linear_data(20);
    let mut loose = GradientBoostingRegressor::new().with_n_estimators(10);
    let mut tight = GradientBoostingRegressor::new()
        .with_n_estimators(10)
        .with_regularization(0.0, 1e6);
    loose.fit(&x, &y).expect("fit");
    tight.fit(&x, &y).expect("fit");

    let mean = y.mean();
    let spread = |m: &GradientBoostingRegressor| {
        m.predict(&x)
            .expect("predict")
            .as_slice()
            .iter()
            .map(|p| (p - mean).abs())
            .fold(0.0, f64::max)
    };
    assert!(
        spread(&tight) < spread(&loose) * 0.01,
        "FALSIFIED GBR-002: lambda=1e6 did not shrink predictions"
    );
}

/// FALSIFY-GBR-003: alpha above every gradient sum gives all-zero leaves
#[test]
fn falsify_gbr_003_l1_zeroes_leaves() {
    let (x, y) = linear_data(10);
    let mut model = GradientBoostingRegressor::new()
        .with_n_estimators(3)
        .with_regularization(1e9, 1.0);
    model.fit(&x, &y).expect("fit");
    let predictions = model.predict(&x).expect("predict");
    for p in predictions.as_slice() {
        assert!(
            (p - y.mean()).abs() < 1e-12,
            "FALSIFIED GBR-003: prediction {p} moved off the base score"
        );
    }
    assert_eq!(model.feature_importances(), Some(vec![0.0, 0.0, 0.0]));
}

/// FALSIFY-GBR-004: gain importances sum to one, informative feature first
#[test]
fn falsify_gbr_004_importances() {
    let (x, y) = linear_data(40);
    let mut model = GradientBoostingRegressor::new().with_n_estimators(30);
    model.fit(&x, &y).expect("fit");
    let importances = model.feature_importances().expect("fitted");
    assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(
        importances[0] > importances[1] && importances[0] > importances[2],
        "FALSIFIED GBR-004: importances {importances:?}"
    );
}

/// FALSIFY-GBR-005: seeded sampling is reproducible
#[test]
fn falsify_gbr_005_seeded() {
    let (x, y) = linear_data(30);
    let build = || {
        let mut m = GradientBoostingRegressor::new()
            .with_n_estimators(20)
            .with_subsample(0.6)
            .with_colsample_bytree(0.6)
            .with_seed(11);
        m.fit(&x, &y).expect("fit");
        m
    };
    assert_eq!(build(), build(), "FALSIFIED GBR-005: seeded fits differ");
}

/// FALSIFY-GBR-006: parameter domains enforced
#[test]
fn falsify_gbr_006_invalid_params() {
    let (x, y) = linear_data(10);
    let cases = [
        GradientBoostingRegressor::new().with_n_estimators(0),
        GradientBoostingRegressor::new().with_max_depth(0),
        GradientBoostingRegressor::new().with_learning_rate(0.0),
        GradientBoostingRegressor::new().with_subsample(1.5),
        GradientBoostingRegressor::new().with_colsample_bytree(0.0),
        GradientBoostingRegressor::new().with_regularization(-1.0, 1.0),
        GradientBoostingRegressor::new().with_regularization(0.0, f64::NAN),
    ];
    for mut model in cases {
        assert!(
            matches!(
                model.fit(&x, &y),
                Err(CosechaError::InvalidHyperparameter { .. })
            ),
            "FALSIFIED GBR-006: accepted {}",
            model.params()
        );
    }
}

#[test]
fn test_gbm_predict_before_fit() {
    let (x, _) = linear_data(3);
    assert!(matches!(
        GradientBoostingRegressor::new().predict(&x),
        Err(CosechaError::NotFitted { .. })
    ));
}

#[test]
fn test_gbm_depth_bounded() {
    let (x, y) = linear_data(30);
    let mut model = GradientBoostingRegressor::new()
        .with_n_estimators(5)
        .with_max_depth(2);
    model.fit(&x, &y).expect("fit");
    assert!(model.trees().iter().all(|t| t.depth() <= 2));
}

#[test]
fn test_booster_params_toml_defaults() {
    let params: BoosterParams = toml::from_str("max_depth = 5\nlearning_rate = 0.05").expect("toml");
    assert_eq!(params.max_depth, 5);
    assert_eq!(params.learning_rate, 0.05);
    assert_eq!(params.n_estimators, 100);
    assert!(params.validate().is_ok());
}
