// Regression metric contract: properties the cross-validation aggregate
// relies on (R² bounds, undefined R² on constant targets, RMSE >= MAE).

use super::*;
use crate::primitives::Vector;

#[test]
fn test_r2_perfect_predictions() {
    let y_true = Vector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let r2 = r_squared(&y_true, &y_true).expect("targets vary");
    assert!((r2 - 1.0).abs() < 1e-12, "R²={r2} for perfect predictions");
}

#[test]
fn test_r2_upper_bound() {
    let y_true = Vector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let y_pred = Vector::from_slice(&[1.1, 2.2, 2.8, 4.1, 4.9]);
    let r2 = r_squared(&y_pred, &y_true).expect("targets vary");
    assert!(r2 <= 1.0);
}

#[test]
fn test_r2_mean_predictor_is_zero() {
    let y_true = Vector::from_slice(&[1.0, 2.0, 3.0]);
    let y_pred = Vector::from_slice(&[2.0, 2.0, 2.0]);
    let r2 = r_squared(&y_pred, &y_true).expect("targets vary");
    assert!(r2.abs() < 1e-12);
}

#[test]
fn test_r2_can_be_negative() {
    let y_true = Vector::from_slice(&[1.0, 2.0, 3.0]);
    let y_pred = Vector::from_slice(&[3.0, 2.0, 1.0]);
    let r2 = r_squared(&y_pred, &y_true).expect("targets vary");
    assert!(r2 < 0.0);
}

#[test]
fn test_r2_undefined_for_constant_targets() {
    let y_true = Vector::from_slice(&[2.5, 2.5, 2.5]);
    let y_pred = Vector::from_slice(&[2.0, 2.5, 3.0]);
    assert_eq!(r_squared(&y_pred, &y_true), None);
}

#[test]
fn test_r2_undefined_for_single_sample() {
    let y = Vector::from_slice(&[4.0]);
    assert_eq!(r_squared(&y, &y), None);
}

#[test]
fn test_rmse_known_value() {
    let y_true = Vector::from_slice(&[0.0, 0.0, 0.0, 0.0]);
    let y_pred = Vector::from_slice(&[1.0, -1.0, 1.0, -1.0]);
    assert!((rmse(&y_pred, &y_true) - 1.0).abs() < 1e-12);
}

#[test]
fn test_rmse_defined_for_constant_targets() {
    let y_true = Vector::from_slice(&[3.0, 3.0]);
    let y_pred = Vector::from_slice(&[4.0, 2.0]);
    assert!((rmse(&y_pred, &y_true) - 1.0).abs() < 1e-12);
}

#[test]
fn test_rmse_dominates_mae() {
    let y_true = Vector::from_slice(&[1.0, 5.0, 2.0, 8.0]);
    let y_pred = Vector::from_slice(&[2.0, 3.0, 2.5, 4.0]);
    assert!(rmse(&y_pred, &y_true) >= mae(&y_pred, &y_true));
    assert!(r_squared(&y_pred, &y_true).is_some());
}

#[test]
fn test_is_constant() {
    assert!(is_constant(&[]));
    assert!(is_constant(&[1.5, 1.5]));
    assert!(!is_constant(&[1.5, 1.5000001]));
}

#[test]
#[should_panic(expected = "same length")]
fn test_length_mismatch_panics() {
    let _ = mse(&Vector::from_slice(&[1.0]), &Vector::from_slice(&[1.0, 2.0]));
}
