//! Regression metrics for out-of-fold evaluation.
//!
//! R² is only defined when the reference targets are not all identical;
//! [`r_squared`] returns `None` for such degenerate folds instead of a
//! placeholder value so callers can exclude them from averages.

use crate::primitives::Vector;

/// Returns true when every value in `y` is the same.
///
/// An empty slice counts as constant.
#[must_use]
pub fn is_constant(y: &[f64]) -> bool {
    match y.first() {
        Some(first) => y.iter().all(|v| v == first),
        None => true,
    }
}

/// Computes the coefficient of determination (R²).
///
/// R² = 1 - (`SS_res` / `SS_tot`)
///
/// Returns `None` when the true values have no variance (all identical),
/// where R² is undefined.
///
/// # Examples
///
/// ```
/// use cosecha::metrics::r_squared;
/// use cosecha::primitives::Vector;
///
/// let y_true = Vector::from_slice(&[3.0, -0.5, 2.0, 7.0]);
/// let y_pred = Vector::from_slice(&[2.5, 0.0, 2.0, 8.0]);
/// let r2 = r_squared(&y_pred, &y_true).expect("targets vary");
/// assert!(r2 > 0.9);
///
/// let flat = Vector::from_slice(&[1.0, 1.0]);
/// assert!(r_squared(&y_pred.select(&[0, 1]), &flat).is_none());
/// ```
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[must_use]
pub fn r_squared(y_pred: &Vector<f64>, y_true: &Vector<f64>) -> Option<f64> {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");

    if is_constant(y_true.as_slice()) {
        return None;
    }

    let y_mean = y_true.mean();

    let ss_res: f64 = y_true
        .as_slice()
        .iter()
        .zip(y_pred.as_slice().iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    let ss_tot: f64 = y_true.as_slice().iter().map(|t| (t - y_mean).powi(2)).sum();

    Some(1.0 - (ss_res / ss_tot))
}

/// Computes the Mean Squared Error (MSE).
///
/// MSE = (1/n) * `Σ(y_true` - `y_pred)²`
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn mse(y_pred: &Vector<f64>, y_true: &Vector<f64>) -> f64 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let sum_sq_error: f64 = y_true
        .as_slice()
        .iter()
        .zip(y_pred.as_slice().iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    sum_sq_error / y_true.len() as f64
}

/// Computes the Mean Absolute Error (MAE).
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn mae(y_pred: &Vector<f64>, y_true: &Vector<f64>) -> f64 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let sum_abs_error: f64 = y_true
        .as_slice()
        .iter()
        .zip(y_pred.as_slice().iter())
        .map(|(t, p)| (t - p).abs())
        .sum();

    sum_abs_error / y_true.len() as f64
}

/// Computes the Root Mean Squared Error (RMSE).
///
/// RMSE = sqrt(MSE). Always defined for non-empty input.
///
/// # Examples
///
/// ```
/// use cosecha::metrics::rmse;
/// use cosecha::primitives::Vector;
///
/// let y_true = Vector::from_slice(&[1.0, 2.0]);
/// let y_pred = Vector::from_slice(&[1.0, 4.0]);
/// assert!((rmse(&y_pred, &y_true) - 2.0_f64.sqrt()).abs() < 1e-12);
/// ```
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn rmse(y_pred: &Vector<f64>, y_true: &Vector<f64>) -> f64 {
    mse(y_pred, y_true).sqrt()
}

#[cfg(test)]
#[path = "tests_regression_contract.rs"]
mod tests_regression_contract;
