//! Core trait for supervised regression estimators.
//!
//! The grouped cross-validation evaluator and the hyperparameter search only
//! see models through this contract.

use crate::error::Result;
use crate::primitives::{Matrix, Vector};

/// Primary trait for supervised regression estimators.
///
/// Estimators implement fit/predict/score following sklearn conventions.
/// `Clone` produces an unfitted-equivalent copy for each fold; `Send + Sync`
/// lets folds train on worker threads.
///
/// # Examples
///
/// ```
/// use cosecha::prelude::*;
///
/// let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// let y = Vector::from_slice(&[1.0, 1.0, 5.0, 5.0]);
///
/// let mut tree = DecisionTreeRegressor::new().with_max_depth(1);
/// tree.fit(&x, &y).unwrap();
/// let predictions = tree.predict(&x).unwrap();
/// assert_eq!(predictions.as_slice(), &[1.0, 1.0, 5.0, 5.0]);
/// ```
pub trait Estimator: Send + Sync {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (dimension mismatch, empty data, etc.).
    fn fit(&mut self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<()>;

    /// Predicts target values for input data.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or the feature count differs.
    fn predict(&self, x: &Matrix<f64>) -> Result<Vector<f64>>;

    /// Computes R² on the given data; `None` if `y` is constant.
    ///
    /// # Errors
    ///
    /// Returns an error if prediction fails.
    fn score(&self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<Option<f64>> {
        let predictions = self.predict(x)?;
        Ok(crate::metrics::r_squared(&predictions, y))
    }

    /// Per-feature importances aligned to the training columns, if the
    /// model exposes them.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}
