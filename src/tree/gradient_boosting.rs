//! Gradient-boosted regression trees.
//!
//! Second-order boosting for squared error in the style of XGBoost: each
//! round fits a tree to the gradients `ŷ - y` (unit hessians) with leaf
//! weights `-T(G, α) / (H + λ)`, where `T` is the L1 soft threshold.

use super::helpers::{self, GrowContext, GrowParams};
use super::RegressionTreeNode;
use crate::error::{CosechaError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Hyperparameters of a [`GradientBoostingRegressor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoosterParams {
    /// Boosting rounds (trees)
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    /// Fraction of rows sampled (without replacement) per tree
    pub subsample: f64,
    /// Fraction of feature columns sampled per tree
    pub colsample_bytree: f64,
    /// L1 penalty on leaf weights
    pub reg_alpha: f64,
    /// L2 penalty on leaf weights
    pub reg_lambda: f64,
    /// Minimum hessian sum in a child
    pub min_child_weight: f64,
    /// Seed for row and column sampling
    pub seed: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 3,
            learning_rate: 0.1,
            subsample: 1.0,
            colsample_bytree: 1.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            seed: 42,
        }
    }
}

impl BoosterParams {
    /// Checks every value against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InvalidHyperparameter`] naming the first
    /// out-of-domain value.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(CosechaError::invalid_param("n_estimators", 0, ">= 1"));
        }
        if self.max_depth == 0 {
            return Err(CosechaError::invalid_param("max_depth", 0, ">= 1"));
        }
        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CosechaError::invalid_param(name, value, "in (0, 1]"));
            }
        }
        for (name, value) in [
            ("reg_alpha", self.reg_alpha),
            ("reg_lambda", self.reg_lambda),
            ("min_child_weight", self.min_child_weight),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CosechaError::invalid_param(name, value, "finite and >= 0"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for BoosterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n_estimators={}, max_depth={}, learning_rate={}, subsample={}, \
             colsample_bytree={}, reg_alpha={}, reg_lambda={}",
            self.n_estimators,
            self.max_depth,
            self.learning_rate,
            self.subsample,
            self.colsample_bytree,
            self.reg_alpha,
            self.reg_lambda
        )
    }
}

/// Gradient Boosting Regressor.
///
/// # Algorithm
///
/// 1. Initialize every prediction with the target mean
/// 2. For each boosting round:
///    - Sample rows (`subsample`) and columns (`colsample_bytree`)
///    - Compute gradients `g = ŷ - y`
///    - Grow a tree maximizing `T(G_L)²/(H_L+λ) + T(G_R)²/(H_R+λ) - T(G)²/(H+λ)`
///    - Update `ŷ += learning_rate * tree(x)`
///
/// Feature importances are the total split gain per feature, normalized.
///
/// # Example
///
/// ```
/// use cosecha::prelude::*;
///
/// let x = Matrix::from_vec(8, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
/// let y = Vector::from_slice(&[1.0, 1.0, 1.0, 1.0, 4.0, 4.0, 4.0, 4.0]);
///
/// let mut gbm = GradientBoostingRegressor::new()
///     .with_n_estimators(50)
///     .with_learning_rate(0.3)
///     .with_max_depth(2);
/// gbm.fit(&x, &y).unwrap();
/// let predictions = gbm.predict(&x).unwrap();
/// let predictions = predictions.as_slice();
/// assert!((predictions[0] - 1.0).abs() < 0.2);
/// assert!((predictions[7] - 4.0).abs() < 0.2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    params: BoosterParams,
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTreeNode>,
    gains: Vec<f64>,
}

impl GradientBoostingRegressor {
    /// Creates a regressor with default parameters.
    ///
    /// # Default Parameters
    ///
    /// - `n_estimators`: 100
    /// - `learning_rate`: 0.1
    /// - `max_depth`: 3
    /// - `reg_lambda`: 1.0
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(BoosterParams::default())
    }

    /// Creates a regressor from a parameter set.
    #[must_use]
    pub fn with_params(params: BoosterParams) -> Self {
        Self {
            params,
            base_score: 0.0,
            n_features: 0,
            trees: Vec::new(),
            gains: Vec::new(),
        }
    }

    /// Sets the number of boosting rounds.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.params.n_estimators = n_estimators;
        self
    }

    /// Sets the learning rate (shrinkage).
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.params.learning_rate = learning_rate;
        self
    }

    /// Sets the maximum depth of each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.params.max_depth = max_depth;
        self
    }

    /// Sets the row sampling fraction.
    #[must_use]
    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.params.subsample = subsample;
        self
    }

    /// Sets the per-tree column sampling fraction.
    #[must_use]
    pub fn with_colsample_bytree(mut self, colsample: f64) -> Self {
        self.params.colsample_bytree = colsample;
        self
    }

    /// Sets the L1 and L2 leaf penalties.
    #[must_use]
    pub fn with_regularization(mut self, alpha: f64, lambda: f64) -> Self {
        self.params.reg_alpha = alpha;
        self.params.reg_lambda = lambda;
        self
    }

    /// Sets the sampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    /// Hyperparameters.
    #[must_use]
    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    /// Fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[RegressionTreeNode] {
        &self.trees
    }

    /// Whether `fit` has run.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Number of features seen during fit.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score
            + self.params.learning_rate
                * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for GradientBoostingRegressor {
    fn fit(&mut self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<()> {
        helpers::check_fit_input(x, y)?;
        self.params.validate()?;

        let (n_samples, n_features) = x.shape();
        let p = self.params;
        let targets = y.as_slice();
        let base_score = y.mean();
        let mut predictions = vec![base_score; n_samples];
        let hess = vec![1.0; n_samples];
        let mut gains = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(p.n_estimators);
        let mut rng = helpers::make_rng(Some(p.seed));

        let grow = GrowParams {
            max_depth: Some(p.max_depth),
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_child_weight: p.min_child_weight,
        };
        let score = |g: f64, h: f64| {
            let t = helpers::soft_threshold(g, p.reg_alpha);
            t * t / (h + p.reg_lambda)
        };
        let leaf = |g: f64, h: f64| {
            let denom = h + p.reg_lambda;
            if denom > 0.0 {
                -helpers::soft_threshold(g, p.reg_alpha) / denom
            } else {
                0.0
            }
        };

        for round in 0..p.n_estimators {
            let rows = helpers::subsample(n_samples, p.subsample, &mut rng);
            let features = helpers::subsample(n_features, p.colsample_bytree, &mut rng);
            let grad: Vec<f64> = predictions
                .iter()
                .zip(targets)
                .map(|(pred, t)| pred - t)
                .collect();

            let ctx = GrowContext {
                x,
                grad: &grad,
                hess: &hess,
                features: &features,
                params: grow,
                score,
                leaf,
            };
            let tree = ctx.grow(&rows, 0, &mut gains);
            for (r, pred) in predictions.iter_mut().enumerate() {
                *pred += p.learning_rate * tree.predict_row(x.row_slice(r));
            }
            if round % 25 == 0 {
                debug!(round, leaves = tree.n_leaves(), "boosting round");
            }
            trees.push(tree);
        }

        self.base_score = base_score;
        self.n_features = n_features;
        self.trees = trees;
        self.gains = gains;
        Ok(())
    }

    fn predict(&self, x: &Matrix<f64>) -> Result<Vector<f64>> {
        if !self.is_fitted() {
            return Err(CosechaError::NotFitted {
                model: "GradientBoostingRegressor",
            });
        }
        helpers::check_predict_input(x, self.n_features)?;
        Ok((0..x.n_rows())
            .map(|r| self.predict_row(x.row_slice(r)))
            .collect::<Vec<_>>()
            .into())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        if !self.is_fitted() {
            return None;
        }
        let mut gains = self.gains.clone();
        helpers::normalize(&mut gains);
        Some(gains)
    }
}
