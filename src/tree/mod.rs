//! Decision tree regressors and ensemble methods.
//!
//! This module implements:
//! - CART regression trees (variance reduction)
//! - Random forest regressor (bootstrap bagging)
//! - Gradient-boosted trees with L1/L2 leaf regularization
//!
//! # Example
//!
//! ```rust
//! use cosecha::prelude::*;
//!
//! let x = Matrix::from_vec(6, 1, vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]).unwrap();
//! let y = Vector::from_slice(&[1.0, 1.1, 0.9, 3.0, 3.1, 2.9]);
//!
//! let mut forest = RandomForestRegressor::new(20).with_random_state(42);
//! forest.fit(&x, &y).unwrap();
//! let predictions = forest.predict(&x).unwrap();
//! let predictions = predictions.as_slice();
//! assert!(predictions[0] < predictions[5]);
//! ```

mod gradient_boosting;
mod helpers;

pub use gradient_boosting::{BoosterParams, GradientBoostingRegressor};

use crate::error::{CosechaError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use helpers::{GrowContext, GrowParams};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Leaf node in a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionLeaf {
    /// Predicted value for this leaf
    pub value: f64,
    /// Number of training samples in this leaf
    pub n_samples: usize,
}

/// Internal node in a regression tree.
///
/// Samples with `x[feature_idx] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionNode {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f64,
    /// Objective improvement achieved by this split
    pub gain: f64,
    /// Left subtree
    pub left: Box<RegressionTreeNode>,
    /// Right subtree
    pub right: Box<RegressionTreeNode>,
}

/// A node in a regression tree (either internal node or leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegressionTreeNode {
    /// Internal decision node with split condition
    Node(RegressionNode),
    /// Leaf node with value prediction
    Leaf(RegressionLeaf),
}

impl RegressionTreeNode {
    /// Returns the depth of the tree rooted at this node.
    ///
    /// Leaf nodes have depth 0, internal nodes have depth 1 + max(left, right).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    /// Number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Node(node) => node.left.n_leaves() + node.right.n_leaves(),
        }
    }

    /// Routes one sample to its leaf value.
    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Self::Leaf(leaf) => return leaf.value,
                Self::Node(internal) => {
                    node = if row[internal.feature_idx] <= internal.threshold {
                        &internal.left
                    } else {
                        &internal.right
                    };
                }
            }
        }
    }
}

/// Decision tree regressor using the CART algorithm.
///
/// Splits minimize the within-node sum of squared errors; leaves predict
/// the mean of their training targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    tree: Option<RegressionTreeNode>,
    n_features: usize,
    importances: Vec<f64>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

impl DecisionTreeRegressor {
    /// Creates a new decision tree regressor with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: None,
            n_features: 0,
            importances: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the minimum number of samples required to split an internal node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets the minimum number of samples required to be at a leaf node.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// The fitted tree, if any.
    #[must_use]
    pub fn tree(&self) -> Option<&RegressionTreeNode> {
        self.tree.as_ref()
    }

    /// Fits on a subset of rows; used by the forest to avoid copying
    /// bootstrap matrices.
    fn fit_rows(&mut self, x: &Matrix<f64>, y: &Vector<f64>, rows: &[usize]) {
        let ones = vec![1.0; x.n_rows()];
        let features: Vec<usize> = (0..x.n_cols()).collect();
        let ctx = GrowContext {
            x,
            grad: y.as_slice(),
            hess: &ones,
            features: &features,
            params: GrowParams {
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                min_samples_leaf: self.min_samples_leaf,
                min_child_weight: 0.0,
            },
            score: |g: f64, h: f64| if h > 0.0 { g * g / h } else { 0.0 },
            leaf: |g: f64, h: f64| if h > 0.0 { g / h } else { 0.0 },
        };
        let mut importances = vec![0.0; x.n_cols()];
        self.tree = Some(ctx.grow(rows, 0, &mut importances));
        self.n_features = x.n_cols();
        self.importances = importances;
    }

    /// Raw impurity decrease per feature (not normalized).
    fn raw_importances(&self) -> &[f64] {
        &self.importances
    }
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for DecisionTreeRegressor {
    fn fit(&mut self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<()> {
        helpers::check_fit_input(x, y)?;
        let rows: Vec<usize> = (0..x.n_rows()).collect();
        self.fit_rows(x, y, &rows);
        Ok(())
    }

    fn predict(&self, x: &Matrix<f64>) -> Result<Vector<f64>> {
        let tree = self.tree.as_ref().ok_or(CosechaError::NotFitted {
            model: "DecisionTreeRegressor",
        })?;
        helpers::check_predict_input(x, self.n_features)?;
        Ok((0..x.n_rows())
            .map(|r| tree.predict_row(x.row_slice(r)))
            .collect::<Vec<_>>()
            .into())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.tree.as_ref()?;
        let mut importances = self.importances.clone();
        helpers::normalize(&mut importances);
        Some(importances)
    }
}

/// Random Forest Regressor.
///
/// Ensemble of decision tree regressors trained on bootstrap samples.
/// Predictions are averaged across all trees to reduce variance.
///
/// # Examples
///
/// ```
/// use cosecha::prelude::*;
///
/// let x = Matrix::from_vec(5, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// let y = Vector::from_slice(&[2.0, 4.0, 6.0, 8.0, 10.0]);
///
/// let mut rf = RandomForestRegressor::new(10).with_max_depth(5).with_random_state(7);
/// rf.fit(&x, &y).unwrap();
/// assert_eq!(rf.predict(&x).unwrap().len(), 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTreeRegressor>,
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_leaf: usize,
    random_state: Option<u64>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Creates a new Random Forest regressor with `n_estimators` trees.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_leaf: 1,
            random_state: None,
            n_features: 0,
        }
    }

    /// Sets the maximum depth for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the minimum samples per leaf for each tree.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Sets the random state for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Number of trees.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Estimator for RandomForestRegressor {
    fn fit(&mut self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<()> {
        helpers::check_fit_input(x, y)?;
        if self.n_estimators == 0 {
            return Err(CosechaError::invalid_param("n_estimators", 0, ">= 1"));
        }
        let n_samples = x.n_rows();
        // Per-tree seeds are drawn up front so the forest is identical
        // regardless of how rayon schedules the trees.
        let mut seeder = helpers::make_rng(self.random_state);
        let seeds: Vec<u64> = (0..self.n_estimators)
            .map(|_| rand::Rng::gen(&mut seeder))
            .collect();

        let template = DecisionTreeRegressor {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            ..DecisionTreeRegressor::new()
        };
        self.trees = seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = helpers::make_rng(Some(seed));
                let rows = helpers::bootstrap_sample(n_samples, &mut rng);
                let mut tree = template.clone();
                tree.fit_rows(x, y, &rows);
                tree
            })
            .collect();
        self.n_features = x.n_cols();
        Ok(())
    }

    fn predict(&self, x: &Matrix<f64>) -> Result<Vector<f64>> {
        if self.trees.is_empty() {
            return Err(CosechaError::NotFitted {
                model: "RandomForestRegressor",
            });
        }
        helpers::check_predict_input(x, self.n_features)?;

        let n_trees = self.trees.len() as f64;
        Ok((0..x.n_rows())
            .map(|r| {
                let row = x.row_slice(r);
                self.trees
                    .iter()
                    .filter_map(|t| t.tree.as_ref())
                    .map(|t| t.predict_row(row))
                    .sum::<f64>()
                    / n_trees
            })
            .collect::<Vec<_>>()
            .into())
    }

    /// Mean of the per-tree normalized impurity decrease, renormalized.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            let mut per_tree = tree.raw_importances().to_vec();
            helpers::normalize(&mut per_tree);
            for (t, v) in total.iter_mut().zip(per_tree) {
                *t += v;
            }
        }
        helpers::normalize(&mut total);
        Some(total)
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests_gbm_contract.rs"]
mod tests_gbm_contract;
