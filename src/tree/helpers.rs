//! Helper functions for tree building algorithms.
//!
//! CART regression and gradient boosting share one grower. Each sample
//! carries a first-order statistic `g` and a weight `h`; a node is scored
//! by a function of the sums `(G, H)` and the split gain is
//! `score(left) + score(right) - score(parent)`.
//!
//! - CART: `g = y`, `h = 1`, `score = G² / H` (gain = SSE reduction)
//! - Boosting: `g = ŷ - y`, `h = 1`, `score = T(G, α)² / (H + λ)`

use super::{RegressionLeaf, RegressionNode, RegressionTreeNode};
use crate::error::{CosechaError, Result};
use crate::primitives::{Matrix, Vector};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Gains at or below this are treated as no improvement.
const MIN_GAIN: f64 = 1e-12;

/// Stopping rules for tree growth.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub min_child_weight: f64,
}

/// Per-sample statistics and node scoring used while growing one tree.
pub(crate) struct GrowContext<'a, S, L>
where
    S: Fn(f64, f64) -> f64,
    L: Fn(f64, f64) -> f64,
{
    pub x: &'a Matrix<f64>,
    pub grad: &'a [f64],
    pub hess: &'a [f64],
    pub features: &'a [usize],
    pub params: GrowParams,
    /// Node score from `(G, H)`
    pub score: S,
    /// Leaf value from `(G, H)`
    pub leaf: L,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

fn sums(indices: &[usize], grad: &[f64], hess: &[f64]) -> (f64, f64) {
    indices
        .iter()
        .fold((0.0, 0.0), |(g, h), &i| (g + grad[i], h + hess[i]))
}

/// Threshold strictly between two consecutive distinct values, falling back
/// to the lower one when the midpoint rounds up.
fn threshold_between(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi {
        mid
    } else {
        lo
    }
}

impl<S, L> GrowContext<'_, S, L>
where
    S: Fn(f64, f64) -> f64,
    L: Fn(f64, f64) -> f64,
{
    fn best_split(&self, indices: &[usize], parent_score: f64) -> Option<Split> {
        let p = &self.params;
        let (g_total, h_total) = sums(indices, self.grad, self.hess);
        let mut best: Option<(usize, f64, f64)> = None;

        let mut order = indices.to_vec();
        for &feature in self.features {
            order.sort_by(|&a, &b| self.x.get(a, feature).total_cmp(&self.x.get(b, feature)));

            let (mut g_left, mut h_left) = (0.0, 0.0);
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                g_left += self.grad[i];
                h_left += self.hess[i];

                let lo = self.x.get(i, feature);
                let hi = self.x.get(order[pos + 1], feature);
                if lo == hi {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = order.len() - n_left;
                if n_left < p.min_samples_leaf || n_right < p.min_samples_leaf {
                    continue;
                }
                let (g_right, h_right) = (g_total - g_left, h_total - h_left);
                if h_left < p.min_child_weight || h_right < p.min_child_weight {
                    continue;
                }

                let gain =
                    (self.score)(g_left, h_left) + (self.score)(g_right, h_right) - parent_score;
                if gain > MIN_GAIN && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, threshold_between(lo, hi), gain));
                }
            }
        }

        let (feature, threshold, gain) = best?;
        let (left, right) = indices
            .iter()
            .copied()
            .partition(|&i| self.x.get(i, feature) <= threshold);
        Some(Split {
            feature,
            threshold,
            gain,
            left,
            right,
        })
    }

    /// Grows a tree over `indices`, adding split gains to `importances`.
    pub fn grow(
        &self,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> RegressionTreeNode {
        let (g, h) = sums(indices, self.grad, self.hess);
        let make_leaf = || {
            RegressionTreeNode::Leaf(RegressionLeaf {
                value: (self.leaf)(g, h),
                n_samples: indices.len(),
            })
        };

        let p = &self.params;
        if indices.len() < p.min_samples_split
            || indices.len() < 2
            || p.max_depth.is_some_and(|max| depth >= max)
        {
            return make_leaf();
        }

        let Some(split) = self.best_split(indices, (self.score)(g, h)) else {
            return make_leaf();
        };

        importances[split.feature] += split.gain;
        let left = self.grow(&split.left, depth + 1, importances);
        let right = self.grow(&split.right, depth + 1, importances);
        RegressionTreeNode::Node(RegressionNode {
            feature_idx: split.feature,
            threshold: split.threshold,
            gain: split.gain,
            left: Box::new(left),
            right: Box::new(right),
        })
    }
}

/// Validates training inputs shared by every regressor.
pub(crate) fn check_fit_input(x: &Matrix<f64>, y: &Vector<f64>) -> Result<()> {
    let (n_rows, n_cols) = x.shape();
    if n_rows != y.len() {
        return Err(CosechaError::dimension_mismatch("samples in y", n_rows, y.len()));
    }
    if n_rows == 0 {
        return Err(CosechaError::empty_input("training samples"));
    }
    if n_cols == 0 {
        return Err(CosechaError::empty_input("feature columns"));
    }
    if !x.is_finite() || !y.as_slice().iter().all(|v| v.is_finite()) {
        return Err(CosechaError::Other(
            "training data contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}

/// Checks the prediction matrix width against the trained width.
pub(crate) fn check_predict_input(x: &Matrix<f64>, n_features: usize) -> Result<()> {
    if x.n_cols() != n_features {
        return Err(CosechaError::dimension_mismatch(
            "feature columns",
            n_features,
            x.n_cols(),
        ));
    }
    Ok(())
}

/// Seeded RNG, or an entropy-seeded one when no seed is given.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Random sample with replacement of size `n_samples`.
pub(crate) fn bootstrap_sample(n_samples: usize, rng: &mut StdRng) -> Vec<usize> {
    let dist = Uniform::from(0..n_samples);
    (0..n_samples).map(|_| dist.sample(rng)).collect()
}

/// Sorted sample without replacement of `ceil(fraction * n)` items (at least one).
pub(crate) fn subsample(n: usize, fraction: f64, rng: &mut StdRng) -> Vec<usize> {
    if fraction >= 1.0 || n == 0 {
        return (0..n).collect();
    }
    let amount = ((n as f64 * fraction).ceil() as usize).clamp(1, n);
    let mut picked = index::sample(rng, n, amount).into_vec();
    picked.sort_unstable();
    picked
}

/// Scales to sum to one; all-zero vectors stay zero.
pub(crate) fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

/// L1 soft threshold: `sign(G) * max(|G| - α, 0)`.
pub(crate) fn soft_threshold(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}
