//! Type-safe hyperparameter keys.
//!
//! A search space is keyed by an enum rather than by strings, so a typo in a
//! parameter name is a compile error and each key carries its own domain.

use super::search::ParamValue;
use crate::error::{CosechaError, Result};
use crate::tree::BoosterParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A hyperparameter name usable as a [`SearchSpace`](super::SearchSpace) key.
///
/// `Ord` keeps spaces and trials in a stable order, so a seeded search
/// replays identically.
pub trait ParamKey: Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync {
    /// Canonical parameter name.
    fn name(&self) -> &'static str;

    /// Parses a canonical name back into a key.
    fn from_name(name: &str) -> Option<Self>;

    /// Checks one candidate value against this parameter's domain.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InvalidHyperparameter`] for out-of-domain values.
    fn check(&self, _value: ParamValue) -> Result<()> {
        Ok(())
    }
}

/// Tunable parameters of the gradient-boosted regressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoosterParam {
    /// Number of boosting rounds (integer, >= 1)
    NEstimators,
    /// Maximum tree depth (integer, >= 1)
    MaxDepth,
    /// Shrinkage, in (0, 1]
    LearningRate,
    /// Row sampling fraction, in (0, 1]
    Subsample,
    /// Column sampling fraction per tree, in (0, 1]
    ColsampleBytree,
    /// L1 leaf penalty, >= 0
    RegAlpha,
    /// L2 leaf penalty, >= 0
    RegLambda,
}

impl BoosterParam {
    /// Every tunable booster parameter.
    pub const ALL: [Self; 7] = [
        Self::NEstimators,
        Self::MaxDepth,
        Self::LearningRate,
        Self::Subsample,
        Self::ColsampleBytree,
        Self::RegAlpha,
        Self::RegLambda,
    ];

    fn is_integer(self) -> bool {
        matches!(self, Self::NEstimators | Self::MaxDepth)
    }

    /// Writes `value` into the matching field of `params`.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InvalidHyperparameter`] if the value is out of
    /// this parameter's domain.
    pub fn apply(self, value: ParamValue, params: &mut BoosterParams) -> Result<()> {
        self.check(value)?;
        match self {
            Self::NEstimators => params.n_estimators = value.as_usize().unwrap_or_default(),
            Self::MaxDepth => params.max_depth = value.as_usize().unwrap_or_default(),
            Self::LearningRate => params.learning_rate = value.as_f64(),
            Self::Subsample => params.subsample = value.as_f64(),
            Self::ColsampleBytree => params.colsample_bytree = value.as_f64(),
            Self::RegAlpha => params.reg_alpha = value.as_f64(),
            Self::RegLambda => params.reg_lambda = value.as_f64(),
        }
        Ok(())
    }
}

impl ParamKey for BoosterParam {
    fn name(&self) -> &'static str {
        match self {
            Self::NEstimators => "n_estimators",
            Self::MaxDepth => "max_depth",
            Self::LearningRate => "learning_rate",
            Self::Subsample => "subsample",
            Self::ColsampleBytree => "colsample_bytree",
            Self::RegAlpha => "reg_alpha",
            Self::RegLambda => "reg_lambda",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    fn check(&self, value: ParamValue) -> Result<()> {
        if self.is_integer() {
            return match value.as_usize() {
                Some(v) if v >= 1 => Ok(()),
                _ => Err(CosechaError::invalid_param(self.name(), value, "integer >= 1")),
            };
        }
        let v = value.as_f64();
        let ok = match self {
            Self::LearningRate | Self::Subsample | Self::ColsampleBytree => v > 0.0 && v <= 1.0,
            _ => v.is_finite() && v >= 0.0,
        };
        if ok {
            Ok(())
        } else {
            let constraint = match self {
                Self::RegAlpha | Self::RegLambda => "finite and >= 0",
                _ => "in (0, 1]",
            };
            Err(CosechaError::invalid_param(self.name(), value, constraint))
        }
    }
}

impl fmt::Display for BoosterParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
