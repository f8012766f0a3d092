//! Discrete search spaces and random search.
//!
//! Every parameter is a finite list of candidate values, so the space is a
//! mixed-radix grid: a configuration is identified by a single index into
//! the Cartesian product. Random search draws indices without replacement
//! until the grid is exhausted, then starts over.
//!
//! # References
//!
//! Bergstra & Bengio (2012). Random Search for Hyper-Parameter Optimization. JMLR.

use super::params::{BoosterParam, ParamKey};
use crate::error::{CosechaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// A concrete parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
}

impl ParamValue {
    /// Numeric value as f64.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// Non-negative integer value; `None` for floats and negatives.
    #[must_use]
    pub fn as_usize(self) -> Option<usize> {
        match self {
            Self::Int(v) => usize::try_from(v).ok(),
            Self::Float(_) => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Type-safe discrete search space.
///
/// Candidate lists are validated when added (and when deserialized): each
/// list must be non-empty and every value must lie in its key's domain.
///
/// # Example
///
/// ```
/// use cosecha::automl::{BoosterParam, SearchSpace};
///
/// let space = SearchSpace::new()
///     .add(BoosterParam::MaxDepth, [3_i64, 4, 5])
///     .unwrap()
///     .add(BoosterParam::LearningRate, [0.05, 0.1])
///     .unwrap();
///
/// assert_eq!(space.len(), 2);
/// assert_eq!(space.cardinality(), 6);
/// assert!(space.add(BoosterParam::Subsample, [1.5]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<ParamValue>>",
    into = "BTreeMap<String, Vec<ParamValue>>",
    bound = ""
)]
pub struct SearchSpace<P: ParamKey> {
    params: BTreeMap<P, Vec<ParamValue>>,
}

impl<P: ParamKey> Default for SearchSpace<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ParamKey> SearchSpace<P> {
    /// Create an empty search space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a parameter with its candidate values.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InvalidHyperparameter`] for an empty list or
    /// an out-of-domain value.
    pub fn add<I, V>(mut self, key: P, choices: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        let choices: Vec<ParamValue> = choices.into_iter().map(Into::into).collect();
        check_choices(key, &choices)?;
        self.params.insert(key, choices);
        Ok(self)
    }

    /// Number of parameters in the space.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if space is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Candidate values of one parameter.
    #[must_use]
    pub fn get(&self, key: &P) -> Option<&[ParamValue]> {
        self.params.get(key).map(Vec::as_slice)
    }

    /// Iterate over parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&P, &[ParamValue])> {
        self.params.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of distinct configurations (saturating).
    #[must_use]
    pub fn cardinality(&self) -> u128 {
        self.params
            .values()
            .fold(1_u128, |acc, v| acc.saturating_mul(v.len() as u128))
    }

    /// Configuration at a mixed-radix `index` (the first key is the most
    /// significant digit). Indices wrap modulo the cardinality.
    #[must_use]
    pub fn trial_at(&self, index: u128) -> Trial<P> {
        let mut rest = index % self.cardinality().max(1);
        let mut values = BTreeMap::new();
        for (key, choices) in self.params.iter().rev() {
            let radix = choices.len() as u128;
            values.insert(*key, choices[(rest % radix) as usize]);
            rest /= radix;
        }
        Trial { values }
    }

    /// Draws a uniformly random configuration index.
    pub fn sample_index(&self, rng: &mut impl Rng) -> u128 {
        self.params.values().fold(0_u128, |acc, choices| {
            acc.saturating_mul(choices.len() as u128) + rng.gen_usize(choices.len()) as u128
        })
    }

    /// Sample a random configuration.
    #[must_use]
    pub fn sample(&self, rng: &mut impl Rng) -> Trial<P> {
        let index = self.sample_index(rng);
        self.trial_at(index)
    }
}

impl SearchSpace<BoosterParam> {
    /// Default booster grid.
    ///
    /// - n_estimators: 100, 300, 500, 1000
    /// - max_depth: 3, 4, 5, 6
    /// - learning_rate: 0.01, 0.05, 0.1, 0.2
    /// - subsample / colsample_bytree: 0.6, 0.8, 1.0
    /// - reg_alpha: 0, 0.01, 0.1, 1
    /// - reg_lambda: 1, 1.5, 2, 5
    #[must_use]
    pub fn booster_default() -> Self {
        use BoosterParam as B;
        let ints = |v: &[i64]| v.iter().copied().map(ParamValue::Int).collect();
        let floats = |v: &[f64]| v.iter().copied().map(ParamValue::Float).collect();
        let params = BTreeMap::from([
            (B::NEstimators, ints(&[100, 300, 500, 1000])),
            (B::MaxDepth, ints(&[3, 4, 5, 6])),
            (B::LearningRate, floats(&[0.01, 0.05, 0.1, 0.2])),
            (B::Subsample, floats(&[0.6, 0.8, 1.0])),
            (B::ColsampleBytree, floats(&[0.6, 0.8, 1.0])),
            (B::RegAlpha, floats(&[0.0, 0.01, 0.1, 1.0])),
            (B::RegLambda, floats(&[1.0, 1.5, 2.0, 5.0])),
        ]);
        Self { params }
    }
}

fn check_choices<P: ParamKey>(key: P, choices: &[ParamValue]) -> Result<()> {
    if choices.is_empty() {
        return Err(CosechaError::invalid_param(
            key.name(),
            "[]",
            "at least one candidate value",
        ));
    }
    choices.iter().try_for_each(|&v| key.check(v))
}

fn parse_key<P: ParamKey>(name: &str) -> Result<P> {
    P::from_name(name)
        .ok_or_else(|| CosechaError::Config(format!("unknown hyperparameter '{name}'")))
}

impl<P: ParamKey> TryFrom<BTreeMap<String, Vec<ParamValue>>> for SearchSpace<P> {
    type Error = CosechaError;

    fn try_from(raw: BTreeMap<String, Vec<ParamValue>>) -> Result<Self> {
        let mut params = BTreeMap::new();
        for (name, choices) in raw {
            let key = parse_key::<P>(&name)?;
            check_choices(key, &choices)?;
            params.insert(key, choices);
        }
        Ok(Self { params })
    }
}

impl<P: ParamKey> From<SearchSpace<P>> for BTreeMap<String, Vec<ParamValue>> {
    fn from(space: SearchSpace<P>) -> Self {
        space
            .params
            .into_iter()
            .map(|(k, v)| (k.name().to_string(), v))
            .collect()
    }
}

/// A hyperparameter configuration to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, ParamValue>",
    into = "BTreeMap<String, ParamValue>",
    bound = ""
)]
pub struct Trial<P: ParamKey> {
    /// Parameter values for this trial.
    pub values: BTreeMap<P, ParamValue>,
}

impl<P: ParamKey> TryFrom<BTreeMap<String, ParamValue>> for Trial<P> {
    type Error = CosechaError;

    fn try_from(raw: BTreeMap<String, ParamValue>) -> Result<Self> {
        let values = raw
            .into_iter()
            .map(|(name, v)| Ok((parse_key::<P>(&name)?, v)))
            .collect::<Result<_>>()?;
        Ok(Self { values })
    }
}

impl<P: ParamKey> From<Trial<P>> for BTreeMap<String, ParamValue> {
    fn from(trial: Trial<P>) -> Self {
        trial
            .values
            .into_iter()
            .map(|(k, v)| (k.name().to_string(), v))
            .collect()
    }
}

impl<P: ParamKey> Trial<P> {
    /// Get a parameter value.
    #[must_use]
    pub fn get(&self, key: &P) -> Option<ParamValue> {
        self.values.get(key).copied()
    }

    /// Get parameter as f64.
    #[must_use]
    pub fn get_f64(&self, key: &P) -> Option<f64> {
        self.get(key).map(ParamValue::as_f64)
    }

    /// Get parameter as usize.
    #[must_use]
    pub fn get_usize(&self, key: &P) -> Option<usize> {
        self.get(key).and_then(ParamValue::as_usize)
    }
}

impl<P: ParamKey> fmt::Display for Trial<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k.name(), v))
            .collect();
        write!(f, "{{{}}}", params.join(", "))
    }
}

/// Search strategy trait for hyperparameter optimization.
pub trait SearchStrategy<P: ParamKey> {
    /// Generate candidate configurations to evaluate.
    fn suggest(&mut self, space: &SearchSpace<P>, n: usize) -> Vec<Trial<P>>;
}

/// Simple random number generator trait.
pub trait Rng {
    /// Next raw 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Generate random usize in range [0, len).
    fn gen_usize(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_u64() % len as u64) as usize
    }
}

/// Simple xorshift64 RNG for deterministic reproducibility.
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Create RNG with seed (zero is remapped, xorshift has no zero state).
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }
}

impl Rng for XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

/// Random search without replacement.
///
/// Configurations are not repeated until every point of the grid has been
/// drawn once; after that, drawing starts over and duplicates may appear.
///
/// # Example
///
/// ```
/// use cosecha::automl::{BoosterParam, RandomSearch, SearchSpace, SearchStrategy};
///
/// let space = SearchSpace::new()
///     .add(BoosterParam::MaxDepth, [3_i64, 4, 5, 6])
///     .unwrap();
///
/// let mut search = RandomSearch::new(10).with_seed(42);
/// let trials = search.suggest(&space, 4);
///
/// assert_eq!(trials.len(), 4);
/// let mut depths: Vec<_> = trials.iter().map(|t| t.get_usize(&BoosterParam::MaxDepth)).collect();
/// depths.sort();
/// depths.dedup();
/// assert_eq!(depths.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct RandomSearch {
    /// Total number of trials to run.
    pub n_iter: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
    rng: XorShift64,
    trials_generated: usize,
    seen: HashSet<u128>,
}

impl RandomSearch {
    /// Create random search with n iterations.
    #[must_use]
    pub fn new(n_iter: usize) -> Self {
        Self {
            n_iter,
            seed: 42,
            rng: XorShift64::new(42),
            trials_generated: 0,
            seen: HashSet::new(),
        }
    }

    /// Set random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = XorShift64::new(seed);
        self
    }

    /// Remaining trials to generate.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.n_iter.saturating_sub(self.trials_generated)
    }

    fn next_index<P: ParamKey>(&mut self, space: &SearchSpace<P>) -> u128 {
        if self.seen.len() as u128 >= space.cardinality() {
            self.seen.clear();
        }
        loop {
            let index = space.sample_index(&mut self.rng);
            if self.seen.insert(index) {
                return index;
            }
        }
    }
}

impl<P: ParamKey> SearchStrategy<P> for RandomSearch {
    fn suggest(&mut self, space: &SearchSpace<P>, n: usize) -> Vec<Trial<P>> {
        let n = n.min(self.remaining());
        let trials: Vec<Trial<P>> = (0..n)
            .map(|_| {
                let index = self.next_index(space);
                space.trial_at(index)
            })
            .collect();
        self.trials_generated += trials.len();
        trials
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
