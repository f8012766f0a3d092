//! Hyperparameter search for the gradient-boosted yield model.
//!
//! - [`SearchSpace`]: discrete, validated candidate lists keyed by
//!   [`BoosterParam`]
//! - [`RandomSearch`]: seeded sampling without replacement
//! - [`HyperparameterSearch`]: scores each trial with grouped
//!   cross-validation on one shared fold assignment and reports the winner's
//!   out-of-fold score as its accuracy
//!
//! # Example
//!
//! ```
//! use cosecha::automl::{BoosterParam, RandomSearch, SearchSpace, SearchStrategy};
//!
//! let space = SearchSpace::booster_default();
//! let mut search = RandomSearch::new(5).with_seed(42);
//! let trials = search.suggest(&space, 5);
//! assert_eq!(trials.len(), 5);
//! assert!(trials[0].get_usize(&BoosterParam::MaxDepth).is_some());
//! ```

mod controller;
pub mod params;
mod search;

pub use controller::{
    select_best, HyperparameterSearch, SearchConfig, SearchOutcome, SearchProgress, TrainingFit,
    TrialScore, ValidationScore,
};
pub use params::{BoosterParam, ParamKey};
pub use search::{
    ParamValue, RandomSearch, Rng, SearchSpace, SearchStrategy, Trial, XorShift64,
};
