//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use cosecha::prelude::*;
//! ```

pub use crate::artifact::{FieldParameters, ModelArtifact, YieldBand};
pub use crate::automl::{HyperparameterSearch, SearchConfig, SearchSpace};
pub use crate::config::PipelineConfig;
pub use crate::dataset::{CleanDataset, CleaningReport};
pub use crate::error::{CosechaError, Result};
pub use crate::experiment::{baseline_forest, run_experiment};
pub use crate::metrics::{mae, r_squared, rmse};
pub use crate::model_selection::{cross_validate_grouped, evaluate_dataset, GroupKFold};
pub use crate::pipeline::CleaningPipeline;
pub use crate::primitives::{Matrix, Vector};
pub use crate::schema::{CanonicalField, RawTable, RenameTable};
pub use crate::traits::Estimator;
pub use crate::tree::{DecisionTreeRegressor, GradientBoostingRegressor, RandomForestRegressor};
pub use crate::validation::{PhysicalValidityFilter, RejectionReason, ValidityLimits};
