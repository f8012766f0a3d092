//! Cosecha: leakage-free crop yield datasets and spatially grouped model
//! evaluation in pure Rust.
//!
//! Survey spreadsheets of district-level weather, soil and production
//! figures are renamed to one canonical schema, filtered against physical
//! validity limits, and turned into a clean dataset whose only
//! production-derived column is the `yield_per_ha` target. Models are then
//! scored with cross-validation grouped by district, so accuracy is always
//! measured on geography the model has not seen.
//!
//! # Quick Start
//!
//! ```
//! use cosecha::prelude::*;
//!
//! let csv = "\
//! State,District,Average_avg-Temp,Average-Min Temp,Average-max-temp,PH,Crop Yield,Hectare
//! Kano,Dala,27.1,21.0,33.2,6.5,120,80
//! Kano,Fagge,26.4,20.5,-273,6.2,90,60
//! Kano,Gwale,27.9,22.1,34.0,5.9,600,50
//! ";
//! let raw = RawTable::from_reader(csv.as_bytes()).unwrap();
//! let run = CleaningPipeline::default().run(&raw).unwrap();
//!
//! assert_eq!(run.report.original_rows, 3);
//! assert_eq!(run.report.final_rows, 1);
//! assert_eq!(run.report.rejected_for(RejectionReason::TemperatureOutlier), 1);
//! assert_eq!(run.report.rejected_for(RejectionReason::EfficiencyOutlier), 1);
//! assert!(run.report.leakage.passed());
//! assert!((run.dataset.records()[0].yield_per_ha - 1.5).abs() < 1e-9);
//! ```
//!
//! # Modules
//!
//! - [`schema`]: CSV ingestion, rename table and canonical records
//! - [`validation`]: Physical validity filter and derived-metric guard
//! - [`dataset`]: Leakage-safe dataset builder, cleaning report and file audit
//! - [`pipeline`]: The three cleaning stages composed in order
//! - [`model_selection`]: Group k-fold assignment and grouped cross-validation
//! - [`tree`]: Decision tree, random forest and gradient-boosted regressors
//! - [`automl`]: Hyperparameter search over grouped cross-validation
//! - [`experiment`]: Feature-ablation baselines
//! - [`artifact`]: Exported model artifact and single-row prediction
//! - [`config`]: TOML pipeline configuration
//! - [`metrics`]: Regression metrics

pub mod artifact;
pub mod automl;
pub mod config;
pub mod dataset;
pub mod error;
pub mod experiment;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod prelude;
pub mod primitives;
pub mod schema;
pub mod traits;
pub mod tree;
pub mod validation;

pub use error::{CosechaError, Result};
pub use primitives::{Matrix, Vector};
pub use traits::Estimator;
