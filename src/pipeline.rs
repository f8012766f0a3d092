//! Cleaning pipeline: normalize, validate, build.
//!
//! Each stage is a pure function of its input. The pipeline only wires them
//! together in order and assembles the cleaning report; no table is mutated
//! in place between stages.

use crate::config::PipelineConfig;
use crate::dataset::{CleanDataset, CleaningReport, DatasetBuilder};
use crate::error::Result;
use crate::schema::{RawTable, RenameTable, SchemaNormalizer};
use crate::validation::{PhysicalValidityFilter, ValidationOutcome, ValidityLimits};
use std::path::Path;
use tracing::{info, warn};

/// Output of one cleaning run.
#[derive(Debug, Clone)]
pub struct CleaningRun {
    /// The leakage-free dataset
    pub dataset: CleanDataset,
    /// Row accounting and schema summary
    pub report: CleaningReport,
    /// Kept and rejected records with their reasons
    pub outcome: ValidationOutcome,
}

impl CleaningRun {
    /// Raw row indices of the kept records, in input order.
    #[must_use]
    pub fn kept_rows(&self) -> Vec<usize> {
        self.outcome.kept.iter().map(|g| g.record().row).collect()
    }
}

/// Schema normalizer, validity filter and dataset builder composed in order.
///
/// # Examples
///
/// ```
/// use cosecha::pipeline::CleaningPipeline;
/// use cosecha::schema::RawTable;
///
/// let csv = "District,Average_avg-Temp,Average-Min Temp,Average-max-temp,PH,Crop Yield,Hectare\n\
///            Dala,27,21,33,6.5,120,80\n\
///            Fagge,27,21,-273,6.1,90,60\n";
/// let raw = RawTable::from_reader(csv.as_bytes()).unwrap();
///
/// let run = CleaningPipeline::default().run(&raw).unwrap();
/// assert_eq!(run.report.original_rows, 2);
/// assert_eq!(run.report.final_rows, 1);
/// assert!(run.report.leakage.passed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CleaningPipeline {
    normalizer: SchemaNormalizer,
    filter: PhysicalValidityFilter,
    builder: DatasetBuilder,
}

impl CleaningPipeline {
    /// Creates a pipeline from a rename table and validated limits.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InvalidHyperparameter`](crate::error::CosechaError::InvalidHyperparameter)
    /// if the limits are out of domain.
    pub fn new(renames: RenameTable, limits: ValidityLimits) -> Result<Self> {
        limits.validate()?;
        Ok(Self {
            normalizer: SchemaNormalizer::new(renames),
            filter: PhysicalValidityFilter::new(limits),
            builder: DatasetBuilder::new(),
        })
    }

    /// Creates a pipeline from the relevant configuration sections.
    ///
    /// # Errors
    ///
    /// See [`CleaningPipeline::new`].
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.renames.clone(), config.limits)
    }

    /// The validity filter in use.
    #[must_use]
    pub fn filter(&self) -> &PhysicalValidityFilter {
        &self.filter
    }

    /// Runs every stage over a raw table.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::Schema`](crate::error::CosechaError::Schema)
    /// when a required field cannot be resolved. Per-record violations are
    /// never errors; they are counted in the report.
    pub fn run(&self, raw: &RawTable) -> Result<CleaningRun> {
        let original_rows = raw.n_rows();
        let table = self.normalizer.normalize(raw)?;
        let (fields, records) = table.into_parts();

        let outcome = self.filter.validate(records);
        let dataset = self.builder.build(outcome.kept.clone(), &fields)?;
        let report = CleaningReport::new(original_rows, &outcome, &dataset);

        if !report.reconciles() {
            warn!(
                original = report.original_rows,
                final_rows = report.final_rows,
                dropped = report.dropped_rows,
                "row counts do not reconcile"
            );
        }
        info!(
            original = report.original_rows,
            dropped = report.dropped_rows,
            final_rows = report.final_rows,
            columns = report.columns.len(),
            "cleaning finished"
        );
        Ok(CleaningRun {
            dataset,
            report,
            outcome,
        })
    }

    /// Reads a CSV file and runs every stage.
    ///
    /// # Errors
    ///
    /// Returns I/O or CSV errors for an unreadable file, plus any error
    /// from [`CleaningPipeline::run`].
    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<CleaningRun> {
        let raw = RawTable::from_csv_path(path)?;
        self.run(&raw)
    }
}
