//! Leakage-safe dataset builder and the persisted clean dataset.
//!
//! The target `yield_per_ha` is `total_production / area_ha`. Both inputs
//! (and the guard's efficiency ratio, which is the same quantity) would let
//! a model reconstruct the target exactly, so none of them may appear in
//! the emitted schema. [`leakage_check`] verifies that mechanically.

mod audit;
mod report;

pub use audit::{audit, audit_path, AuditReport, YieldSummary};
pub use report::CleaningReport;

use crate::error::{CosechaError, Result};
use crate::primitives::{Matrix, Vector};
use crate::schema::CanonicalField;
use crate::validation::GuardedRecord;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Name of the target column.
pub const TARGET_COLUMN: &str = "yield_per_ha";

/// Columns that determine the target and must never be persisted.
pub const LEAKAGE_COLUMNS: [&str; 3] = ["total_production", "area_ha", "temp_yield_efficiency"];

/// Result of intersecting a column set with [`LEAKAGE_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakageCheck {
    /// Forbidden columns found (empty when the check passes)
    pub forbidden_present: Vec<String>,
}

impl LeakageCheck {
    /// True when no forbidden column is present.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.forbidden_present.is_empty()
    }
}

/// Checks a column list against the leakage contract.
///
/// # Examples
///
/// ```
/// use cosecha::dataset::leakage_check;
///
/// assert!(leakage_check(&["district", "ph", "yield_per_ha"]).passed());
/// let check = leakage_check(&["district", "Area_Ha", "yield_per_ha"]);
/// assert_eq!(check.forbidden_present, vec!["Area_Ha".to_string()]);
/// ```
#[must_use]
pub fn leakage_check<S: AsRef<str>>(columns: &[S]) -> LeakageCheck {
    let forbidden_present = columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| {
            let lower = c.trim().to_ascii_lowercase();
            LEAKAGE_COLUMNS.contains(&lower.as_str())
        })
        .map(str::to_string)
        .collect();
    LeakageCheck { forbidden_present }
}

/// Whether a canonical field may be used as a model feature.
#[must_use]
pub fn is_feature_field(field: CanonicalField) -> bool {
    field.is_numeric()
        && !matches!(field, CanonicalField::TotalProduction | CanonicalField::AreaHa)
}

/// One row of the clean dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    /// Administrative state, when the input carried one
    pub state: Option<String>,
    /// District (grouping key)
    pub district: String,
    /// Feature values aligned to [`CleanDataset::feature_columns`]
    pub features: Vec<f64>,
    /// Production per hectare
    pub yield_per_ha: f64,
}

/// The durable, leakage-free training table.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanDataset {
    has_state: bool,
    feature_columns: Vec<CanonicalField>,
    records: Vec<CleanRecord>,
}

impl CleanDataset {
    /// Assembles a dataset, enforcing the leakage contract.
    ///
    /// # Errors
    ///
    /// Returns an error if a feature column is not a permitted feature field
    /// or a record's feature width differs from the column count.
    pub fn new(
        has_state: bool,
        feature_columns: Vec<CanonicalField>,
        records: Vec<CleanRecord>,
    ) -> Result<Self> {
        if let Some(bad) = feature_columns.iter().find(|f| !is_feature_field(**f)) {
            return Err(CosechaError::Other(format!(
                "{bad} cannot be a feature column of the clean dataset"
            )));
        }
        for record in &records {
            if record.features.len() != feature_columns.len() {
                return Err(CosechaError::dimension_mismatch(
                    "feature columns",
                    feature_columns.len(),
                    record.features.len(),
                ));
            }
        }
        Ok(Self {
            has_state,
            feature_columns,
            records,
        })
    }

    /// Full persisted header: identity columns, features, target.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.feature_columns.len() + 3);
        if self.has_state {
            columns.push(CanonicalField::State.as_str().to_string());
        }
        columns.push(CanonicalField::District.as_str().to_string());
        columns.extend(self.feature_columns.iter().map(|f| f.as_str().to_string()));
        columns.push(TARGET_COLUMN.to_string());
        columns
    }

    /// Feature columns in canonical order.
    #[must_use]
    pub fn feature_columns(&self) -> &[CanonicalField] {
        &self.feature_columns
    }

    /// Feature column names.
    #[must_use]
    pub fn feature_names(&self) -> Vec<&'static str> {
        self.feature_columns.iter().map(|f| f.as_str()).collect()
    }

    /// Whether the dataset carries a state column.
    #[must_use]
    pub fn has_state(&self) -> bool {
        self.has_state
    }

    /// The records.
    #[must_use]
    pub fn records(&self) -> &[CleanRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feature matrix (rows = records, columns = features).
    #[must_use]
    pub fn features(&self) -> Matrix<f64> {
        let n_cols = self.feature_columns.len();
        let data: Vec<f64> = self
            .records
            .iter()
            .flat_map(|r| r.features.iter().copied())
            .collect();
        // Widths are checked in `new`, so the shape always matches.
        Matrix::from_vec(self.records.len(), n_cols, data)
            .unwrap_or_else(|_| Matrix::zeros(self.records.len(), n_cols))
    }

    /// Target vector.
    #[must_use]
    pub fn target(&self) -> Vector<f64> {
        self.records.iter().map(|r| r.yield_per_ha).collect::<Vec<_>>().into()
    }

    /// Grouping labels (district per record).
    #[must_use]
    pub fn groups(&self) -> Vec<String> {
        self.records.iter().map(|r| r.district.clone()).collect()
    }

    /// Copy of the dataset without the named feature columns.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::ColumnNotFound`] for a name that is not a
    /// feature column.
    pub fn without_features<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut drop = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let idx = self
                .feature_columns
                .iter()
                .position(|f| f.as_str() == name)
                .ok_or_else(|| CosechaError::ColumnNotFound {
                    name: name.to_string(),
                })?;
            drop.push(idx);
        }
        let keep: Vec<usize> = (0..self.feature_columns.len())
            .filter(|i| !drop.contains(i))
            .collect();

        Ok(Self {
            has_state: self.has_state,
            feature_columns: keep.iter().map(|&i| self.feature_columns[i]).collect(),
            records: self
                .records
                .iter()
                .map(|r| CleanRecord {
                    state: r.state.clone(),
                    district: r.district.clone(),
                    features: keep.iter().map(|&i| r.features[i]).collect(),
                    yield_per_ha: r.yield_per_ha,
                })
                .collect(),
        })
    }

    /// Writes the dataset as CSV.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.columns())?;
        for record in &self.records {
            let mut row = Vec::with_capacity(record.features.len() + 3);
            if self.has_state {
                row.push(record.state.clone().unwrap_or_default());
            }
            row.push(record.district.clone());
            row.extend(record.features.iter().map(f64::to_string));
            row.push(record.yield_per_ha.to_string());
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the dataset to a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_csv(std::io::BufWriter::new(file))?;
        info!(
            path = %path.as_ref().display(),
            rows = self.len(),
            "wrote clean dataset"
        );
        Ok(())
    }

    /// Reads a persisted clean dataset.
    ///
    /// # Errors
    ///
    /// Refuses any file carrying a leakage column, an unknown column, or
    /// lacking the district or target column. Cells must parse as numbers.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let leakage = leakage_check(&headers);
        if !leakage.passed() {
            warn!(columns = ?leakage.forbidden_present, "refusing leaky dataset");
            return Err(CosechaError::Other(format!(
                "dataset contains target-derived column(s) {}; re-run the cleaning pipeline",
                leakage.forbidden_present.join(", ")
            )));
        }

        let mut state_idx = None;
        let mut district_idx = None;
        let mut target_idx = None;
        let mut features: Vec<(CanonicalField, usize)> = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            match header.as_str() {
                TARGET_COLUMN => target_idx = Some(idx),
                name => match CanonicalField::from_name(name) {
                    Some(CanonicalField::State) => state_idx = Some(idx),
                    Some(CanonicalField::District) => district_idx = Some(idx),
                    Some(field) if is_feature_field(field) => features.push((field, idx)),
                    _ => {
                        return Err(CosechaError::Other(format!(
                            "unexpected column {name:?} in clean dataset"
                        )))
                    }
                },
            }
        }
        let district_idx = district_idx.ok_or_else(|| CosechaError::ColumnNotFound {
            name: CanonicalField::District.as_str().to_string(),
        })?;
        let target_idx = target_idx.ok_or_else(|| CosechaError::ColumnNotFound {
            name: TARGET_COLUMN.to_string(),
        })?;
        features.sort_by_key(|(field, _)| *field);

        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row?;
            let number = |idx: usize, column: &str| -> Result<f64> {
                let cell = row.get(idx).unwrap_or_default();
                cell.parse::<f64>().map_err(|_| {
                    CosechaError::Other(format!(
                        "data row {line}: column {column} holds non-numeric value {cell:?}"
                    ))
                })
            };
            let mut values = Vec::with_capacity(features.len());
            for (field, idx) in &features {
                values.push(number(*idx, field.as_str())?);
            }
            records.push(CleanRecord {
                state: state_idx.map(|i| row.get(i).unwrap_or_default().to_string()),
                district: row.get(district_idx).unwrap_or_default().to_string(),
                features: values,
                yield_per_ha: number(target_idx, TARGET_COLUMN)?,
            });
        }

        Self::new(
            state_idx.is_some(),
            features.into_iter().map(|(field, _)| field).collect(),
            records,
        )
    }

    /// Reads a persisted clean dataset from a file.
    ///
    /// # Errors
    ///
    /// See [`CleanDataset::read_csv`].
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let dataset = Self::read_csv(std::io::BufReader::new(file))?;
        info!(
            path = %path.as_ref().display(),
            rows = dataset.len(),
            features = dataset.feature_columns.len(),
            "loaded clean dataset"
        );
        Ok(dataset)
    }
}

/// Builds the clean dataset from validated records.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetBuilder;

impl DatasetBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Promotes the guard ratio to `yield_per_ha` and projects each record
    /// onto the permitted feature columns present in the input.
    ///
    /// # Errors
    ///
    /// Returns an error if a record's ratio is undefined, which cannot
    /// happen for records that passed the validity filter.
    pub fn build(&self, kept: Vec<GuardedRecord>, present: &[CanonicalField]) -> Result<CleanDataset> {
        let mut feature_columns: Vec<CanonicalField> = present
            .iter()
            .copied()
            .filter(|f| is_feature_field(*f))
            .collect();
        feature_columns.sort_unstable();
        feature_columns.dedup();
        let has_state = present.contains(&CanonicalField::State);

        let mut records = Vec::with_capacity(kept.len());
        for guarded in kept {
            let yield_per_ha = guarded.efficiency().ok_or_else(|| {
                CosechaError::Other(format!(
                    "row {}: yield undefined for area {}",
                    guarded.record().row,
                    guarded.record().area_ha
                ))
            })?;
            let record = guarded.into_record();
            let features = feature_columns
                .iter()
                .map(|f| record.value(*f).unwrap_or(f64::NAN))
                .collect();
            records.push(CleanRecord {
                state: if has_state { record.state } else { None },
                district: record.district,
                features,
                yield_per_ha,
            });
        }

        let dataset = CleanDataset::new(has_state, feature_columns, records)?;
        let check = leakage_check(&dataset.columns());
        if !check.passed() {
            return Err(CosechaError::Other(format!(
                "leakage contract violated: {}",
                check.forbidden_present.join(", ")
            )));
        }
        Ok(dataset)
    }
}

#[cfg(test)]
#[path = "tests_leakage_contract.rs"]
mod tests_leakage_contract;
