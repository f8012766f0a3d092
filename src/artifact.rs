//! Exported model artifact and single-row prediction.
//!
//! A [`ModelArtifact`] bundles the tuned booster with the configuration it
//! was trained with, the exact feature columns it expects, and both scores
//! from the search: the cross-validated one and the labelled training fit.
//! It is persisted as JSON.

use crate::automl::{SearchOutcome, TrainingFit, ValidationScore};
use crate::dataset::CleanDataset;
use crate::error::{CosechaError, Result};
use crate::primitives::Matrix;
use crate::schema::CanonicalField;
use crate::traits::Estimator;
use crate::tree::{BoosterParams, GradientBoostingRegressor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Feature name to value, for one field.
pub type FeatureRow = BTreeMap<String, f64>;

/// Qualitative yield classification of a prediction (tonnes per hectare).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldBand {
    /// Below [`YieldBand::LOW_BELOW`]
    Low,
    /// From [`YieldBand::LOW_BELOW`] up to [`YieldBand::AVERAGE_BELOW`]
    Average,
    /// [`YieldBand::AVERAGE_BELOW`] and above
    High,
}

impl YieldBand {
    /// Upper bound (exclusive) of the low band.
    pub const LOW_BELOW: f64 = 1.5;
    /// Upper bound (exclusive) of the average band.
    pub const AVERAGE_BELOW: f64 = 2.2;

    /// Band of a predicted yield per hectare.
    #[must_use]
    pub fn classify(yield_per_ha: f64) -> Self {
        if yield_per_ha < Self::LOW_BELOW {
            Self::Low
        } else if yield_per_ha < Self::AVERAGE_BELOW {
            Self::Average
        } else {
            Self::High
        }
    }

    /// Band label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Average => "average",
            Self::High => "high",
        }
    }
}

impl fmt::Display for YieldBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field conditions entered by a user.
///
/// Soil fractions are percentages; `avg_temp` defaults to the midpoint of
/// the minimum and maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldParameters {
    /// Average minimum temperature (°C)
    pub min_temp: f64,
    /// Average maximum temperature (°C)
    pub max_temp: f64,
    /// Average temperature (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_temp: Option<f64>,
    /// Average precipitation
    pub precipitation: f64,
    /// Average wind speed
    pub wind_speed: f64,
    /// Soil pH
    pub ph: f64,
    /// Clay (%)
    pub clay: f64,
    /// Sand (%)
    pub sand: f64,
    /// Silt (%)
    pub silt: f64,
}

impl FieldParameters {
    /// Tolerance on the soil composition total.
    pub const SOIL_TOLERANCE: f64 = 0.5;

    /// Average temperature, derived from min/max when not given.
    #[must_use]
    pub fn avg_temp(&self) -> f64 {
        self.avg_temp
            .unwrap_or((self.min_temp + self.max_temp) / 2.0)
    }

    /// Clay, sand and silt together.
    #[must_use]
    pub fn soil_total(&self) -> f64 {
        self.clay + self.sand + self.silt
    }

    /// Whether the soil fractions add up to 100 %.
    #[must_use]
    pub fn soil_balanced(&self) -> bool {
        (self.soil_total() - 100.0).abs() <= Self::SOIL_TOLERANCE
    }

    /// Row keyed by canonical feature names.
    #[must_use]
    pub fn to_feature_row(&self) -> FeatureRow {
        [
            (CanonicalField::AvgTemp, self.avg_temp()),
            (CanonicalField::MinTemp, self.min_temp),
            (CanonicalField::MaxTemp, self.max_temp),
            (CanonicalField::AvgPrecipitation, self.precipitation),
            (CanonicalField::WindSpeed, self.wind_speed),
            (CanonicalField::Ph, self.ph),
            (CanonicalField::Clay, self.clay),
            (CanonicalField::Sand, self.sand),
            (CanonicalField::Silt, self.silt),
        ]
        .into_iter()
        .map(|(field, value)| (field.as_str().to_string(), value))
        .collect()
    }
}

/// A prediction with its band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted yield per hectare
    pub yield_per_ha: f64,
    /// Qualitative band
    pub band: YieldBand,
}

/// Trained model plus everything needed to use and judge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Version of the library that wrote the artifact
    pub cosecha_version: String,
    /// Selected booster configuration
    pub config: BoosterParams,
    /// Feature columns in training order
    pub feature_columns: Vec<String>,
    /// The fitted model
    pub model: GradientBoostingRegressor,
    /// Cross-validated score of the selected configuration
    pub validation: ValidationScore,
    /// In-sample score of the refit model; not a generalization estimate
    pub training_fit: TrainingFit,
}

impl ModelArtifact {
    /// Packages a finished search run on `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::NotFitted`] for an unfitted model and
    /// [`CosechaError::DimensionMismatch`] if the model was trained on a
    /// different number of features than the dataset has.
    pub fn from_outcome(outcome: &SearchOutcome, dataset: &CleanDataset) -> Result<Self> {
        if !outcome.model.is_fitted() {
            return Err(CosechaError::NotFitted {
                model: "GradientBoostingRegressor",
            });
        }
        let feature_columns: Vec<String> = dataset
            .feature_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        if outcome.model.n_features() != feature_columns.len() {
            return Err(CosechaError::dimension_mismatch(
                "model features",
                feature_columns.len(),
                outcome.model.n_features(),
            ));
        }
        Ok(Self {
            cosecha_version: env!("CARGO_PKG_VERSION").to_string(),
            config: outcome.best.params,
            feature_columns,
            model: outcome.model.clone(),
            validation: outcome.validation.clone(),
            training_fit: outcome.training_fit.clone(),
        })
    }

    /// Predicts one field.
    ///
    /// `row` must hold exactly the trained feature columns, all finite.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::ColumnNotFound`] for a missing column,
    /// [`CosechaError::DimensionMismatch`] for an unexpected one, and
    /// [`CosechaError::InvalidHyperparameter`] for a non-finite value.
    pub fn predict_row(&self, row: &FeatureRow) -> Result<f64> {
        if let Some(extra) = row.keys().find(|k| !self.feature_columns.contains(k)) {
            return Err(CosechaError::DimensionMismatch {
                expected: format!("features [{}]", self.feature_columns.join(", ")),
                actual: format!("unexpected column {extra}"),
            });
        }
        let mut values = Vec::with_capacity(self.feature_columns.len());
        for name in &self.feature_columns {
            let value = *row
                .get(name)
                .ok_or_else(|| CosechaError::ColumnNotFound { name: name.clone() })?;
            if !value.is_finite() {
                return Err(CosechaError::invalid_param(name, value, "a finite number"));
            }
            values.push(value);
        }
        let x = Matrix::from_vec(1, values.len(), values)?;
        let predictions = self.model.predict(&x)?;
        Ok(predictions.as_slice()[0])
    }

    /// Predicts from user field parameters, using the trained subset of
    /// their features.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::ColumnNotFound`] if the model needs a column
    /// the parameters cannot supply, plus errors from
    /// [`ModelArtifact::predict_row`].
    pub fn predict_field(&self, field: &FieldParameters) -> Result<Prediction> {
        if !field.soil_balanced() {
            warn!(
                total = field.soil_total(),
                "clay, sand and silt do not add up to 100%"
            );
        }
        let full = field.to_feature_row();
        let mut row = FeatureRow::new();
        for name in &self.feature_columns {
            let value = full
                .get(name)
                .ok_or_else(|| CosechaError::ColumnNotFound { name: name.clone() })?;
            row.insert(name.clone(), *value);
        }
        let yield_per_ha = self.predict_row(&row)?;
        Ok(Prediction {
            yield_per_ha,
            band: YieldBand::classify(yield_per_ha),
        })
    }

    /// Writes the artifact as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns I/O or serialization errors.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!(path = %path.display(), features = self.feature_columns.len(), "model artifact written");
        Ok(())
    }

    /// Reads an artifact written by [`ModelArtifact::save_json`].
    ///
    /// # Errors
    ///
    /// Returns I/O or serialization errors, and
    /// [`CosechaError::NotFitted`] if the stored model has no trees.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = serde_json::from_reader(reader)?;
        if !artifact.model.is_fitted() {
            return Err(CosechaError::NotFitted {
                model: "GradientBoostingRegressor",
            });
        }
        Ok(artifact)
    }
}

#[cfg(test)]
#[path = "tests_artifact_contract.rs"]
mod tests_artifact_contract;
