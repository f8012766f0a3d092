//! Predict command: score one field with an exported model.

use super::require_file;
use crate::error::{CliError, Result};
use crate::output;
use cosecha::artifact::{FieldParameters, ModelArtifact, YieldBand};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct PredictSummary<'a> {
    field: &'a FieldParameters,
    yield_per_ha: f64,
    band: YieldBand,
    soil_balanced: bool,
}

/// Predicts yield per hectare for `field` with the artifact at `model`.
pub(crate) fn run(model: &Path, field: &FieldParameters, json: bool) -> Result<()> {
    require_file(model)?;
    if let Some((name, value)) = first_non_finite(field) {
        return Err(CliError::InvalidArgument(format!(
            "--{name} must be a finite number, got {value}"
        )));
    }
    if field.min_temp > field.max_temp {
        return Err(CliError::InvalidArgument(format!(
            "--min-temp ({}) exceeds --max-temp ({})",
            field.min_temp, field.max_temp
        )));
    }

    let artifact = ModelArtifact::load_json(model)?;
    let prediction = artifact.predict_field(field)?;

    if json {
        return output::json(&PredictSummary {
            field,
            yield_per_ha: prediction.yield_per_ha,
            band: prediction.band,
            soil_balanced: field.soil_balanced(),
        });
    }

    output::section("Field");
    output::kv(
        "Temperature min/avg/max",
        format!(
            "{:.1} / {:.1} / {:.1}",
            field.min_temp,
            field.avg_temp(),
            field.max_temp
        ),
    );
    output::kv("Precipitation", field.precipitation);
    output::kv("Wind speed", field.wind_speed);
    output::kv("pH", field.ph);
    output::kv(
        "Clay/Sand/Silt",
        format!("{} / {} / {}", field.clay, field.sand, field.silt),
    );
    if !field.soil_balanced() {
        output::warning(&format!(
            "soil composition totals {:.1}%, expected 100%",
            field.soil_total()
        ));
    }

    output::section("Prediction");
    output::kv("Yield (t/ha)", format!("{:.3}", prediction.yield_per_ha));
    output::kv("Band", prediction.band);
    output::kv(
        "Model validation RMSE",
        format!(
            "{:.4} over {} grouped folds",
            artifact.validation.rmse, artifact.validation.n_folds
        ),
    );
    Ok(())
}

fn first_non_finite(field: &FieldParameters) -> Option<(&'static str, f64)> {
    [
        ("min-temp", field.min_temp),
        ("max-temp", field.max_temp),
        ("avg-temp", field.avg_temp.unwrap_or(0.0)),
        ("precipitation", field.precipitation),
        ("wind", field.wind_speed),
        ("ph", field.ph),
        ("clay", field.clay),
        ("sand", field.sand),
        ("silt", field.silt),
    ]
    .into_iter()
    .find(|(_, value)| !value.is_finite())
}
