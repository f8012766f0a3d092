// =========================================================================
// FALSIFY-ART: model artifact contract
//
//   ART-001: predict_row accepts exactly the trained feature columns
//   ART-002: a saved artifact loads back equal and predicts identically
//   ART-003: validation and training-fit scores travel separately
//   ART-004: yield bands split at 1.5 and 2.2
// =========================================================================

use super::*;
use crate::automl::{HyperparameterSearch, SearchConfig, SearchSpace};
use crate::automl::BoosterParam;
use crate::dataset::CleanRecord;
use crate::model_selection::GroupKFold;

fn dataset() -> CleanDataset {
    let mut records = Vec::new();
    for d in 0..6 {
        for r in 0..4 {
            let ph = 5.2 + ((d + r) % 5) as f64 * 0.35;
            let max_temp = 31.0 + d as f64 * 0.5 + r as f64;
            records.push(CleanRecord {
                state: Some("Kano".to_string()),
                district: format!("district-{d}"),
                features: vec![max_temp, ph],
                yield_per_ha: 0.04 * max_temp + 0.2 * ph,
            });
        }
    }
    CleanDataset::new(
        true,
        vec![CanonicalField::MaxTemp, CanonicalField::Ph],
        records,
    )
    .expect("valid")
}

fn artifact() -> ModelArtifact {
    let space = SearchSpace::new()
        .add(BoosterParam::NEstimators, [10_i64])
        .expect("valid")
        .add(BoosterParam::MaxDepth, [1_i64, 2])
        .expect("valid")
        .add(BoosterParam::LearningRate, [0.3])
        .expect("valid");
    let config = SearchConfig::new(2, 3, space).expect("valid");
    let data = dataset();
    let outcome = HyperparameterSearch::new(config, GroupKFold::new(3).expect("valid"))
        .run(&data)
        .expect("search runs");
    ModelArtifact::from_outcome(&outcome, &data).expect("artifact")
}

fn row(pairs: &[(&str, f64)]) -> FeatureRow {
    pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

fn field() -> FieldParameters {
    FieldParameters {
        min_temp: 21.0,
        max_temp: 33.0,
        avg_temp: None,
        precipitation: 2.1,
        wind_speed: 3.0,
        ph: 6.1,
        clay: 20.0,
        sand: 50.0,
        silt: 30.0,
    }
}

/// FALSIFY-ART-001: exact column set
#[test]
fn falsify_art_001_requires_exact_columns() {
    let artifact = artifact();
    assert_eq!(artifact.feature_columns, vec!["max_temp", "ph"]);

    let ok = artifact.predict_row(&row(&[("max_temp", 33.0), ("ph", 6.0)]));
    assert!(ok.expect("predicts").is_finite());

    let missing = artifact.predict_row(&row(&[("max_temp", 33.0)]));
    assert!(matches!(missing, Err(CosechaError::ColumnNotFound { ref name }) if name == "ph"));

    let extra = artifact.predict_row(&row(&[
        ("max_temp", 33.0),
        ("ph", 6.0),
        ("total_production", 120.0),
    ]));
    assert!(
        matches!(extra, Err(CosechaError::DimensionMismatch { .. })),
        "FALSIFIED ART-001: extra column accepted"
    );

    let nan = artifact.predict_row(&row(&[("max_temp", f64::NAN), ("ph", 6.0)]));
    assert!(matches!(nan, Err(CosechaError::InvalidHyperparameter { .. })));
}

/// FALSIFY-ART-002: JSON persistence
#[test]
fn falsify_art_002_json_round_trip() {
    let artifact = artifact();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("model.json");
    artifact.save_json(&path).expect("save");

    let loaded = ModelArtifact::load_json(&path).expect("load");
    assert_eq!(loaded, artifact);
    let input = row(&[("max_temp", 32.5), ("ph", 5.9)]);
    assert_eq!(
        loaded.predict_row(&input).expect("predicts"),
        artifact.predict_row(&input).expect("predicts")
    );
}

/// FALSIFY-ART-003: honest score kept apart from the training fit
#[test]
fn falsify_art_003_scores_are_separate() {
    let artifact = artifact();
    assert_ne!(artifact.validation.rmse, artifact.training_fit.rmse);
    assert_eq!(artifact.training_fit.note, TrainingFit::NOTE);
    assert_eq!(artifact.config, *artifact.model.params());
}

/// FALSIFY-ART-004: band thresholds
#[test]
fn falsify_art_004_yield_bands() {
    assert_eq!(YieldBand::classify(0.3), YieldBand::Low);
    assert_eq!(YieldBand::classify(1.499), YieldBand::Low);
    assert_eq!(YieldBand::classify(1.5), YieldBand::Average);
    assert_eq!(YieldBand::classify(2.199), YieldBand::Average);
    assert_eq!(YieldBand::classify(2.2), YieldBand::High);
    assert_eq!(YieldBand::High.to_string(), "high");
}

#[test]
fn test_field_parameters_row() {
    let field = field();
    assert_eq!(field.avg_temp(), 27.0);
    assert!(field.soil_balanced());

    let full = field.to_feature_row();
    assert_eq!(full.len(), 9);
    assert_eq!(full["avg_temp"], 27.0);
    assert_eq!(full["avg_precipitation"], 2.1);

    let explicit = FieldParameters {
        avg_temp: Some(25.0),
        clay: 40.0,
        ..field
    };
    assert_eq!(explicit.avg_temp(), 25.0);
    assert!(!explicit.soil_balanced());
}

#[test]
fn test_predict_field_projects_trained_columns() {
    let artifact = artifact();
    let prediction = artifact.predict_field(&field()).expect("predicts");
    let direct = artifact
        .predict_row(&row(&[("max_temp", 33.0), ("ph", 6.1)]))
        .expect("predicts");
    assert_eq!(prediction.yield_per_ha, direct);
    assert_eq!(prediction.band, YieldBand::classify(direct));
}

#[test]
fn test_from_outcome_rejects_mismatched_dataset() {
    let space = SearchSpace::new()
        .add(BoosterParam::NEstimators, [5_i64])
        .expect("valid");
    let config = SearchConfig::new(1, 1, space).expect("valid");
    let data = dataset();
    let outcome = HyperparameterSearch::new(config, GroupKFold::new(2).expect("valid"))
        .run(&data)
        .expect("runs");
    let narrower = data.without_features(&["ph"]).expect("drop");
    assert!(matches!(
        ModelArtifact::from_outcome(&outcome, &narrower),
        Err(CosechaError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(matches!(
        ModelArtifact::load_json(dir.path().join("absent.json")),
        Err(CosechaError::Io(_))
    ));
}
