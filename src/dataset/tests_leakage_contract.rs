// Contract tests for the leakage-safe dataset builder and the persisted
// clean dataset file.

use super::*;
use crate::schema::CanonicalRecord;
use crate::validation::{PhysicalValidityFilter, RejectionReason, ValidationOutcome};

fn record(row: usize, district: &str, ph: f64, production: f64, area: f64) -> CanonicalRecord {
    CanonicalRecord {
        row,
        state: Some("Kano".to_string()),
        district: district.to_string(),
        avg_temp: 27.0,
        min_temp: 21.0,
        max_temp: 33.0,
        avg_precipitation: Some(2.0),
        wind_speed: Some(3.0),
        ph,
        clay: Some(20.0),
        sand: Some(50.0),
        silt: Some(30.0),
        total_production: production,
        area_ha: area,
    }
}

fn built() -> (CleanDataset, ValidationOutcome) {
    let records = vec![
        record(0, "Dala", 6.5, 120.0, 80.0),
        record(1, "Fagge", -1000.0, 90.0, 60.0),
        record(2, "Gwale", 5.8, 600.0, 50.0),
        record(3, "Nassarawa", 7.1, 45.0, 30.0),
    ];
    let outcome = PhysicalValidityFilter::default().validate(records);
    let dataset = DatasetBuilder::new()
        .build(outcome.kept.clone(), &CanonicalField::ALL)
        .expect("builds");
    (dataset, outcome)
}

#[test]
fn test_emitted_schema_excludes_leakage_columns() {
    let (dataset, _) = built();
    let columns = dataset.columns();
    assert!(leakage_check(&columns).passed());
    assert_eq!(
        columns,
        vec![
            "state",
            "district",
            "avg_temp",
            "min_temp",
            "max_temp",
            "avg_precipitation",
            "wind_speed",
            "ph",
            "clay",
            "sand",
            "silt",
            "yield_per_ha",
        ]
    );
}

#[test]
fn test_yield_equals_production_over_area() {
    let (dataset, _) = built();
    assert_eq!(dataset.len(), 2);
    let dala = &dataset.records()[0];
    assert_eq!(dala.district, "Dala");
    assert!((dala.yield_per_ha - 120.0 / 80.0).abs() < 1e-9);
}

#[test]
fn test_report_reconciles() {
    let (dataset, outcome) = built();
    let report = CleaningReport::new(4, &outcome, &dataset);
    assert!(report.reconciles());
    assert_eq!(report.dropped_rows, 2);
    assert_eq!(report.final_rows, 2);
    assert_eq!(report.rejected_for(RejectionReason::InvalidPh), 1);
    assert_eq!(report.rejected_for(RejectionReason::EfficiencyOutlier), 1);
    assert_eq!(report.rejected_for(RejectionReason::InvalidArea), 0);
    assert_eq!(report.dropped_row_indices, vec![1, 2]);
    assert!(report.leakage.passed());
}

#[test]
fn test_leakage_check_is_case_insensitive() {
    let check = leakage_check(&["District", "Total_Production", "TEMP_YIELD_EFFICIENCY"]);
    assert_eq!(
        check.forbidden_present,
        vec!["Total_Production".to_string(), "TEMP_YIELD_EFFICIENCY".to_string()]
    );
    assert!(!check.passed());
}

#[test]
fn test_dataset_rejects_leaky_feature_column() {
    let result = CleanDataset::new(false, vec![CanonicalField::AreaHa], Vec::new());
    assert!(result.is_err());
}

#[test]
fn test_absent_optional_columns_not_emitted() {
    let records = vec![record(0, "Dala", 6.5, 120.0, 80.0)];
    let outcome = PhysicalValidityFilter::default().validate(records);
    let present = [
        CanonicalField::District,
        CanonicalField::AvgTemp,
        CanonicalField::MinTemp,
        CanonicalField::MaxTemp,
        CanonicalField::Ph,
        CanonicalField::TotalProduction,
        CanonicalField::AreaHa,
    ];
    let dataset = DatasetBuilder::new()
        .build(outcome.kept, &present)
        .expect("builds");
    assert_eq!(
        dataset.columns(),
        vec!["district", "avg_temp", "min_temp", "max_temp", "ph", "yield_per_ha"]
    );
    assert!(dataset.records()[0].state.is_none());
}

#[test]
fn test_csv_round_trip_preserves_values() {
    let (dataset, _) = built();
    let mut buffer = Vec::new();
    dataset.write_csv(&mut buffer).expect("write");
    let text = String::from_utf8(buffer.clone()).expect("utf8");
    assert!(text.starts_with("state,district,avg_temp"));
    assert!(!text.contains("area_ha"));

    let back = CleanDataset::read_csv(buffer.as_slice()).expect("read");
    assert_eq!(back, dataset);
}

#[test]
fn test_read_refuses_leaky_file() {
    let csv = "district,ph,area_ha,yield_per_ha\nDala,6.5,80,1.5\n";
    let err = CleanDataset::read_csv(csv.as_bytes()).expect_err("leaky");
    assert!(err.to_string().contains("area_ha"));
}

#[test]
fn test_read_requires_target() {
    let csv = "district,ph\nDala,6.5\n";
    assert!(matches!(
        CleanDataset::read_csv(csv.as_bytes()),
        Err(CosechaError::ColumnNotFound { .. })
    ));
}

#[test]
fn test_without_features() {
    let (dataset, _) = built();
    let reduced = dataset.without_features(&["ph", "clay"]).expect("known columns");
    assert!(!reduced.feature_names().contains(&"ph"));
    assert_eq!(reduced.feature_columns().len(), dataset.feature_columns().len() - 2);
    assert_eq!(reduced.features().n_cols(), reduced.feature_columns().len());

    assert!(matches!(
        dataset.without_features(&["yield_per_ha"]),
        Err(CosechaError::ColumnNotFound { .. })
    ));
}

#[test]
fn test_matrix_views_align() {
    let (dataset, _) = built();
    let x = dataset.features();
    assert_eq!(x.shape(), (2, 9));
    assert_eq!(dataset.target().len(), 2);
    assert_eq!(dataset.groups(), vec!["Dala".to_string(), "Nassarawa".to_string()]);
}

#[test]
fn test_audit_flags_spike_and_leakage() {
    let csv = "district,ph,total_production,yield_per_ha\nA,6.5,100,1.2\nB,-1,600,12.0\n";
    let table = crate::schema::RawTable::from_reader(csv.as_bytes()).expect("csv");
    let report = audit(&table, 10.0);
    assert_eq!(report.rows, 2);
    assert_eq!(report.leakage.forbidden_present, vec!["total_production".to_string()]);
    assert_eq!(report.min_ph, Some(-1.0));
    assert!(!report.ph_passed());
    assert_eq!(report.spike_rows, 1);
    assert!(!report.passed());
}

#[test]
fn test_audit_passes_clean_output() {
    let (dataset, _) = built();
    let mut buffer = Vec::new();
    dataset.write_csv(&mut buffer).expect("write");
    let table = crate::schema::RawTable::from_reader(buffer.as_slice()).expect("csv");
    let report = audit(&table, 10.0);
    assert!(report.passed(), "{report:?}");
    let summary = report.yield_summary.expect("rows present");
    assert!((summary.min - 1.5).abs() < 1e-12);
    assert!((summary.max - 1.5).abs() < 1e-12);
}
