// Contract tests for the physical validity filter: every violated predicate
// is reported, the keep decision is their conjunction.

use super::*;

fn valid() -> CanonicalRecord {
    CanonicalRecord {
        row: 0,
        state: Some("Kano".to_string()),
        district: "Dala".to_string(),
        avg_temp: 27.0,
        min_temp: 21.0,
        max_temp: 33.0,
        avg_precipitation: Some(2.0),
        wind_speed: Some(3.0),
        ph: 6.5,
        clay: Some(20.0),
        sand: Some(50.0),
        silt: Some(30.0),
        total_production: 100.0,
        area_ha: 50.0,
    }
}

fn reasons_for(record: CanonicalRecord) -> Vec<RejectionReason> {
    let filter = PhysicalValidityFilter::default();
    filter.violations(&GuardedRecord::annotate(record))
}

#[test]
fn test_valid_record_kept() {
    let outcome = PhysicalValidityFilter::default().validate(vec![valid()]);
    assert_eq!(outcome.kept.len(), 1);
    assert!(outcome.rejected.is_empty());
    assert_eq!(outcome.kept[0].efficiency(), Some(2.0));
}

#[test]
fn test_negative_ph_rejected() {
    let mut r = valid();
    r.ph = -1000.0;
    assert_eq!(reasons_for(r), vec![RejectionReason::InvalidPh]);
}

#[test]
fn test_zero_ph_rejected() {
    let mut r = valid();
    r.ph = 0.0;
    assert_eq!(reasons_for(r), vec![RejectionReason::InvalidPh]);
}

#[test]
fn test_cold_sentinel_rejected() {
    let mut r = valid();
    r.max_temp = -273.0;
    assert_eq!(reasons_for(r), vec![RejectionReason::TemperatureOutlier]);

    let mut at_floor = valid();
    at_floor.max_temp = -50.0;
    assert_eq!(reasons_for(at_floor), vec![RejectionReason::TemperatureOutlier]);
}

#[test]
fn test_efficiency_ceiling_rejected() {
    let mut r = valid();
    r.total_production = 600.0;
    r.area_ha = 50.0;
    assert_eq!(reasons_for(r), vec![RejectionReason::EfficiencyOutlier]);

    let mut at_ceiling = valid();
    at_ceiling.total_production = 500.0;
    assert_eq!(reasons_for(at_ceiling), vec![RejectionReason::EfficiencyOutlier]);
}

#[test]
fn test_zero_area_reports_area_only() {
    let mut r = valid();
    r.area_ha = 0.0;
    assert_eq!(reasons_for(r), vec![RejectionReason::InvalidArea]);
}

#[test]
fn test_all_violations_recorded() {
    let mut r = valid();
    r.ph = -1.0;
    r.max_temp = -300.0;
    r.total_production = 1200.0;
    assert_eq!(
        reasons_for(r),
        vec![
            RejectionReason::InvalidPh,
            RejectionReason::TemperatureOutlier,
            RejectionReason::EfficiencyOutlier,
        ]
    );
}

#[test]
fn test_nan_fails_directly() {
    let mut r = valid();
    r.ph = f64::NAN;
    r.max_temp = f64::INFINITY;
    assert_eq!(
        reasons_for(r),
        vec![RejectionReason::InvalidPh, RejectionReason::TemperatureOutlier]
    );
}

#[test]
fn test_non_finite_unconstrained_field() {
    let mut r = valid();
    r.clay = Some(f64::NAN);
    assert_eq!(reasons_for(r), vec![RejectionReason::NonFiniteValue]);

    let mut absent = valid();
    absent.clay = None;
    assert!(reasons_for(absent).is_empty());
}

#[test]
fn test_missing_district() {
    let mut r = valid();
    r.district = "  ".to_string();
    assert_eq!(reasons_for(r), vec![RejectionReason::MissingDistrict]);
}

#[test]
fn test_breakdown_counts_overlaps_once_per_reason() {
    let mut both = valid();
    both.ph = -1.0;
    both.max_temp = -273.0;
    let mut ph_only = valid();
    ph_only.ph = -2.0;

    let outcome = PhysicalValidityFilter::default().validate(vec![valid(), both, ph_only]);
    assert_eq!(outcome.total(), 3);
    assert_eq!(outcome.rejected.len(), 2);

    let breakdown = outcome.breakdown();
    assert_eq!(breakdown[&RejectionReason::InvalidPh], 2);
    assert_eq!(breakdown[&RejectionReason::TemperatureOutlier], 1);
    assert!(!breakdown.contains_key(&RejectionReason::InvalidArea));
}

#[test]
fn test_custom_limits() {
    let limits = ValidityLimits::new(4.0, 0.0, -50.0, 10.0).expect("valid limits");
    let filter = PhysicalValidityFilter::new(limits);
    let mut acidic = valid();
    acidic.ph = 3.5;
    assert_eq!(
        filter.violations(&GuardedRecord::annotate(acidic)),
        vec![RejectionReason::InvalidPh]
    );
}

#[test]
fn test_limits_validated() {
    assert!(ValidityLimits::new(f64::NAN, 0.0, -50.0, 10.0).is_err());
    assert!(ValidityLimits::new(0.0, -1.0, -50.0, 10.0).is_err());
    assert!(ValidityLimits::new(0.0, 0.0, -50.0, 0.0).is_err());
    assert!(ValidityLimits::default().validate().is_ok());
}

#[test]
fn test_reason_labels() {
    assert_eq!(RejectionReason::InvalidPh.to_string(), "InvalidPH");
    assert_eq!(
        serde_json::to_string(&RejectionReason::InvalidPh).expect("serialize"),
        "\"InvalidPH\""
    );
}
