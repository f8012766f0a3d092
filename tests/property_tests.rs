//! Property-based tests using proptest.
//!
//! These tests verify the cleaning and grouping invariants over generated
//! survey tables.

use cosecha::dataset::{leakage_check, LEAKAGE_COLUMNS};
use cosecha::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

const HEADER: &str = "District,Average_avg-Temp,Average-Min Temp,Average-max-temp,PH,Crop Yield,Hectare";

/// One raw row: district index, max temp, pH, production, area.
type RawRow = (usize, f64, f64, f64, f64);

// Values straddle every physical limit, including the sentinels.
fn raw_row_strategy(n_districts: usize) -> impl Strategy<Value = RawRow> {
    (
        0..n_districts,
        prop_oneof![Just(-273.0), -60.0f64..45.0],
        prop_oneof![Just(-1000.0), Just(0.0), 3.0f64..9.0],
        0.0f64..900.0,
        prop_oneof![Just(0.0), 1.0f64..120.0],
    )
}

fn table_from(rows: &[RawRow]) -> RawTable {
    let mut csv = format!("{HEADER}\n");
    for (d, max_temp, ph, production, area) in rows {
        csv.push_str(&format!(
            "D{d},26.0,20.0,{max_temp},{ph},{production},{area}\n"
        ));
    }
    RawTable::from_reader(csv.as_bytes()).expect("generated csv is valid")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cleaned_schema_never_leaks(rows in proptest::collection::vec(raw_row_strategy(6), 1..40)) {
        let run = CleaningPipeline::default().run(&table_from(&rows)).expect("runs");
        let columns = run.dataset.columns();
        for forbidden in LEAKAGE_COLUMNS {
            prop_assert!(!columns.iter().any(|c| c == forbidden));
        }
        prop_assert!(leakage_check(&columns).passed());
    }

    #[test]
    fn row_counts_reconcile(rows in proptest::collection::vec(raw_row_strategy(6), 1..40)) {
        let run = CleaningPipeline::default().run(&table_from(&rows)).expect("runs");
        let report = &run.report;
        prop_assert_eq!(report.original_rows, report.final_rows + report.dropped_rows);

        let failing = rows
            .iter()
            .filter(|(_, max_temp, ph, production, area)| {
                !(*ph > 0.0 && *area > 0.0 && *max_temp > -50.0 && production / area < 10.0)
            })
            .count();
        prop_assert_eq!(report.dropped_rows, failing);
        let reason_total: usize = report.rejections.values().sum();
        prop_assert!(reason_total >= report.dropped_rows);
    }

    #[test]
    fn kept_records_satisfy_limits(rows in proptest::collection::vec(raw_row_strategy(6), 1..40)) {
        let run = CleaningPipeline::default().run(&table_from(&rows)).expect("runs");
        for guarded in &run.outcome.kept {
            let record = guarded.record();
            prop_assert!(record.value(CanonicalField::Ph).expect("required") > 0.0);
            prop_assert!(record.value(CanonicalField::AreaHa).expect("required") > 0.0);
            prop_assert!(record.value(CanonicalField::MaxTemp).expect("required") > -50.0);
            prop_assert!(guarded.efficiency().expect("positive area") < 10.0);
        }
        for (guarded, clean) in run.outcome.kept.iter().zip(run.dataset.records()) {
            prop_assert_eq!(Some(clean.yield_per_ha), guarded.efficiency());
        }
    }

    #[test]
    fn cleaning_is_idempotent(rows in proptest::collection::vec(raw_row_strategy(6), 1..40)) {
        let pipeline = CleaningPipeline::default();
        let raw = table_from(&rows);
        let first = pipeline.run(&raw).expect("runs");
        let second = pipeline.run(&raw.select_rows(&first.kept_rows())).expect("runs");
        prop_assert_eq!(second.report.dropped_rows, 0);
        prop_assert_eq!(second.dataset.records(), first.dataset.records());
    }

    #[test]
    fn fold_assignment_partitions_groups(
        groups in proptest::collection::vec(0usize..12, 1..80),
        k in 2usize..6,
    ) {
        let names: Vec<String> = groups.iter().map(|g| format!("g{g}")).collect();
        let distinct: BTreeSet<&String> = names.iter().collect();
        let cv = GroupKFold::new(k).expect("k >= 2");
        let result = cv.assign(&names);

        if distinct.len() < k {
            let is_insufficient = matches!(result, Err(CosechaError::InsufficientGroups { .. }));
            prop_assert!(is_insufficient);
        } else {
            let assignment = result.expect("enough groups");
            let mut held_out = BTreeSet::new();
            for fold in 0..k {
                let fold_groups = assignment.held_out_groups(fold);
                prop_assert!(!fold_groups.is_empty());
                for group in fold_groups {
                    prop_assert!(held_out.insert(group.to_string()));
                }
            }
            prop_assert_eq!(held_out.len(), distinct.len());

            for (train, test) in assignment.splits() {
                let train_groups: BTreeSet<&str> = train.iter().map(|&i| names[i].as_str()).collect();
                for i in test {
                    prop_assert!(!train_groups.contains(names[i].as_str()));
                }
            }

            let sizes: Vec<usize> = (0..k).map(|f| assignment.held_out_groups(f).len()).collect();
            let spread = sizes.iter().max().expect("k folds") - sizes.iter().min().expect("k folds");
            prop_assert!(spread <= 1);
        }
    }
}
