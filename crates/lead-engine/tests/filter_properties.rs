//! Property-based tests for the lead filter engine
//!
//! Filtering keeps a subset of rows in source order, is idempotent and does
//! not depend on the order the predicates run in.

use chrono::{Duration, NaiveDate};
use lead_engine::{apply_filters, apply_filters_in_order, FilterConfig, FilterKind, MappedTable};
use permit_types::{CellValue, RecordTable};
use proptest::prelude::*;

const STATUSES: &[&str] = &["Issued", "In Progress", "Finaled", "Expired"];
const COUNTIES: &[&str] = &["Nevada", "Placer", "Yuba", "Sacramento", "Marin"];
const DESCRIPTIONS: &[&str] = &["Re-roof", "Kitchen remodel", "New deck", "Shingle repair", ""];

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

// ============================================================
// Strategies
// ============================================================

fn row() -> impl Strategy<Value = Vec<CellValue>> {
    (
        prop_oneof![(-400i64..800).prop_map(Some), Just(None)],
        0..STATUSES.len(),
        0..COUNTIES.len(),
        0..DESCRIPTIONS.len(),
    )
        .prop_map(|(offset, status, county, description)| {
            let expiration = match offset {
                Some(days) => CellValue::Date(today() + Duration::days(days)),
                None => CellValue::from_text("TBD"),
            };
            vec![
                expiration,
                CellValue::from_text(STATUSES[status]),
                CellValue::from_text(COUNTIES[county]),
                CellValue::from_text(DESCRIPTIONS[description]),
            ]
        })
}

fn table() -> impl Strategy<Value = MappedTable> {
    prop::collection::vec(row(), 0..40).prop_map(|rows| {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut cells)| {
                cells.insert(0, CellValue::Text(format!("BLD{i:04}")));
                cells
            })
            .collect();
        let columns = ["Permit", "Expiration Date", "Status", "County", "Description"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        MappedTable::assume_canonical(RecordTable::from_rows(columns, rows).unwrap())
    })
}

fn subset_of(values: &'static [&'static str]) -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(values.to_vec(), 0..=values.len())
        .prop_map(|v| v.into_iter().map(str::to_string).collect())
}

fn config() -> impl Strategy<Value = FilterConfig> {
    (
        -6i32..24,
        subset_of(STATUSES),
        subset_of(COUNTIES),
        any::<bool>(),
        prop_oneof![Just(""), Just("deck"), Just("ROOF"), Just("bld00")],
    )
        .prop_map(|(max_months, statuses, counties, exclude_roofing, query)| FilterConfig {
            max_months_remaining: max_months,
            statuses,
            counties,
            exclude_roofing,
            query: query.to_string(),
            ..FilterConfig::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn leads_are_an_ordered_subset(mapped in table(), config in config()) {
        let set = apply_filters(&mapped, &config, today());

        prop_assert_eq!(set.kept(), set.source_rows.len());
        prop_assert!(set.source_rows.windows(2).all(|w| w[0] < w[1]));
        for (lead, source) in set.table().raw_rows().iter().zip(&set.source_rows) {
            prop_assert_eq!(lead, &mapped.table().raw_rows()[*source]);
        }
        prop_assert_eq!(set.total(), mapped.table().len());
    }

    #[test]
    fn filtering_is_idempotent(mapped in table(), config in config()) {
        let once = apply_filters(&mapped, &config, today());
        let twice = apply_filters(&once.leads, &config, today());
        prop_assert_eq!(once.table(), twice.table());
    }

    #[test]
    fn filter_order_does_not_change_result(
        mapped in table(),
        config in config(),
        order in Just(FilterKind::ALL.to_vec()).prop_shuffle()
    ) {
        let standard = apply_filters(&mapped, &config, today());
        let shuffled = apply_filters_in_order(&mapped, &config, today(), &order);
        prop_assert_eq!(standard.table(), shuffled.table());
        prop_assert_eq!(standard.source_rows, shuffled.source_rows);
    }

    #[test]
    fn step_counts_never_increase(mapped in table(), config in config()) {
        let set = apply_filters(&mapped, &config, today());
        let mut previous = set.total();
        for step in &set.steps {
            prop_assert!(step.remaining <= previous);
            previous = step.remaining;
        }
        prop_assert_eq!(previous, set.kept());
    }
}
