//! Display projection of a lead table
//!
//! Preferred columns come first, the rest keep table order, and helper
//! columns (leading underscore) only appear when asked for.

use crate::calendar::months_remaining;
use crate::mapper::MappedTable;
use crate::patterns::{DISPLAY_PRIORITY, HELPER_PREFIX, MONTHS_REMAINING_COLUMN, ROOFING_RELATED_COLUMN};
use crate::roofing::RoofingDetector;
use chrono::NaiveDate;
use permit_types::{CanonicalField, CellValue, RecordTable, TableError};

/// Column order for display and export
pub fn display_columns(table: &RecordTable, show_helpers: bool) -> Vec<String> {
    let mut columns: Vec<String> = DISPLAY_PRIORITY
        .iter()
        .filter(|c| table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    for column in table.columns() {
        if !columns.contains(column) && !column.starts_with(HELPER_PREFIX) {
            columns.push(column.clone());
        }
    }
    if show_helpers {
        for helper in [MONTHS_REMAINING_COLUMN, ROOFING_RELATED_COLUMN] {
            if table.has_column(helper) {
                columns.push(helper.to_string());
            }
        }
    }
    columns
}

/// Append `_months_remaining` and `_roofing_related`
pub fn with_helper_columns<S: AsRef<str>>(
    mapped: &MappedTable,
    today: NaiveDate,
    roofing_keywords: &[S],
) -> Result<RecordTable, TableError> {
    let expiration = mapped.column(CanonicalField::ExpirationDate);
    let detector = RoofingDetector::new(mapped, roofing_keywords);

    mapped
        .table()
        .with_column(MONTHS_REMAINING_COLUMN, |row| {
            expiration
                .and_then(|c| row.get(c).to_date())
                .map(|d| CellValue::Number(months_remaining(d, today) as f64))
                .unwrap_or(CellValue::Missing)
        })?
        .with_column(ROOFING_RELATED_COLUMN, |row| {
            CellValue::Text(detector.is_roofing(row).to_string())
        })
}

/// The table as it should be shown and exported
pub fn display_table<S: AsRef<str>>(
    mapped: &MappedTable,
    today: NaiveDate,
    roofing_keywords: &[S],
    show_helpers: bool,
) -> Result<RecordTable, TableError> {
    let table = if show_helpers {
        with_helper_columns(mapped, today, roofing_keywords)?
    } else {
        mapped.table().clone()
    };
    let columns = display_columns(&table, show_helpers);
    table.select_columns(&columns)
}
