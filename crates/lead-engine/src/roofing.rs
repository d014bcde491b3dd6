//! Roofing flag detection

use crate::mapper::MappedTable;
use crate::patterns::ROOFING_SOURCE_FIELDS;
use permit_types::RowRef;

/// Flags a row as roofing work when any keyword occurs, case-insensitively,
/// in any mapped source field. Unmapped fields contribute nothing.
#[derive(Debug, Clone)]
pub struct RoofingDetector {
    columns: Vec<&'static str>,
    keywords: Vec<String>,
}

impl RoofingDetector {
    pub fn new<S: AsRef<str>>(mapped: &MappedTable, keywords: &[S]) -> Self {
        let columns = ROOFING_SOURCE_FIELDS
            .iter()
            .filter_map(|field| mapped.column(*field))
            .collect();
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { columns, keywords }
    }

    /// Whether any source field is mapped at all
    pub fn has_sources(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn is_roofing(&self, row: RowRef<'_>) -> bool {
        self.columns.iter().any(|column| {
            let cell = row.get(column);
            self.keywords.iter().any(|k| cell.contains_lowercase(k))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permit_types::{CellValue, RecordTable};
    use proptest::prelude::*;

    fn mapped(columns: &[&str], values: &[&str]) -> MappedTable {
        let table = RecordTable::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![values.iter().map(|v| CellValue::from_text(v)).collect()],
        )
        .unwrap();
        MappedTable::assume_canonical(table)
    }

    #[test]
    fn test_detects_in_any_source_field() {
        let t = mapped(&["Description", "Permit Type"], &["Kitchen remodel", "RE-ROOF"]);
        let detector = RoofingDetector::new(&t, &["roof", "shingle"]);
        assert!(detector.is_roofing(t.table().row(0)));
    }

    #[test]
    fn test_unmapped_fields_contribute_false() {
        let t = mapped(&["Notes"], &["new roof"]);
        let detector = RoofingDetector::new(&t, &["roof"]);
        assert!(!detector.has_sources());
        assert!(!detector.is_roofing(t.table().row(0)));
    }

    proptest! {
        #[test]
        fn flag_matches_substring_truth_table(
            description in "[a-zA-Z ]{0,20}",
            scope in "[a-zA-Z ]{0,20}",
            keyword in "[a-z]{1,4}"
        ) {
            let t = mapped(&["Description", "Scope"], &[&description, &scope]);
            let detector = RoofingDetector::new(&t, &[keyword.as_str()]);
            let expected = description.trim().to_lowercase().contains(&keyword)
                || scope.trim().to_lowercase().contains(&keyword);
            prop_assert_eq!(detector.is_roofing(t.table().row(0)), expected);
        }
    }
}
