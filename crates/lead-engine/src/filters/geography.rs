use super::{FilterConfig, FilterKind, RowPredicate};
use crate::mapper::MappedTable;
use permit_types::{CanonicalField, Notice, RowRef};
use std::collections::HashSet;
use tracing::debug;

/// Matched in this order; only the first mapped field is used
const GEOGRAPHY_FIELDS: [CanonicalField; 3] = [
    CanonicalField::County,
    CanonicalField::City,
    CanonicalField::Zip,
];

/// Keeps rows whose County (or City, or ZIP) is one of the targets
#[derive(Debug, Clone)]
pub struct GeographyFilter {
    field: CanonicalField,
    column: &'static str,
    targets: HashSet<String>,
}

impl GeographyFilter {
    pub fn build(mapped: &MappedTable, config: &FilterConfig, notices: &mut Vec<Notice>) -> Option<Self> {
        let targets: HashSet<String> = config
            .counties
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if targets.is_empty() {
            return None;
        }

        let Some((field, column)) = GEOGRAPHY_FIELDS
            .iter()
            .find_map(|f| mapped.column(*f).map(|c| (*f, c)))
        else {
            notices.push(Notice::MissingOptionalColumn {
                field: CanonicalField::County,
                consumer: "geography filter".to_string(),
            });
            return None;
        };

        debug!(%field, "Geography filter column");
        Some(Self {
            field,
            column,
            targets,
        })
    }

    /// The field the targets are matched against
    pub fn field(&self) -> CanonicalField {
        self.field
    }
}

impl RowPredicate for GeographyFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Geography
    }

    fn keep(&self, row: RowRef<'_>) -> bool {
        self.targets.contains(row.get(self.column).as_text().trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permit_types::{CellValue, RecordTable};

    fn mapped(columns: &[&str]) -> MappedTable {
        let table = RecordTable::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![columns.iter().map(|_| CellValue::from_text("95603")).collect()],
        )
        .unwrap();
        MappedTable::assume_canonical(table)
    }

    #[test]
    fn test_falls_back_to_city_then_zip() {
        let config = FilterConfig {
            counties: vec!["95603".into()],
            ..FilterConfig::default()
        };
        let mut notices = Vec::new();

        let zip_only = GeographyFilter::build(&mapped(&["ZIP"]), &config, &mut notices).unwrap();
        assert_eq!(zip_only.field(), CanonicalField::Zip);

        let city_and_zip = GeographyFilter::build(&mapped(&["ZIP", "City"]), &config, &mut notices).unwrap();
        assert_eq!(city_and_zip.field(), CanonicalField::City);

        let all = GeographyFilter::build(&mapped(&["ZIP", "City", "County"]), &config, &mut notices).unwrap();
        assert_eq!(all.field(), CanonicalField::County);
        assert!(notices.is_empty());
    }

    #[test]
    fn test_unmapped_geography_is_skipped_with_notice() {
        let mut notices = Vec::new();
        let filter = GeographyFilter::build(&mapped(&["Owner"]), &FilterConfig::default(), &mut notices);
        assert!(filter.is_none());
        assert_eq!(notices.len(), 1);
    }
}
