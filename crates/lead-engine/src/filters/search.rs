use super::{FilterConfig, FilterKind, RowPredicate};
use crate::mapper::MappedTable;
use permit_types::{Notice, RowRef};
use tracing::debug;

/// Keeps rows where any searched column contains the query, ignoring case
#[derive(Debug, Clone)]
pub struct SearchFilter {
    columns: Vec<String>,
    needle: String,
}

impl SearchFilter {
    /// Configured columns may name either the mapped label or the original
    /// header. When none of them resolve the search is skipped.
    pub fn build(mapped: &MappedTable, config: &FilterConfig, notices: &mut Vec<Notice>) -> Option<Self> {
        let needle = config.query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let table = mapped.table();
        let columns: Vec<String> = match &config.search_columns {
            Some(wanted) => {
                let mut columns: Vec<String> = Vec::new();
                for name in wanted {
                    match mapped.resolve_column(name.trim()) {
                        Some(column) if !columns.iter().any(|c| c == column) => columns.push(column.to_string()),
                        Some(_) => {}
                        None => debug!(column = %name, "Search column not in table"),
                    }
                }
                if columns.is_empty() {
                    notices.push(Notice::SearchColumnsMissing {
                        columns: wanted.clone(),
                    });
                    return None;
                }
                columns
            }
            None => table.columns().to_vec(),
        };

        Some(Self { columns, needle })
    }
}

impl RowPredicate for SearchFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Search
    }

    fn keep(&self, row: RowRef<'_>) -> bool {
        self.columns
            .iter()
            .any(|column| row.get(column).contains_lowercase(&self.needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::apply_filters;
    use crate::mapper::{apply_mapping, ColumnMapping};
    use chrono::NaiveDate;
    use permit_types::{CanonicalField, CellValue, RecordTable};
    use pretty_assertions::assert_eq;

    fn mapped() -> MappedTable {
        let columns = ["Permit No", "Work Description", "Owner"];
        let rows = [
            ["BLD1", "New deck", "Jane Doe"],
            ["BLD2", "Kitchen remodel", "Deck Builders LLC"],
        ];
        let table = RecordTable::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| CellValue::from_text(v)).collect())
                .collect(),
        )
        .unwrap();
        let mapping = ColumnMapping::new()
            .with(CanonicalField::Permit, "Permit No")
            .with(CanonicalField::Description, "Work Description");
        apply_mapping(&table, &mapping).unwrap()
    }

    fn search(query: &str, columns: Option<Vec<&str>>) -> FilterConfig {
        FilterConfig {
            max_months_remaining: 100,
            counties: vec![],
            statuses: vec![],
            exclude_roofing: false,
            query: query.into(),
            search_columns: columns.map(|cs| cs.into_iter().map(String::from).collect()),
            ..FilterConfig::default()
        }
    }

    fn kept(config: &FilterConfig) -> (Vec<usize>, Vec<Notice>) {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let set = apply_filters(&mapped(), config, today);
        let search_notices = set
            .notices
            .into_iter()
            .filter(|n| matches!(n, Notice::SearchColumnsMissing { .. }))
            .collect();
        (set.source_rows, search_notices)
    }

    #[test]
    fn test_search_every_column() {
        let (rows, _) = kept(&search("deck", None));
        assert_eq!(rows, vec![0, 1]);
    }

    #[test]
    fn test_source_header_resolves_to_mapped_label() {
        let (rows, notices) = kept(&search("deck", Some(vec!["Work Description"])));
        assert_eq!(rows, vec![0]);
        assert!(notices.is_empty());
    }

    #[test]
    fn test_canonical_label_and_unmapped_column() {
        let (rows, _) = kept(&search("deck", Some(vec!["Description", "Owner"])));
        assert_eq!(rows, vec![0, 1]);
    }

    #[test]
    fn test_partly_missing_columns_search_the_rest() {
        let (rows, notices) = kept(&search("deck", Some(vec!["Contractor", "Work Description"])));
        assert_eq!(rows, vec![0]);
        assert!(notices.is_empty());
    }

    #[test]
    fn test_no_resolvable_column_skips_search() {
        let (rows, notices) = kept(&search("deck", Some(vec!["Scope"])));
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(
            notices,
            vec![Notice::SearchColumnsMissing {
                columns: vec!["Scope".to_string()]
            }]
        );
    }

    #[test]
    fn test_empty_column_list_skips_search() {
        let (rows, notices) = kept(&search("deck", Some(vec![])));
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(notices, vec![Notice::SearchColumnsMissing { columns: vec![] }]);
    }
}
