use super::{FilterConfig, FilterKind, RowPredicate};
use crate::mapper::MappedTable;
use permit_types::{CanonicalField, Notice, RowRef};
use std::collections::HashSet;

/// Keeps rows whose status text is one of the allowed values (exact match)
#[derive(Debug, Clone)]
pub struct StatusFilter {
    column: &'static str,
    allowed: HashSet<String>,
}

impl StatusFilter {
    pub fn build(mapped: &MappedTable, config: &FilterConfig, notices: &mut Vec<Notice>) -> Option<Self> {
        let allowed: HashSet<String> = config
            .statuses
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if allowed.is_empty() {
            return None;
        }

        let Some(column) = mapped.column(CanonicalField::Status) else {
            notices.push(Notice::MissingOptionalColumn {
                field: CanonicalField::Status,
                consumer: "status filter".to_string(),
            });
            return None;
        };

        Some(Self { column, allowed })
    }
}

impl RowPredicate for StatusFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Status
    }

    fn keep(&self, row: RowRef<'_>) -> bool {
        self.allowed.contains(row.get(self.column).as_text().trim())
    }
}
