use super::{FilterConfig, FilterKind, RowPredicate};
use crate::calendar::months_remaining;
use crate::mapper::MappedTable;
use chrono::NaiveDate;
use permit_types::{CanonicalField, Notice, RowRef};
use tracing::warn;

/// Keeps rows whose expiration is at most `max_months` calendar months away.
/// Rows without a readable expiration date are dropped.
#[derive(Debug, Clone)]
pub struct DateWindowFilter {
    column: &'static str,
    today: NaiveDate,
    max_months: i32,
}

impl DateWindowFilter {
    pub fn build(
        mapped: &MappedTable,
        config: &FilterConfig,
        today: NaiveDate,
        notices: &mut Vec<Notice>,
    ) -> Option<Self> {
        let Some(column) = mapped.column(CanonicalField::ExpirationDate) else {
            notices.push(Notice::MissingOptionalColumn {
                field: CanonicalField::ExpirationDate,
                consumer: "months-remaining filter".to_string(),
            });
            return None;
        };

        let unparseable = mapped
            .table()
            .column_values(column)
            .map(|values| {
                values
                    .filter(|v| !v.is_missing() && v.to_date().is_none())
                    .count()
            })
            .unwrap_or(0);
        if unparseable > 0 {
            warn!(count = unparseable, "Unparseable expiration dates");
            notices.push(Notice::UnparseableDates {
                field: CanonicalField::ExpirationDate,
                count: unparseable,
            });
        }

        Some(Self {
            column,
            today,
            max_months: config.max_months_remaining,
        })
    }

    pub fn months_remaining(&self, row: RowRef<'_>) -> Option<i32> {
        row.get(self.column)
            .to_date()
            .map(|expiration| months_remaining(expiration, self.today))
    }
}

impl RowPredicate for DateWindowFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::DateWindow
    }

    fn keep(&self, row: RowRef<'_>) -> bool {
        self.months_remaining(row)
            .is_some_and(|months| months <= self.max_months)
    }
}
