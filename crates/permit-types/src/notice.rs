use crate::field::CanonicalField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-fatal conditions surfaced to the user alongside a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Notice {
    /// A field was left unmapped, so whatever depends on it was skipped
    MissingOptionalColumn {
        field: CanonicalField,
        consumer: String,
    },
    /// None of the configured search columns exist, so the search was skipped
    SearchColumnsMissing { columns: Vec<String> },
    /// Some cells of a date field could not be parsed and were treated as missing
    UnparseableDates { field: CanonicalField, count: usize },
    /// An export format is compiled out or failed to initialize
    ExportBackendUnavailable { format: String },
    /// Filters removed every row
    NoLeadsMatched,
    /// Free-form advisory from an extraction stage
    Advisory { message: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::MissingOptionalColumn { field, consumer } => {
                write!(f, "{} is not mapped; skipped {}", field, consumer)
            }
            Notice::SearchColumnsMissing { columns } if columns.is_empty() => {
                f.write_str("No search columns are configured; skipped search")
            }
            Notice::SearchColumnsMissing { columns } => write!(
                f,
                "Search columns not found in the table ({}); skipped search",
                columns.join(", ")
            ),
            Notice::UnparseableDates { field, count } => write!(
                f,
                "{} {} value(s) could not be read as dates and were treated as missing",
                count, field
            ),
            Notice::ExportBackendUnavailable { format } => write!(
                f,
                "{} export is unavailable in this build; use CSV instead",
                format
            ),
            Notice::NoLeadsMatched => f.write_str(
                "No rows matched your filters. Try widening months, adding statuses, or adjusting county names.",
            ),
            Notice::Advisory { message } => f.write_str(message),
        }
    }
}
