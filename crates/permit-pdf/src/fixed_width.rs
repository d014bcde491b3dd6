//! Fixed-width text fallback
//!
//! Reports printed from line-oriented systems carry no grid structure: every
//! row is a single run with columns padded by spaces. Columns are recovered
//! by splitting on runs of two or more whitespace characters.
//!
//! Rows whose column count differs from the header are dropped, never padded
//! or truncated, so a shifted value can not land under the wrong heading.

use lazy_static::lazy_static;
use permit_types::{unique_column_names, CellValue, RecordTable, TableError};
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref PAGE_FOOTER: Regex = Regex::new(r"(?i)\bpage\s+\d+\s+of\s+\d+\b").unwrap();
    static ref COLUMN_GAP: Regex = Regex::new(r"\s{2,}").unwrap();
    static ref PERMIT_NUMBER: Regex = Regex::new(r"^[A-Za-z]{2}\d{2}-\d+").unwrap();
}

/// Split a line into trimmed, non-empty columns
pub fn split_columns(line: &str) -> Vec<String> {
    COLUMN_GAP
        .split(line.trim())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_page_footer(line: &str) -> bool {
    PAGE_FOOTER.is_match(line)
}

pub fn is_header_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("permit") && (lower.contains("issued") || lower.contains("date"))
}

pub fn starts_with_permit_number(line: &str) -> bool {
    PERMIT_NUMBER.is_match(line.trim_start())
}

/// Header-like lines above the first data row, closest first. A line as wide
/// as the first data row wins over a report title that also names permits.
fn pick_header(lines: &[String], data_width: Option<usize>) -> Option<Vec<String>> {
    let first_data = lines
        .iter()
        .position(|l| starts_with_permit_number(l))
        .unwrap_or(lines.len());
    let above: Vec<Vec<String>> = lines[..first_data]
        .iter()
        .rev()
        .filter(|l| is_header_line(l))
        .map(|l| split_columns(l))
        .collect();

    if let Some(width) = data_width {
        if let Some(fitting) = above.iter().find(|names| names.len() == width) {
            return Some(fitting.clone());
        }
    }
    if let Some(closest) = above.into_iter().next() {
        return Some(closest);
    }
    lines
        .iter()
        .find(|l| is_header_line(l))
        .map(|l| split_columns(l))
}

/// Rebuild a table from page lines. Returns `Ok(None)` when no data row
/// survives.
pub fn reconstruct<I, S>(lines: I) -> Result<Option<RecordTable>, TableError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lines: Vec<String> = lines
        .into_iter()
        .map(|l| l.as_ref().to_string())
        .filter(|l| !l.trim().is_empty() && !is_page_footer(l))
        .collect();

    let candidates: Vec<Vec<String>> = lines
        .iter()
        .filter(|l| starts_with_permit_number(l))
        .map(|l| split_columns(l))
        .collect();

    let header = pick_header(&lines, candidates.first().map(Vec::len));

    let columns = match header {
        Some(names) => unique_column_names(&names),
        None => {
            let Some(width) = candidates.first().map(Vec::len) else {
                return Ok(None);
            };
            debug!(width, "No header line found, using positional names");
            (1..=width).map(|n| format!("col_{n}")).collect()
        }
    };

    let width = columns.len();
    let total = candidates.len();
    let rows: Vec<Vec<CellValue>> = candidates
        .into_iter()
        .filter(|cells| cells.len() == width)
        .map(|cells| cells.iter().map(|c| CellValue::from_text(c)).collect())
        .collect();

    if rows.len() < total {
        debug!(dropped = total - rows.len(), width, "Dropped rows with mismatched width");
    }
    if rows.is_empty() {
        return Ok(None);
    }

    RecordTable::from_rows(columns, rows).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_and_row_widths_match() {
        let table = reconstruct([
            "Grass Valley Building Division",
            "Permit #  Issued  Owner  Address",
            "BLD24-02314  06/05/2025  Jane Doe  123 Main St",
            "Page 1 of 1",
        ])
        .unwrap()
        .unwrap();

        assert_eq!(table.columns(), &["Permit #", "Issued", "Owner", "Address"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.row(0).get("Owner").as_text(), "Jane Doe");
    }

    #[test]
    fn test_report_title_is_not_the_header() {
        let table = reconstruct([
            "City of Auburn - Building Permits Issued    June 2025",
            "Permit #  Issued  Owner  Address",
            "BLD24-02314  06/05/2025  Jane Doe  123 Main St",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(table.columns(), &["Permit #", "Issued", "Owner", "Address"]);
        assert_eq!(table.row(0).get("Address").as_text(), "123 Main St");
    }

    #[test]
    fn test_closest_header_above_data_when_no_width_matches() {
        let table = reconstruct([
            "Permits Issued    June 2025",
            "Permit No    Issue Date    Status",
            "BLD24-00001  01/02/2025    Issued    extra",
            "BLD24-00002  01/03/2025    Issued",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(table.columns(), &["Permit No", "Issue Date", "Status"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.row(0).get("Permit No").as_text(), "BLD24-00002");
    }

    #[test]
    fn test_mismatched_rows_are_dropped() {
        let table = reconstruct([
            "Permit No    Issue Date    Status",
            "BLD24-00001  01/02/2025    Issued",
            "BLD24-00002  01/03/2025    Issued    extra",
            "RES24-00003  01/04/2025",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.row(0).get("Permit No").as_text(), "BLD24-00001");
    }

    #[test]
    fn test_positional_names_without_header() {
        let table = reconstruct(["BLD24-1  Roof", "BLD24-2  Deck"]).unwrap().unwrap();
        assert_eq!(table.columns(), &["col_1", "col_2"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_no_data_rows() {
        assert!(reconstruct(["Permit  Issued", "nothing here"]).unwrap().is_none());
        assert!(reconstruct(Vec::<String>::new()).unwrap().is_none());
    }

    #[test]
    fn test_patterns() {
        assert!(is_page_footer("  Page 3 of 12"));
        assert!(!is_page_footer("Pages 3"));
        assert!(starts_with_permit_number("bl24-9"));
        assert!(!starts_with_permit_number("B24-9"));
        assert!(is_header_line("PERMIT NUMBER   APPLIED DATE"));
        assert!(!is_header_line("Issued   Owner"));
        assert_eq!(split_columns(" a b  c\t\td "), vec!["a b", "c", "d"]);
    }

    proptest! {
        #[test]
        fn split_columns_never_keeps_wide_gaps(words in prop::collection::vec("[A-Za-z0-9#/-]{1,8}", 1..8), gap in 2usize..6) {
            let line = words.join(&" ".repeat(gap));
            let columns = split_columns(&line);
            prop_assert_eq!(columns, words);
        }
    }
}
