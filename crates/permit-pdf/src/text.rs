//! Page text as lines, for the fixed-width fallback
//!
//! Lines are rebuilt from the positioned runs the layout walker recovered.
//! When that yields nothing usable (Type3 fonts, unusual encodings) the
//! document is handed to pdf-extract and its form-feed separated output is
//! used instead.

use crate::types::{ExtractionConfig, PageLayout, TextItem};
use pdf_extract::extract_text_from_mem;
use tracing::{debug, warn};

/// Gaps wider than this many ems are kept as a column break
const COLUMN_GAP_EMS: f64 = 1.5;

/// Gaps wider than this many ems become a single space
const WORD_GAP_EMS: f64 = 0.15;

/// Share of non-printable characters above which layout text is distrusted
const GARBLED_RATIO: f64 = 0.3;

/// Rebuild the text lines of one page, top to bottom
pub fn page_lines(page: &PageLayout, config: &ExtractionConfig) -> Vec<String> {
    let mut items: Vec<&TextItem> = page.items.iter().collect();
    items.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut rows: Vec<Vec<&TextItem>> = Vec::new();
    for item in items {
        match rows.last_mut() {
            Some(row) if row.first().is_some_and(|first| (first.y - item.y).abs() <= config.row_tolerance) => {
                row.push(item)
            }
            _ => rows.push(vec![item]),
        }
    }

    rows.into_iter()
        .map(|mut row| {
            row.sort_by(|a, b| a.x.total_cmp(&b.x));
            join_row(&row)
        })
        .filter(|line| !line.trim().is_empty())
        .collect()
}

fn join_row(row: &[&TextItem]) -> String {
    let mut line = String::new();
    let mut previous: Option<&TextItem> = None;
    for item in row {
        if let Some(prev) = previous {
            let gap = item.x - prev.right();
            let em = prev.font_size.max(1.0);
            if gap > COLUMN_GAP_EMS * em {
                line.push_str("  ");
            } else if gap > WORD_GAP_EMS * em {
                line.push(' ');
            }
        }
        line.push_str(&item.text);
        previous = Some(item);
    }
    line
}

fn looks_garbled(lines: &[String]) -> bool {
    let total: usize = lines.iter().map(|l| l.chars().count()).sum();
    if total == 0 {
        return true;
    }
    let suspicious = lines
        .iter()
        .flat_map(|l| l.chars())
        .filter(|c| *c == '\u{FFFD}' || (c.is_control() && *c != '\t'))
        .count();
    suspicious as f64 / total as f64 > GARBLED_RATIO
}

/// Lines for every page, falling back to pdf-extract when the layout text
/// is empty or garbled
pub fn document_lines(bytes: &[u8], layouts: &[PageLayout], config: &ExtractionConfig) -> Vec<Vec<String>> {
    let pages: Vec<Vec<String>> = layouts.iter().map(|page| page_lines(page, config)).collect();
    let flattened: Vec<String> = pages.iter().flatten().cloned().collect();
    if !looks_garbled(&flattened) {
        return pages;
    }

    debug!("Layout text unusable, trying pdf-extract");
    match extract_text_from_mem(bytes) {
        Ok(text) => split_pages(&text, config.max_pages),
        Err(e) => {
            warn!(error = %e, "pdf-extract failed");
            pages
        }
    }
}

/// Split extracted text on form feeds into per-page line lists
pub fn split_pages(text: &str, max_pages: Option<usize>) -> Vec<Vec<String>> {
    text.split('\x0C')
        .take(max_pages.unwrap_or(usize::MAX))
        .map(|page| {
            page.lines()
                .map(|l| l.trim_end().to_string())
                .filter(|l| !l.trim().is_empty())
                .collect()
        })
        .collect()
}
