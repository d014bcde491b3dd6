//! Table recovery from PDF permit reports
//!
//! Extraction runs in two stages:
//!
//! 1. **Structured**: every page's text runs and ruling lines are recovered
//!    from the content stream and four grid strategies (lines or text per
//!    axis) are tried. All tables found are stacked into one.
//! 2. **Fixed-width**: only when stage 1 finds nothing, page text is read
//!    line by line and split on runs of whitespace.
//!
//! If both stages come back empty the caller gets
//! [`PdfTableError::NoTableExtracted`].

pub mod error;
pub mod fixed_width;
pub mod grid;
pub mod layout;
pub mod text;
pub mod types;

pub use error::PdfTableError;
pub use grid::{EdgeSource, Grid, GridStrategy};
pub use types::{ExtractionConfig, ExtractionStage, PageLayout, TextItem};

use lopdf::Document;
use permit_types::{Notice, RecordTable};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Result of a successful extraction
#[derive(Debug, Clone)]
pub struct TableExtraction {
    pub table: RecordTable,
    pub stage: ExtractionStage,
    pub pages_scanned: usize,
    /// Non-fatal conditions met along the way
    pub notices: Vec<Notice>,
}

fn classify_load_error(error: lopdf::Error) -> PdfTableError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("encrypt") || lower.contains("password") || lower.contains("decrypt") {
        PdfTableError::PasswordProtected
    } else {
        PdfTableError::ParseError(message)
    }
}

/// Recover a single table from PDF bytes
#[instrument(skip(bytes, config), fields(size = bytes.len()))]
pub fn extract_table(bytes: &[u8], config: &ExtractionConfig) -> Result<TableExtraction, PdfTableError> {
    if !bytes.starts_with(b"%PDF") {
        return Err(PdfTableError::NotPdf);
    }

    let doc = Document::load_mem(bytes).map_err(classify_load_error)?;
    if doc.is_encrypted() {
        return Err(PdfTableError::PasswordProtected);
    }

    let layouts = layout::page_layouts(&doc, config.max_pages);
    let pages_scanned = layouts.len();
    let mut notices = Vec::new();

    // Stage 1
    let budget = Duration::from_millis(config.time_budget_ms);
    let started = Instant::now();
    let mut tables: Vec<RecordTable> = Vec::new();
    for page in &layouts {
        if started.elapsed() >= budget {
            warn!(page = page.page_number, budget_ms = config.time_budget_ms, "Structured extraction out of time");
            notices.push(Notice::Advisory {
                message: format!(
                    "Table detection stopped at page {} after {} ms; later pages were not scanned for grids.",
                    page.page_number, config.time_budget_ms
                ),
            });
            break;
        }
        for grid in grid::page_grids(page, config) {
            debug!(page = grid.page_number, strategy = ?grid.strategy, rows = grid.cells.len(), "Grid detected");
            tables.push(grid.into_table()?);
        }
    }

    let structured = RecordTable::concat(&tables);
    if !structured.is_empty() {
        info!(tables = tables.len(), rows = structured.len(), "Structured extraction succeeded");
        return Ok(TableExtraction {
            table: structured,
            stage: ExtractionStage::Structured,
            pages_scanned,
            notices,
        });
    }

    // Stage 2
    let pages = text::document_lines(bytes, &layouts, config);
    match fixed_width::reconstruct(pages.iter().flatten())? {
        Some(table) => {
            info!(rows = table.len(), columns = table.columns().len(), "Fixed-width fallback succeeded");
            Ok(TableExtraction {
                table,
                stage: ExtractionStage::FixedWidth,
                pages_scanned,
                notices,
            })
        }
        None => Err(PdfTableError::NoTableExtracted),
    }
}
