//! Tabular ingestion for permit reports
//!
//! Normalizes an upload (delimited text, workbook or PDF) into one
//! [`RecordTable`]. The first row is always the header.

pub mod delimited;
pub mod error;
pub mod format;
pub mod spreadsheet;

pub use error::IngestError;
pub use format::{detect_format, SourceFormat};

use permit_pdf::{ExtractionConfig, ExtractionStage};
use permit_types::{Notice, RecordTable};
use serde::{Deserialize, Serialize};
use spreadsheet::WorkbookKind;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub extraction: ExtractionConfig,
}

/// An ingested upload
#[derive(Debug, Clone)]
pub struct Ingested {
    pub table: RecordTable,
    pub format: SourceFormat,
    /// Set for PDF input only
    pub pdf_stage: Option<ExtractionStage>,
    pub notices: Vec<Notice>,
}

/// Read an upload into a table. `file_name` is only used for its extension.
#[instrument(skip(bytes, options), fields(size = bytes.len()))]
pub fn ingest(file_name: Option<&str>, bytes: &[u8], options: &IngestOptions) -> Result<Ingested, IngestError> {
    let format = detect_format(file_name, bytes)?;

    let (table, pdf_stage, notices) = match format {
        SourceFormat::Delimited(delimiter) => (delimited::read_delimited(bytes, delimiter)?, None, Vec::new()),
        SourceFormat::Xlsx => (spreadsheet::read_workbook(bytes, WorkbookKind::Xlsx)?, None, Vec::new()),
        SourceFormat::Xls => (spreadsheet::read_workbook(bytes, WorkbookKind::Xls)?, None, Vec::new()),
        SourceFormat::Pdf => {
            let extraction = permit_pdf::extract_table(bytes, &options.extraction)?;
            (extraction.table, Some(extraction.stage), extraction.notices)
        }
    };

    info!(
        %format,
        rows = table.len(),
        columns = table.columns().len(),
        "Ingested upload"
    );

    Ok(Ingested {
        table,
        format,
        pdf_stage,
        notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_csv_by_name() {
        let ingested = ingest(
            Some("permits.csv"),
            b"Permit #,Expiration Date\nBLD1,2025-09-01\n",
            &IngestOptions::default(),
        )
        .unwrap();
        assert_eq!(ingested.format, SourceFormat::Delimited(b','));
        assert_eq!(ingested.table.len(), 1);
        assert!(ingested.pdf_stage.is_none());
    }

    #[test]
    fn test_pdf_extension_with_text_content() {
        let err = ingest(Some("report.pdf"), b"Permit,Status\n", &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_unknown_binary_is_rejected() {
        let err = ingest(Some("scan.jpg"), &[0xFF, 0xD8, 0xFF, 0xE0, 0x80], &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }
}
