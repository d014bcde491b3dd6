use permit_pdf::PdfTableError;
use permit_types::TableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported file format: {0}. Upload a CSV, Excel workbook or PDF.")]
    UnsupportedFormat(String),

    #[error(
        "No extractable table found. Re-export the report as CSV/Excel or text, \
         or run OCR on a scanned PDF first."
    )]
    NoTableExtracted,

    #[error("Failed to read delimited text: {0}")]
    Delimited(#[from] csv::Error),

    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("Failed to read PDF: {0}")]
    Pdf(PdfTableError),

    #[error("The file has no header row")]
    Empty,

    #[error("Table assembly failed: {0}")]
    Table(#[from] TableError),
}

impl From<PdfTableError> for IngestError {
    fn from(error: PdfTableError) -> Self {
        match error {
            PdfTableError::NoTableExtracted => IngestError::NoTableExtracted,
            PdfTableError::NotPdf => IngestError::UnsupportedFormat("file is not a PDF".to_string()),
            PdfTableError::Table(e) => IngestError::Table(e),
            other => IngestError::Pdf(other),
        }
    }
}
