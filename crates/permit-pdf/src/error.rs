use permit_types::TableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfTableError {
    #[error("Not a PDF file")]
    NotPdf,

    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Password-protected PDF")]
    PasswordProtected,

    #[error(
        "No extractable table found. Re-export the report as CSV/Excel or text, \
         or run OCR on a scanned PDF first."
    )]
    NoTableExtracted,

    #[error("Table assembly failed: {0}")]
    Table(#[from] TableError),
}
