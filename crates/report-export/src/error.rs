use crate::ExportFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("{0} export is unavailable in this build; use CSV instead")]
    BackendUnavailable(ExportFormat),

    #[error("There is no table to export")]
    NothingToExport,

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "xlsx")]
    #[error("Workbook write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[cfg(feature = "pdf")]
    #[error("PDF write failed: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
