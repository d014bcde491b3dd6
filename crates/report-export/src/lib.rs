//! Report export: delimited text, workbook and paginated PDF
//!
//! CSV is always compiled in. The workbook and PDF writers sit behind the
//! `xlsx` and `pdf` features; when one is compiled out,
//! [`available_formats`] omits it and reports a notice instead.

pub mod delimited;
pub mod error;
#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "xlsx")]
pub mod xlsx;

pub use error::ExportError;

use permit_types::{Notice, RecordTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Pdf];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// Whether the writer for this format is compiled in
    pub fn is_available(&self) -> bool {
        match self {
            ExportFormat::Csv => true,
            ExportFormat::Xlsx => cfg!(feature = "xlsx"),
            ExportFormat::Pdf => cfg!(feature = "pdf"),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("CSV"),
            ExportFormat::Xlsx => f.write_str("Excel"),
            ExportFormat::Pdf => f.write_str("PDF"),
        }
    }
}

fn default_title() -> String {
    "Permit Leads Report".to_string()
}

fn default_file_stem() -> String {
    "permit_leads".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    #[serde(default = "default_title")]
    pub title: String,
    /// Printed under the title in PDF output
    #[serde(default)]
    pub metadata_line: Option<String>,
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: default_title(),
            metadata_line: None,
            file_stem: default_file_stem(),
        }
    }
}

/// A table plus the sheet or section name it is exported under
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTable {
    pub name: String,
    pub table: RecordTable,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, table: RecordTable) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }

    /// The default lead sheet
    pub fn leads(table: RecordTable) -> Self {
        Self::new("Leads", table)
    }
}

/// A finished download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Formats that can be produced by this build, with a notice for each one
/// that cannot
pub fn available_formats() -> (Vec<ExportFormat>, Vec<Notice>) {
    let mut formats = Vec::new();
    let mut notices = Vec::new();
    for format in ExportFormat::ALL {
        if format.is_available() {
            formats.push(format);
        } else {
            notices.push(Notice::ExportBackendUnavailable {
                format: format.to_string(),
            });
        }
    }
    (formats, notices)
}

/// Serialize `tables` in `format`. The first table is the primary one; CSV
/// only carries that one.
#[instrument(skip(tables, options), fields(tables = tables.len()))]
pub fn export(tables: &[NamedTable], format: ExportFormat, options: &ExportOptions) -> Result<ExportArtifact, ExportError> {
    if tables.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let bytes = match format {
        ExportFormat::Csv => delimited::write_csv(&tables[0].table)?,
        #[cfg(feature = "xlsx")]
        ExportFormat::Xlsx => xlsx::write_workbook(tables)?,
        #[cfg(feature = "pdf")]
        ExportFormat::Pdf => pdf::write_report(tables, options)?,
        #[allow(unreachable_patterns)]
        unavailable => return Err(ExportError::BackendUnavailable(unavailable)),
    };

    let file_name = format!("{}.{}", options.file_stem, format.extension());
    info!(%format, file = %file_name, size = bytes.len(), "Export written");

    Ok(ExportArtifact {
        file_name,
        mime_type: format.mime_type(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use permit_types::CellValue;

    fn table() -> RecordTable {
        RecordTable::from_rows(
            vec!["Permit".into(), "ZIP".into()],
            vec![vec![CellValue::from_text("BLD1"), CellValue::Number(95603.0)]],
        )
        .unwrap()
    }

    #[test]
    fn test_csv_artifact_naming() {
        let artifact = export(&[NamedTable::leads(table())], ExportFormat::Csv, &ExportOptions::default()).unwrap();
        assert_eq!(artifact.file_name, "permit_leads.csv");
        assert_eq!(artifact.mime_type, "text/csv");
        assert_eq!(String::from_utf8(artifact.bytes).unwrap(), "Permit,ZIP\nBLD1,95603\n");
    }

    #[test]
    fn test_nothing_to_export() {
        let err = export(&[], ExportFormat::Csv, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::NothingToExport));
    }

    #[test]
    fn test_available_formats_match_features() {
        let (formats, notices) = available_formats();
        assert!(formats.contains(&ExportFormat::Csv));
        assert_eq!(formats.len() + notices.len(), 3);
        assert_eq!(formats.contains(&ExportFormat::Xlsx), cfg!(feature = "xlsx"));
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_xlsx_artifact() {
        let artifact = export(&[NamedTable::leads(table())], ExportFormat::Xlsx, &ExportOptions::default()).unwrap();
        assert_eq!(artifact.file_name, "permit_leads.xlsx");
        assert!(artifact.bytes.starts_with(b"PK"));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_artifact() {
        let options = ExportOptions {
            file_stem: "march".into(),
            ..ExportOptions::default()
        };
        let artifact = export(&[NamedTable::leads(table())], ExportFormat::Pdf, &options).unwrap();
        assert_eq!(artifact.file_name, "march.pdf");
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }
}
