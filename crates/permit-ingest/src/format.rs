//! Input format detection
//!
//! The file extension decides when it is one we know. Otherwise the leading
//! bytes are sniffed, and anything that decodes as UTF-8 is read as
//! comma-separated text.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// Delimited text with the given field separator
    Delimited(u8),
    /// Office Open XML workbook (.xlsx, .xlsm)
    Xlsx,
    /// Legacy binary workbook (.xls)
    Xls,
    Pdf,
}

impl SourceFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(SourceFormat::Delimited(b',')),
            "tsv" | "tab" => Some(SourceFormat::Delimited(b'\t')),
            "xlsx" | "xlsm" => Some(SourceFormat::Xlsx),
            "xls" => Some(SourceFormat::Xls),
            "pdf" => Some(SourceFormat::Pdf),
            _ => None,
        }
    }

    /// Guess from the leading bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PDF_MAGIC) {
            Some(SourceFormat::Pdf)
        } else if bytes.starts_with(ZIP_MAGIC) {
            Some(SourceFormat::Xlsx)
        } else if bytes.starts_with(OLE_MAGIC) {
            Some(SourceFormat::Xls)
        } else if !bytes.is_empty() && std::str::from_utf8(bytes).is_ok() {
            Some(SourceFormat::Delimited(b','))
        } else {
            None
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Delimited(b'\t') => f.write_str("TSV"),
            SourceFormat::Delimited(_) => f.write_str("CSV"),
            SourceFormat::Xlsx => f.write_str("XLSX"),
            SourceFormat::Xls => f.write_str("XLS"),
            SourceFormat::Pdf => f.write_str("PDF"),
        }
    }
}

/// Resolve the format of an upload from its name and content
pub fn detect_format(file_name: Option<&str>, bytes: &[u8]) -> Result<SourceFormat, IngestError> {
    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str());

    if let Some(format) = extension.and_then(SourceFormat::from_extension) {
        return Ok(format);
    }

    SourceFormat::sniff(bytes).ok_or_else(|| {
        IngestError::UnsupportedFormat(match (file_name, extension) {
            (_, Some(ext)) => format!(".{ext} files are not recognized"),
            (Some(name), None) => format!("{name} has no extension and unrecognized content"),
            (None, None) => "unrecognized content".to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_wins() {
        assert_eq!(
            detect_format(Some("Permits.CSV"), b"%PDF-1.7").unwrap(),
            SourceFormat::Delimited(b',')
        );
        assert_eq!(detect_format(Some("a.xlsx"), b"").unwrap(), SourceFormat::Xlsx);
        assert_eq!(detect_format(Some("a.tsv"), b"").unwrap(), SourceFormat::Delimited(b'\t'));
    }

    #[test]
    fn test_sniffing() {
        assert_eq!(detect_format(None, b"%PDF-1.4\n").unwrap(), SourceFormat::Pdf);
        assert_eq!(detect_format(Some("upload"), b"PK\x03\x04rest").unwrap(), SourceFormat::Xlsx);
        assert_eq!(detect_format(Some("report.bin"), OLE_MAGIC).unwrap(), SourceFormat::Xls);
        assert_eq!(
            detect_format(Some("export.dat"), b"Permit,Status\n").unwrap(),
            SourceFormat::Delimited(b',')
        );
    }

    #[test]
    fn test_unsupported() {
        let err = detect_format(Some("photo.png"), &[0x89, 0x50, 0x4E, 0x47, 0xFF]).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
        assert!(detect_format(None, b"").is_err());
    }
}
