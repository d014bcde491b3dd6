//! Workbook reader (first worksheet only)

use crate::error::IngestError;
use calamine::{DataType, Range, Reader, Xls, Xlsx};
use permit_types::{from_excel_serial, parse_date, unique_column_names, CellValue, RecordTable};
use std::io::{Cursor, Read, Seek};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookKind {
    Xlsx,
    Xls,
}

fn first_sheet<R, RS>(mut workbook: R) -> Result<Range<DataType>, IngestError>
where
    R: Reader<RS>,
    RS: Read + Seek,
    R::Error: std::fmt::Display,
{
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::Spreadsheet("the workbook has no worksheets".to_string()))?;

    debug!(sheet = %sheet_name, "Reading first worksheet");
    workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| IngestError::Spreadsheet(format!("unable to read worksheet '{sheet_name}'")))?
        .map_err(|err| IngestError::Spreadsheet(err.to_string()))
}

/// Convert one workbook cell. Date-formatted serials become dates.
pub fn cell_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::Empty | DataType::Error(_) => CellValue::Missing,
        DataType::String(s) => CellValue::from_text(s),
        DataType::Float(f) | DataType::Duration(f) => CellValue::Number(*f),
        DataType::Int(i) => CellValue::Number(*i as f64),
        DataType::Bool(b) => CellValue::Text(b.to_string()),
        DataType::DateTime(serial) => from_excel_serial(*serial)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(*serial)),
        DataType::DateTimeIso(s) => parse_date(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::from_text(s)),
        DataType::DurationIso(s) => CellValue::from_text(s),
    }
}

fn table_from_range(range: &Range<DataType>) -> Result<RecordTable, IngestError> {
    let mut rows = range.rows();
    let header_row = rows.next().ok_or(IngestError::Empty)?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_value(cell).as_text().into_owned())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::Empty);
    }

    let body: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(cell_value).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_missing()))
        .collect();

    Ok(RecordTable::from_rows(unique_column_names(&headers), body)?)
}

pub fn read_workbook(bytes: &[u8], kind: WorkbookKind) -> Result<RecordTable, IngestError> {
    let cursor = Cursor::new(bytes);
    let range = match kind {
        WorkbookKind::Xlsx => first_sheet(
            Xlsx::new(cursor).map_err(|err| IngestError::Spreadsheet(err.to_string()))?,
        )?,
        WorkbookKind::Xls => first_sheet(
            Xls::new(cursor).map_err(|err| IngestError::Spreadsheet(err.to_string()))?,
        )?,
    };
    table_from_range(&range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Permits").unwrap();
        for (col, header) in ["Permit #", "ZIP", "Status", ""].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_string(1, 0, "BLD24-1").unwrap();
        sheet.write_number(1, 1, 95603.0).unwrap();
        sheet.write_string(1, 2, "Issued").unwrap();
        sheet.write_string(1, 3, "x").unwrap();
        sheet.write_string(3, 0, "BLD24-2").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_reads_first_sheet() {
        let table = read_workbook(&workbook_bytes(), WorkbookKind::Xlsx).unwrap();
        assert_eq!(table.columns(), &["Permit #", "ZIP", "Status", "col_4"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.row(0).get("ZIP").as_text(), "95603");
        assert_eq!(table.row(1).get("Status"), &CellValue::Missing);
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(
            cell_value(&DataType::DateTime(45813.0)),
            CellValue::Date(NaiveDate::from_ymd_opt(2025, 6, 5).unwrap())
        );
        assert_eq!(cell_value(&DataType::Int(7)), CellValue::Number(7.0));
        assert_eq!(cell_value(&DataType::String("  ".into())), CellValue::Missing);
        assert_eq!(
            cell_value(&DataType::DateTimeIso("2025-03-01T00:00:00".into())),
            CellValue::Date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
        );
    }

    #[test]
    fn test_garbage_is_a_spreadsheet_error() {
        let err = read_workbook(b"PK\x03\x04not a zip", WorkbookKind::Xlsx).unwrap_err();
        assert!(matches!(err, IngestError::Spreadsheet(_)));
    }
}
