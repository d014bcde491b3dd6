use crate::error::ExportError;
use csv::Writer;
use permit_types::RecordTable;

/// UTF-8, comma separated, header row first
pub fn write_csv(table: &RecordTable) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.raw_rows() {
        writer.write_record(row.iter().map(|cell| cell.as_text().into_owned()))?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use permit_types::CellValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quotes_and_missing_cells() {
        let table = RecordTable::from_rows(
            vec!["Owner".into(), "Issued Date".into(), "Valuation".into()],
            vec![vec![
                CellValue::from_text("Doe, Jane"),
                CellValue::Date(NaiveDate::from_ymd_opt(2025, 6, 5).unwrap()),
                CellValue::Missing,
            ]],
        )
        .unwrap();
        let text = String::from_utf8(write_csv(&table).unwrap()).unwrap();
        assert_eq!(text, "Owner,Issued Date,Valuation\n\"Doe, Jane\",2025-06-05,\n");
    }

    #[test]
    fn test_header_only_table() {
        let table = RecordTable::new(vec!["Permit".into()]).unwrap();
        assert_eq!(write_csv(&table).unwrap(), b"Permit\n");
    }
}
