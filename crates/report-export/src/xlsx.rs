//! Workbook writer: one worksheet per table, frozen header row, auto-filter
//! on the primary sheet

use crate::error::ExportError;
use crate::NamedTable;
use permit_types::CellValue;
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashSet;

/// Excel's sheet name limit
const MAX_SHEET_NAME: usize = 31;

/// Make a name Excel accepts: no `[]:*?/\`, at most 31 characters, unique
/// within the workbook
fn sheet_name(raw: &str, index: usize, used: &mut HashSet<String>) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let base = if cleaned.is_empty() {
        format!("Sheet{}", index + 1)
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut name = base.clone();
    let mut suffix = 2;
    while used.contains(&name.to_lowercase()) {
        let tail = format!(" ({suffix})");
        let keep = MAX_SHEET_NAME.saturating_sub(tail.chars().count());
        name = format!("{}{}", base.chars().take(keep).collect::<String>(), tail);
        suffix += 1;
    }
    used.insert(name.to_lowercase());
    name
}

pub fn write_workbook(tables: &[NamedTable]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let mut used_names = HashSet::new();

    for (index, named) in tables.iter().enumerate() {
        let table = &named.table;
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(&named.name, index, &mut used_names))?;

        for (col, header) in table.columns().iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (r, row) in table.raw_rows().iter().enumerate() {
            let r = r as u32 + 1;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                match cell {
                    CellValue::Number(n) => {
                        sheet.write_number(r, c, *n)?;
                    }
                    CellValue::Missing => {}
                    CellValue::Text(_) | CellValue::Date(_) => {
                        sheet.write_string(r, c, cell.as_text())?;
                    }
                }
            }
        }

        sheet.set_freeze_panes(1, 0)?;
        if index == 0 && !table.columns().is_empty() {
            sheet.autofilter(0, 0, table.len() as u32, (table.columns().len() - 1) as u16)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{DataType, Reader, Xlsx};
    use permit_types::RecordTable;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn leads() -> RecordTable {
        RecordTable::from_rows(
            vec!["Permit".into(), "ZIP".into(), "Owner".into()],
            vec![
                vec![CellValue::from_text("BLD1"), CellValue::Number(95603.0), CellValue::Missing],
                vec![CellValue::from_text("BLD2"), CellValue::Number(95945.0), CellValue::from_text("Lee")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_sheets_round_trip_through_calamine() {
        let summary = RecordTable::from_rows(
            vec!["Month".into(), "Count".into()],
            vec![vec![CellValue::from_text("2025-03"), CellValue::Number(3.0)]],
        )
        .unwrap();
        let bytes = write_workbook(&[
            NamedTable::leads(leads()),
            NamedTable::new("Roofing: by month", summary),
        ])
        .unwrap();

        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names().to_vec(), vec!["Leads", "Roofing_ by month"]);

        let range = workbook.worksheet_range("Leads").unwrap().unwrap();
        assert_eq!(range.get_size(), (3, 3));
        assert_eq!(range.get_value((0, 0)), Some(&DataType::String("Permit".into())));
        assert_eq!(range.get_value((2, 1)), Some(&DataType::Float(95945.0)));
        assert_eq!(range.get_value((2, 2)), Some(&DataType::String("Lee".into())));
    }

    #[test]
    fn test_sheet_names_are_sanitized_and_unique() {
        let mut used = HashSet::new();
        assert_eq!(sheet_name("Leads", 0, &mut used), "Leads");
        assert_eq!(sheet_name("leads", 1, &mut used), "leads (2)");
        assert_eq!(sheet_name("", 2, &mut used), "Sheet3");
        let long = sheet_name(&"x".repeat(40), 3, &mut used);
        assert_eq!(long.chars().count(), 31);
    }
}
