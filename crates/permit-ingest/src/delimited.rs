//! Delimited text reader
//!
//! The first record is the header. Rows are allowed to be ragged: the header
//! grows `col_N` names for wider rows and short rows are padded with missing
//! cells. Input that is not UTF-8 is decoded as Latin-1.

use crate::error::IngestError;
use csv::ReaderBuilder;
use permit_types::{unique_column_names, CellValue, RecordTable};
use std::borrow::Cow;
use tracing::debug;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("Input is not UTF-8, decoding as Latin-1");
            Cow::Owned(bytes.iter().map(|&b| b as char).collect())
        }
    }
}

pub fn read_delimited(bytes: &[u8], delimiter: u8) -> Result<RecordTable, IngestError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = decode(bytes);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|value| value.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::Empty);
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let values: Vec<String> = record.iter().map(|value| value.to_string()).collect();
        if values.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        rows.push(values);
    }

    let width = rows.iter().map(Vec::len).fold(headers.len(), usize::max);
    headers.resize(width, String::new());

    let cells = rows
        .into_iter()
        .map(|mut row| {
            row.resize(width, String::new());
            row.iter().map(|value| CellValue::from_text(value)).collect()
        })
        .collect();

    Ok(RecordTable::from_rows(unique_column_names(&headers), cells)?)
}
