//! In-memory record table
//!
//! Column order is preserved from ingestion and row order from the source.
//! Column names are unique within a table.

use crate::cell::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

static MISSING: CellValue = CellValue::Missing;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

/// A rectangular table of named columns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RecordTable {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(TableError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Create a table and validate every row against the header width
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, TableError> {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len(),
                found: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row(&self, index: usize) -> RowRef<'_> {
        RowRef { table: self, index }
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        (0..self.rows.len()).map(move |index| RowRef { table: self, index })
    }

    /// Raw cell rows in table order
    pub fn raw_rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// All values of one column, top to bottom
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &CellValue> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Keep rows whose mask entry is true, preserving order
    pub fn retain_mask(&self, mask: &[bool]) -> RecordTable {
        let rows = self
            .rows
            .iter()
            .zip(mask.iter())
            .filter(|(_, keep)| **keep)
            .map(|(row, _)| row.clone())
            .collect();
        RecordTable {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Project onto the named columns, in the given order
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<RecordTable, TableError> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name.as_ref())
                    .ok_or_else(|| TableError::UnknownColumn(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let columns = names.iter().map(|n| n.as_ref().to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        RecordTable::from_rows(columns, rows)
    }

    /// Rename columns; names absent from `renames` are kept unchanged
    pub fn rename_columns(&self, renames: &HashMap<String, String>) -> Result<RecordTable, TableError> {
        let columns = self
            .columns
            .iter()
            .map(|c| renames.get(c).cloned().unwrap_or_else(|| c.clone()))
            .collect();
        let mut table = RecordTable::new(columns)?;
        table.rows = self.rows.clone();
        Ok(table)
    }

    /// Append a derived column computed per row
    pub fn with_column<F>(&self, name: &str, mut value: F) -> Result<RecordTable, TableError>
    where
        F: FnMut(RowRef<'_>) -> CellValue,
    {
        if self.has_column(name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        let rows = (0..self.rows.len())
            .map(|index| {
                let mut row = self.rows[index].clone();
                row.push(value(RowRef { table: self, index }));
                row
            })
            .collect();
        Ok(RecordTable { columns, rows })
    }

    /// Stack tables vertically, aligning by column name.
    ///
    /// The result carries the union of columns in first-seen order; cells a
    /// source table lacks are `Missing`.
    pub fn concat(tables: &[RecordTable]) -> RecordTable {
        let mut columns: Vec<String> = Vec::new();
        for table in tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let positions: Vec<Option<usize>> =
                columns.iter().map(|c| table.column_index(c)).collect();
            for row in &table.rows {
                rows.push(
                    positions
                        .iter()
                        .map(|p| p.map(|i| row[i].clone()).unwrap_or_default())
                        .collect(),
                );
            }
        }

        RecordTable { columns, rows }
    }
}

/// Borrowed view of one row
#[derive(Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a RecordTable,
    index: usize,
}

impl<'a> RowRef<'a> {
    /// Position of the row in its table
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell under `column`; absent columns read as `Missing`
    pub fn get(&self, column: &str) -> &'a CellValue {
        match self.table.column_index(column) {
            Some(i) => &self.table.rows[self.index][i],
            None => &MISSING,
        }
    }

    pub fn cells(&self) -> &'a [CellValue] {
        &self.table.rows[self.index]
    }
}

/// Normalize raw header cells into unique column names.
///
/// Empty headers become `col_N` (1-based position); repeats get `.1`, `.2`
/// suffixes in order of appearance.
pub fn unique_column_names<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(raw.len());

    for (position, header) in raw.iter().enumerate() {
        let trimmed = header.as_ref().trim();
        let base = if trimmed.is_empty() {
            format!("col_{}", position + 1)
        } else {
            trimmed.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> RecordTable {
        RecordTable::from_rows(
            vec!["Permit #".into(), "City".into()],
            vec![
                vec!["BLD1".into(), "Auburn".into()],
                vec!["BLD2".into(), CellValue::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let err = RecordTable::new(vec!["A".into(), "A".into()]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("A".into()));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let mut table = RecordTable::new(vec!["A".into(), "B".into()]).unwrap();
        assert!(table.push_row(vec!["x".into()]).is_err());
    }

    #[test]
    fn test_row_get_absent_column_is_missing() {
        let table = sample();
        assert!(table.row(0).get("County").is_missing());
        assert_eq!(table.row(0).get("City").as_text(), "Auburn");
    }

    #[test]
    fn test_retain_mask_preserves_order() {
        let table = sample();
        let kept = table.retain_mask(&[false, true]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.row(0).get("Permit #").as_text(), "BLD2");
    }

    #[test]
    fn test_concat_unions_columns() {
        let a = sample();
        let b = RecordTable::from_rows(
            vec!["Permit #".into(), "Status".into()],
            vec![vec!["BLD3".into(), "Issued".into()]],
        )
        .unwrap();
        let merged = RecordTable::concat(&[a, b]);
        assert_eq!(merged.columns(), &["Permit #", "City", "Status"]);
        assert_eq!(merged.len(), 3);
        assert!(merged.row(2).get("City").is_missing());
        assert_eq!(merged.row(2).get("Status").as_text(), "Issued");
    }

    #[test]
    fn test_unique_column_names() {
        let names = unique_column_names(&["Permit", "", "Permit", "Permit", " "]);
        assert_eq!(names, vec!["Permit", "col_2", "Permit.1", "Permit.2", "col_5"]);
    }

    #[test]
    fn test_with_column_appends_derived_values() {
        let table = sample();
        let derived = table
            .with_column("_flag", |row| CellValue::Number(row.index() as f64))
            .unwrap();
        assert_eq!(derived.columns().last().unwrap(), "_flag");
        assert_eq!(derived.row(1).get("_flag").as_text(), "1");
    }
}
