//! Column mapping from source headers onto canonical fields
//!
//! A mapping is a partial injective function: each canonical field points to
//! at most one source column and no source column serves two fields.

use crate::patterns::MAPPING_RULES;
use permit_types::{CanonicalField, RecordTable, TableError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Column '{0}' does not exist in the uploaded table")]
    UnknownColumn(String),

    #[error("Column '{column}' is mapped to both {first} and {second}")]
    DuplicateSource {
        column: String,
        first: CanonicalField,
        second: CanonicalField,
    },

    #[error("Renaming '{source_column}' to '{field}' collides with an existing unmapped column")]
    LabelCollision {
        field: CanonicalField,
        source_column: String,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Confirmed or suggested field → source column assignment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    fields: BTreeMap<CanonicalField, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Assign a source column, or `None` to leave the field unmapped
    pub fn set(&mut self, field: CanonicalField, column: Option<String>) {
        match column {
            Some(column) => {
                self.fields.insert(field, column);
            }
            None => {
                self.fields.remove(&field);
            }
        }
    }

    pub fn with(mut self, field: CanonicalField, column: impl Into<String>) -> Self {
        self.fields.insert(field, column.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> + '_ {
        self.fields.iter().map(|(field, column)| (*field, column.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check that every source column exists and none is used twice
    pub fn validate(&self, columns: &[String]) -> Result<(), MappingError> {
        let mut claimed: HashMap<&str, CanonicalField> = HashMap::new();
        for (field, column) in self.iter() {
            if !columns.iter().any(|c| c == column) {
                return Err(MappingError::UnknownColumn(column.to_string()));
            }
            if let Some(first) = claimed.insert(column, field) {
                return Err(MappingError::DuplicateSource {
                    column: column.to_string(),
                    first,
                    second: field,
                });
            }
        }
        Ok(())
    }
}

/// Guess a mapping from header text.
///
/// Fields are visited in rule order; each takes the earliest header that
/// contains one of its keywords and has not been claimed yet.
pub fn suggest_mapping<S: AsRef<str>>(headers: &[S]) -> ColumnMapping {
    let lowered: Vec<String> = headers.iter().map(|h| h.as_ref().to_lowercase()).collect();
    let mut claimed = vec![false; headers.len()];
    let mut mapping = ColumnMapping::new();

    for (field, keywords) in MAPPING_RULES {
        let hit = lowered
            .iter()
            .enumerate()
            .find(|(i, header)| !claimed[*i] && keywords.iter().any(|k| header.contains(k)));
        if let Some((index, _)) = hit {
            claimed[index] = true;
            mapping.set(*field, Some(headers[index].as_ref().to_string()));
        }
    }

    debug!(mapped = mapping.len(), "Suggested column mapping");
    mapping
}

/// A table whose mapped source columns carry canonical labels
#[derive(Debug, Clone, PartialEq)]
pub struct MappedTable {
    table: RecordTable,
    fields: BTreeSet<CanonicalField>,
    /// Source column name to the canonical label it was renamed to
    renamed: BTreeMap<String, &'static str>,
}

impl MappedTable {
    /// Treat columns already named with a canonical label as mapped
    pub fn assume_canonical(table: RecordTable) -> Self {
        let fields = CanonicalField::ALL
            .into_iter()
            .filter(|f| table.has_column(f.label()))
            .collect();
        Self {
            table,
            fields,
            renamed: BTreeMap::new(),
        }
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn into_table(self) -> RecordTable {
        self.table
    }

    /// Column name of a mapped field, `None` when unmapped
    pub fn column(&self, field: CanonicalField) -> Option<&'static str> {
        self.fields.contains(&field).then(|| field.label())
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.fields.contains(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.fields.iter().copied()
    }

    /// Current column name for a user-supplied name, which may be either a
    /// column of this table or a source header that mapping renamed
    pub fn resolve_column<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.table.has_column(name) {
            return Some(name);
        }
        self.renamed.get(name).copied()
    }

    /// Same mapped fields over a derived table (a filtered subset)
    pub fn with_table(&self, table: RecordTable) -> Self {
        Self {
            table,
            fields: self.fields.clone(),
            renamed: self.renamed.clone(),
        }
    }
}

/// Rename mapped source columns to their canonical labels. Unmapped columns
/// keep their names and position.
pub fn apply_mapping(table: &RecordTable, mapping: &ColumnMapping) -> Result<MappedTable, MappingError> {
    mapping.validate(table.columns())?;

    let sources: BTreeSet<&str> = mapping.iter().map(|(_, column)| column).collect();
    let mut renames = HashMap::new();
    for (field, column) in mapping.iter() {
        let label = field.label();
        if label != column && table.has_column(label) && !sources.contains(label) {
            return Err(MappingError::LabelCollision {
                field,
                source_column: column.to_string(),
            });
        }
        renames.insert(column.to_string(), label.to_string());
    }

    Ok(MappedTable {
        table: table.rename_columns(&renames)?,
        fields: mapping.iter().map(|(field, _)| field).collect(),
        renamed: mapping
            .iter()
            .filter(|(field, column)| field.label() != *column)
            .map(|(field, column)| (column.to_string(), field.label()))
            .collect(),
    })
}
