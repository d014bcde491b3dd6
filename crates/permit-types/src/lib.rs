//! Shared data model for the permit lead pipeline
//!
//! Tables are untyped at the source; this crate gives them a tagged cell
//! model with total coercions, plus the canonical field set that source
//! headers are mapped onto.

pub mod cell;
pub mod field;
pub mod notice;
pub mod table;

pub use cell::{from_excel_serial, parse_date, parse_number, CellValue};
pub use field::CanonicalField;
pub use notice::Notice;
pub use table::{unique_column_names, RecordTable, RowRef, TableError};
