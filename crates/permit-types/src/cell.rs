//! Tagged cell values and their total coercions.
//!
//! Every coercion returns `None` (or [`CellValue::Missing`]) on failure instead
//! of erroring, so a bad cell can never abort a filter pass.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Date formats tried in order when coercing text to a calendar date
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m-%d-%Y",
    "%m-%d-%y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%Y%m%d",
];

/// Years outside this window are treated as mis-parses (e.g. "6/5/25" read with `%Y`)
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1800..=2200;

/// A single table cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    #[default]
    Missing,
}

impl CellValue {
    /// Build a text cell, mapping blank input to `Missing`
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            CellValue::Missing
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Text rendering used for membership tests, search and export
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) => Cow::Owned(format_number(*n)),
            CellValue::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
            CellValue::Missing => Cow::Borrowed(""),
        }
    }

    /// Coerce to a calendar date; unparseable text yields `None`
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => parse_date(s),
            CellValue::Number(_) | CellValue::Missing => None,
        }
    }

    /// Coerce to a number, tolerating currency symbols and thousands separators
    pub fn to_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s),
            CellValue::Date(_) | CellValue::Missing => None,
        }
    }

    /// Case-insensitive substring test; `needle` must already be lowercase
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        !self.is_missing() && self.as_text().to_lowercase().contains(needle)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::from_text(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// Integral values print without a fractional part so that ZIP 95603 read
/// from a workbook compares equal to the text "95603".
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

/// Parse a date from free-form text. Trailing time components are ignored.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(date) = parse_date_exact(text) {
        return Some(date);
    }

    // "2025-06-05T00:00:00", "06/05/2025 10:30 AM"
    let prefix = text.split(['T', ' ']).next().unwrap_or(text);
    if prefix.len() < text.len() {
        return parse_date_exact(prefix);
    }

    None
}

fn parse_date_exact(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .find(|date| PLAUSIBLE_YEARS.contains(&date.year()))
}

/// Parse a number such as "$12,500.00" or "1 200"
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Convert a spreadsheet serial day number (1900 date system) to a date
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
