//! Common types for PDF table recovery

use serde::{Deserialize, Serialize};

/// A run of text placed on the page, in user-space points (origin bottom-left)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
    /// Left edge of the run
    pub x: f64,
    /// Baseline
    pub y: f64,
    /// Estimated advance width
    pub width: f64,
    pub font_size: f64,
}

impl TextItem {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Vertical middle of the glyph box
    pub fn center_y(&self) -> f64 {
        self.y + self.font_size / 2.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A stroked or filled ruling line. `position` is the y of a horizontal rule
/// or the x of a vertical one; `start..end` is its extent along the other axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleSegment {
    pub orientation: Orientation,
    pub position: f64,
    pub start: f64,
    pub end: f64,
}

/// Everything the grid strategies need to know about one page
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PageLayout {
    /// 1-indexed page number
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    pub items: Vec<TextItem>,
    pub rules: Vec<RuleSegment>,
}

impl PageLayout {
    pub fn rules_of(&self, orientation: Orientation) -> impl Iterator<Item = &RuleSegment> {
        self.rules.iter().filter(move |r| r.orientation == orientation)
    }
}

/// Tuning knobs for both extraction stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Wall-clock budget for structured extraction across all pages
    pub time_budget_ms: u64,
    /// Stop after this many pages
    pub max_pages: Option<usize>,
    /// Baselines closer than this (points) belong to the same text row
    pub row_tolerance: f64,
    /// Edges closer than this (points) are snapped together
    pub snap_tolerance: f64,
    /// Left edges must line up on at least this many rows to form a text column
    pub min_aligned_rows: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            time_budget_ms: 30_000,
            max_pages: None,
            row_tolerance: 3.0,
            snap_tolerance: 3.0,
            min_aligned_rows: 2,
        }
    }
}

/// Which stage produced the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionStage {
    /// Grid detection over positioned text and ruling lines
    Structured,
    /// Line-by-line reconstruction on runs of whitespace
    FixedWidth,
}
