//! Lead filter engine
//!
//! Each filter is an independent row predicate. Filters whose column is
//! unmapped are skipped with a notice. Survivors of every active predicate
//! form the lead set; the order predicates run in only changes the
//! intermediate counts.

pub mod date_window;
pub mod geography;
pub mod roofing;
pub mod search;
pub mod status;

use crate::mapper::MappedTable;
use crate::patterns::ROOFING_KEYWORDS;
use chrono::NaiveDate;
use permit_types::{Notice, RecordTable, RowRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// A pure keep/drop decision over one row
pub trait RowPredicate {
    fn kind(&self) -> FilterKind;
    fn keep(&self, row: RowRef<'_>) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    DateWindow,
    Status,
    Geography,
    RoofingExclusion,
    Search,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] = [
        FilterKind::DateWindow,
        FilterKind::Status,
        FilterKind::Geography,
        FilterKind::RoofingExclusion,
        FilterKind::Search,
    ];
}

fn default_max_months() -> i32 {
    4
}

fn default_counties() -> Vec<String> {
    ["Nevada", "Placer", "Yuba", "Sacramento"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_statuses() -> Vec<String> {
    vec!["Issued".to_string(), "In Progress".to_string()]
}

fn default_exclude_roofing() -> bool {
    true
}

fn default_roofing_keywords() -> Vec<String> {
    ROOFING_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

/// Active filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Keep rows expiring within this many months (negative: already expired)
    #[serde(default = "default_max_months")]
    pub max_months_remaining: i32,
    /// Geography targets; also matched against City or ZIP when County is unmapped
    #[serde(default = "default_counties")]
    pub counties: Vec<String>,
    /// Allowed statuses; empty disables the filter
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,
    #[serde(default = "default_exclude_roofing")]
    pub exclude_roofing: bool,
    /// Free-text search; blank disables the filter
    #[serde(default)]
    pub query: String,
    /// Columns the search looks at; `None` searches every column
    #[serde(default)]
    pub search_columns: Option<Vec<String>>,
    #[serde(default = "default_roofing_keywords")]
    pub roofing_keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_months_remaining: default_max_months(),
            counties: default_counties(),
            statuses: default_statuses(),
            exclude_roofing: default_exclude_roofing(),
            query: String::new(),
            search_columns: None,
            roofing_keywords: default_roofing_keywords(),
        }
    }
}

/// Split comma-separated user input into trimmed, non-empty entries
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Row count left after one predicate ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStep {
    pub filter: FilterKind,
    pub remaining: usize,
}

/// Filter output
#[derive(Debug, Clone)]
pub struct LeadSet {
    pub leads: MappedTable,
    /// Source row index of every lead, ascending
    pub source_rows: Vec<usize>,
    pub steps: Vec<FilterStep>,
    pub notices: Vec<Notice>,
    total: usize,
}

impl LeadSet {
    pub fn kept(&self) -> usize {
        self.leads.table().len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn table(&self) -> &RecordTable {
        self.leads.table()
    }

    pub fn is_empty(&self) -> bool {
        self.kept() == 0
    }

    /// "Showing N of M rows"
    pub fn summary(&self) -> String {
        format!("Showing {} of {} rows after filtering.", self.kept(), self.total)
    }
}

fn build_predicate(
    kind: FilterKind,
    mapped: &MappedTable,
    config: &FilterConfig,
    today: NaiveDate,
    notices: &mut Vec<Notice>,
) -> Option<Box<dyn RowPredicate>> {
    match kind {
        FilterKind::DateWindow => date_window::DateWindowFilter::build(mapped, config, today, notices)
            .map(|p| Box::new(p) as Box<dyn RowPredicate>),
        FilterKind::Status => status::StatusFilter::build(mapped, config, notices)
            .map(|p| Box::new(p) as Box<dyn RowPredicate>),
        FilterKind::Geography => geography::GeographyFilter::build(mapped, config, notices)
            .map(|p| Box::new(p) as Box<dyn RowPredicate>),
        FilterKind::RoofingExclusion => roofing::RoofingExclusion::build(mapped, config, notices)
            .map(|p| Box::new(p) as Box<dyn RowPredicate>),
        FilterKind::Search => search::SearchFilter::build(mapped, config, notices)
            .map(|p| Box::new(p) as Box<dyn RowPredicate>),
    }
}

/// Apply every filter in the standard order
pub fn apply_filters(mapped: &MappedTable, config: &FilterConfig, today: NaiveDate) -> LeadSet {
    apply_filters_in_order(mapped, config, today, &FilterKind::ALL)
}

/// Apply the listed filters in the given order
#[instrument(skip(mapped, config), fields(rows = mapped.table().len()))]
pub fn apply_filters_in_order(
    mapped: &MappedTable,
    config: &FilterConfig,
    today: NaiveDate,
    order: &[FilterKind],
) -> LeadSet {
    let table = mapped.table();
    let mut notices = Vec::new();
    let mut mask = vec![true; table.len()];
    let mut steps = Vec::new();

    for kind in order {
        let Some(predicate) = build_predicate(*kind, mapped, config, today, &mut notices) else {
            debug!(filter = ?kind, "Filter inactive");
            continue;
        };
        for row in table.iter_rows() {
            let keep = &mut mask[row.index()];
            if *keep {
                *keep = predicate.keep(row);
            }
        }
        let remaining = mask.iter().filter(|k| **k).count();
        debug!(filter = ?predicate.kind(), remaining, "Filter applied");
        steps.push(FilterStep {
            filter: predicate.kind(),
            remaining,
        });
    }

    let source_rows: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(i, keep)| keep.then_some(i))
        .collect();
    if source_rows.is_empty() {
        notices.push(Notice::NoLeadsMatched);
    }

    info!(kept = source_rows.len(), total = table.len(), "Filtering complete");

    LeadSet {
        leads: mapped.with_table(table.retain_mask(&mask)),
        source_rows,
        steps,
        notices,
        total: table.len(),
    }
}
