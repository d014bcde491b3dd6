//! Roofing activity summary over an issued-date range

use crate::calendar::{bucket_start, BucketGranularity};
use crate::mapper::MappedTable;
use crate::patterns::ROOFING_DETAIL_FIELDS;
use crate::roofing::RoofingDetector;
use chrono::NaiveDate;
use permit_types::{CanonicalField, Notice, RecordTable, TableError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

fn default_top_n() -> usize {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// First issued date included
    pub start: NaiveDate,
    /// Last issued date included
    pub end: NaiveDate,
    #[serde(default)]
    pub granularity: BucketGranularity,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl AggregationConfig {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            granularity: BucketGranularity::default(),
            top_n: default_top_n(),
        }
    }

    pub fn with_granularity(mut self, granularity: BucketGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    pub bucket: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractorCount {
    pub contractor: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoofingSummary {
    pub total_in_range: usize,
    pub flagged_in_range: usize,
    pub distinct_contractors: usize,
    /// Non-empty buckets only, oldest first
    pub series: Vec<BucketCount>,
    pub top_contractors: Vec<ContractorCount>,
    /// Flagged rows in range, restricted to the detail columns
    pub detail: RecordTable,
    pub notices: Vec<Notice>,
}

impl RoofingSummary {
    fn empty(notices: Vec<Notice>) -> Self {
        Self {
            total_in_range: 0,
            flagged_in_range: 0,
            distinct_contractors: 0,
            series: Vec::new(),
            top_contractors: Vec::new(),
            detail: RecordTable::default(),
            notices,
        }
    }
}

/// Summarize roofing permits issued within the configured range
#[instrument(skip_all, fields(start = %config.start, end = %config.end))]
pub fn aggregate<S: AsRef<str>>(
    mapped: &MappedTable,
    config: &AggregationConfig,
    roofing_keywords: &[S],
) -> Result<RoofingSummary, TableError> {
    let mut notices = Vec::new();
    let Some(issued_column) = mapped.column(CanonicalField::IssuedDate) else {
        notices.push(Notice::MissingOptionalColumn {
            field: CanonicalField::IssuedDate,
            consumer: "roofing activity summary".to_string(),
        });
        return Ok(RoofingSummary::empty(notices));
    };

    let detector = RoofingDetector::new(mapped, roofing_keywords);
    if !detector.has_sources() {
        notices.push(Notice::MissingOptionalColumn {
            field: CanonicalField::Description,
            consumer: "roofing detection".to_string(),
        });
    }
    let contractor_column = mapped.column(CanonicalField::Contractor);

    let table = mapped.table();
    let mut total_in_range = 0;
    let mut unparseable = 0;
    let mut flagged = vec![false; table.len()];
    let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    // Insertion order doubles as the tie-break for equal counts
    let mut contractors: Vec<ContractorCount> = Vec::new();
    let mut contractor_index: HashMap<String, usize> = HashMap::new();

    for row in table.iter_rows() {
        let cell = row.get(issued_column);
        let Some(issued) = cell.to_date() else {
            if !cell.is_missing() {
                unparseable += 1;
            }
            continue;
        };
        if !config.contains(issued) {
            continue;
        }
        total_in_range += 1;
        if !detector.is_roofing(row) {
            continue;
        }

        flagged[row.index()] = true;
        *buckets.entry(bucket_start(issued, config.granularity)).or_default() += 1;

        let name = contractor_column
            .map(|c| row.get(c).as_text().trim().to_string())
            .unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        match contractor_index.get(&name) {
            Some(&i) => contractors[i].count += 1,
            None => {
                contractor_index.insert(name.clone(), contractors.len());
                contractors.push(ContractorCount {
                    contractor: name,
                    count: 1,
                });
            }
        }
    }

    if unparseable > 0 {
        notices.push(Notice::UnparseableDates {
            field: CanonicalField::IssuedDate,
            count: unparseable,
        });
    }

    let distinct_contractors = contractors.len();
    // Stable sort keeps first-encountered order among equal counts
    contractors.sort_by(|a, b| b.count.cmp(&a.count));
    contractors.truncate(config.top_n);

    let detail_columns: Vec<&str> = ROOFING_DETAIL_FIELDS
        .iter()
        .filter_map(|f| mapped.column(*f))
        .collect();
    let detail = table.retain_mask(&flagged).select_columns(&detail_columns)?;
    let flagged_in_range = detail.len();

    info!(total_in_range, flagged_in_range, buckets = buckets.len(), "Roofing summary built");

    Ok(RoofingSummary {
        total_in_range,
        flagged_in_range,
        distinct_contractors,
        series: buckets
            .into_iter()
            .map(|(bucket, count)| BucketCount { bucket, count })
            .collect(),
        top_contractors: contractors,
        detail,
        notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use permit_types::CellValue;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mapped(rows: &[[&str; 4]]) -> MappedTable {
        let table = RecordTable::from_rows(
            ["Permit", "Issued Date", "Description", "Contractor"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| CellValue::from_text(v)).collect())
                .collect(),
        )
        .unwrap();
        MappedTable::assume_canonical(table)
    }

    #[test]
    fn test_monthly_series_without_zero_fill() {
        let t = mapped(&[
            ["B1", "2025-03-03", "Re-roof", "Acme"],
            ["B2", "2025-03-15", "New shingles", "Best"],
            ["B3", "2025-03-30", "Roof repair", "Acme"],
            ["B4", "2025-04-10", "Kitchen", "Acme"],
            ["B5", "2025-05-20", "Roof", ""],
            ["B6", "2025-07-01", "Roof", "Late"],
        ]);
        let config = AggregationConfig::new(date(2025, 3, 1), date(2025, 5, 31));
        let summary = aggregate(&t, &config, &["roof", "shingle"]).unwrap();

        assert_eq!(summary.total_in_range, 5);
        assert_eq!(summary.flagged_in_range, 4);
        assert_eq!(summary.distinct_contractors, 2);
        assert_eq!(
            summary.series,
            vec![
                BucketCount { bucket: date(2025, 3, 1), count: 3 },
                BucketCount { bucket: date(2025, 5, 1), count: 1 },
            ]
        );
        assert_eq!(
            summary.top_contractors,
            vec![
                ContractorCount { contractor: "Acme".into(), count: 2 },
                ContractorCount { contractor: "Best".into(), count: 1 },
            ]
        );
        assert_eq!(
            summary.detail.columns(),
            &["Permit", "Issued Date", "Contractor", "Description"]
        );
    }

    #[test]
    fn test_weekly_buckets_and_ties() {
        let t = mapped(&[
            ["B1", "2025-03-13", "roof", "Zed"],
            ["B2", "2025-03-10", "roof", "Amy"],
            ["B3", "2025-03-17", "roof", "Amy"],
            ["B4", "2025-03-18", "roof", "Zed"],
        ]);
        let config = AggregationConfig::new(date(2025, 3, 1), date(2025, 3, 31))
            .with_granularity(BucketGranularity::Week);
        let summary = aggregate(&t, &config, &["roof"]).unwrap();

        assert_eq!(
            summary.series,
            vec![
                BucketCount { bucket: date(2025, 3, 10), count: 2 },
                BucketCount { bucket: date(2025, 3, 17), count: 2 },
            ]
        );
        // Equal counts keep first-seen order
        assert_eq!(summary.top_contractors[0].contractor, "Zed");
        assert_eq!(summary.top_contractors[1].contractor, "Amy");
    }

    #[test]
    fn test_top_n_truncation() {
        let rows: Vec<[&str; 4]> = ["A", "B", "C"]
            .iter()
            .map(|c| ["P", "2025-01-05", "roof", *c])
            .collect();
        let mut config = AggregationConfig::new(date(2025, 1, 1), date(2025, 1, 31));
        config.top_n = 2;
        let summary = aggregate(&mapped(&rows), &config, &["roof"]).unwrap();
        assert_eq!(summary.top_contractors.len(), 2);
        assert_eq!(summary.distinct_contractors, 3);
    }

    #[test]
    fn test_missing_issued_date_column() {
        let table = RecordTable::from_rows(vec!["Description".into()], vec![]).unwrap();
        let summary = aggregate(
            &MappedTable::assume_canonical(table),
            &AggregationConfig::new(date(2025, 1, 1), date(2025, 12, 31)),
            &["roof"],
        )
        .unwrap();
        assert_eq!(summary.total_in_range, 0);
        assert_eq!(summary.notices.len(), 1);
    }
}
