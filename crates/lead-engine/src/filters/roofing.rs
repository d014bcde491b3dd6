use super::{FilterConfig, FilterKind, RowPredicate};
use crate::mapper::MappedTable;
use crate::roofing::RoofingDetector;
use permit_types::{CanonicalField, Notice, RowRef};

/// Drops rows flagged as roofing work
#[derive(Debug, Clone)]
pub struct RoofingExclusion {
    detector: RoofingDetector,
}

impl RoofingExclusion {
    pub fn build(mapped: &MappedTable, config: &FilterConfig, notices: &mut Vec<Notice>) -> Option<Self> {
        if !config.exclude_roofing {
            return None;
        }
        let detector = RoofingDetector::new(mapped, &config.roofing_keywords);
        if !detector.has_sources() {
            notices.push(Notice::MissingOptionalColumn {
                field: CanonicalField::Description,
                consumer: "roofing exclusion".to_string(),
            });
            return None;
        }
        Some(Self { detector })
    }
}

impl RowPredicate for RoofingExclusion {
    fn kind(&self) -> FilterKind {
        FilterKind::RoofingExclusion
    }

    fn keep(&self, row: RowRef<'_>) -> bool {
        !self.detector.is_roofing(row)
    }
}
