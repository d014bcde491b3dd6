//! Column mapping, lead filtering and roofing activity summaries
//!
//! ```text
//! RecordTable --suggest/apply_mapping--> MappedTable --apply_filters--> LeadSet
//!                                            \--aggregate--> RoofingSummary
//! ```

pub mod aggregator;
pub mod calendar;
pub mod display;
pub mod filters;
pub mod mapper;
pub mod patterns;
pub mod roofing;

pub use aggregator::{aggregate, AggregationConfig, BucketCount, ContractorCount, RoofingSummary};
pub use calendar::{bucket_start, months_remaining, BucketGranularity};
pub use display::{display_columns, display_table, with_helper_columns};
pub use filters::{
    apply_filters, apply_filters_in_order, parse_list, FilterConfig, FilterKind, FilterStep, LeadSet,
    RowPredicate,
};
pub use mapper::{apply_mapping, suggest_mapping, ColumnMapping, MappedTable, MappingError};
pub use roofing::RoofingDetector;
