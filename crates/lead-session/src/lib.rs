//! Upload, map, filter and export in one session
//!
//! A [`LeadSession`] holds one ingested report plus the confirmed column
//! mapping. Each query reruns the pipeline from the ingested table:
//!
//! ```text
//! upload -> suggest/confirm mapping -> leads -> display / roofing summary -> export
//! ```

pub mod cache;
pub mod config;
pub mod session;

pub use cache::{content_hash, CacheKey, Memo};
pub use config::SessionConfig;
pub use session::{LeadSession, SessionError};

pub use lead_engine::{AggregationConfig, BucketGranularity, ColumnMapping, FilterConfig, LeadSet, RoofingSummary};
pub use permit_types::{CanonicalField, CellValue, Notice, RecordTable};
pub use report_export::{ExportArtifact, ExportFormat, ExportOptions};
