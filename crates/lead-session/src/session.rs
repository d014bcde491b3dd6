//! One interactive session over one uploaded report
//!
//! Every query recomputes from the ingested table and the current mapping
//! and configuration; nothing derived is stored except in the memo caches.

use crate::cache::{content_hash, CacheKey, Memo};
use crate::config::SessionConfig;
use chrono::{Local, NaiveDate};
use lead_engine::{
    aggregate, apply_filters, apply_mapping, display_table, suggest_mapping, BucketGranularity, ColumnMapping,
    LeadSet, MappedTable, MappingError, RoofingSummary,
};
use permit_ingest::{IngestError, Ingested};
use permit_types::{CanonicalField, CellValue, Notice, RecordTable, TableError};
use report_export::{available_formats, ExportArtifact, ExportError, ExportFormat, ExportOptions, NamedTable};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Recent uploads kept ingested, so re-uploading a file skips parsing
const INGEST_CACHE_ENTRIES: usize = 8;
/// Export artifacts kept for the current upload
const EXPORT_CACHE_ENTRIES: usize = 16;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No report has been uploaded")]
    NoUpload,

    #[error("No date range is configured for the roofing summary")]
    NoAggregationRange,

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Column mapping rejected: {0}")]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Failed to build cache key: {0}")]
    CacheKey(#[from] serde_json::Error),
}

/// The current upload
#[derive(Debug, Clone)]
struct Upload {
    file_name: Option<String>,
    hash: String,
    ingested: Ingested,
}

pub struct LeadSession {
    config: SessionConfig,
    today: NaiveDate,
    upload: Option<Upload>,
    suggested: ColumnMapping,
    mapping: ColumnMapping,
    ingest_cache: Memo<Ingested>,
    export_cache: Memo<ExportArtifact>,
}

impl LeadSession {
    /// A session whose "today" is the local date
    pub fn new(config: SessionConfig) -> Self {
        Self::with_today(config, Local::now().date_naive())
    }

    pub fn with_today(config: SessionConfig, today: NaiveDate) -> Self {
        Self {
            config,
            today,
            upload: None,
            suggested: ColumnMapping::new(),
            mapping: ColumnMapping::new(),
            ingest_cache: Memo::bounded(INGEST_CACHE_ENTRIES),
            export_cache: Memo::bounded(EXPORT_CACHE_ENTRIES),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the configuration. The confirmed mapping is kept.
    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Ingest a new report, replacing the previous one. Mapping overrides
    /// from the configuration must name uploaded columns. On failure the
    /// session is left without an upload.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn upload(&mut self, file_name: Option<&str>, bytes: &[u8]) -> Result<&Ingested, SessionError> {
        self.upload = None;
        self.suggested = ColumnMapping::new();
        self.mapping = ColumnMapping::new();
        self.export_cache.clear();

        let hash = content_hash(bytes);
        let key = CacheKey::new(&hash, &(file_name, &self.config.ingest))?;
        let options = &self.config.ingest;
        let ingested = self
            .ingest_cache
            .get_or_try_insert_with(key, || permit_ingest::ingest(file_name, bytes, options))
            .map_err(|e| {
                warn!(error = %e, "Upload rejected");
                e
            })?;

        let suggested = suggest_mapping(ingested.table.columns());
        let mapping = with_overrides(&suggested, &self.config);
        if let Err(e) = mapping.validate(ingested.table.columns()) {
            warn!(error = %e, "Configured column mapping does not fit the upload");
            return Err(e.into());
        }
        self.suggested = suggested;
        self.mapping = mapping;
        info!(
            rows = ingested.table.len(),
            mapped = self.mapping.len(),
            "Report uploaded"
        );

        let upload = self.upload.insert(Upload {
            file_name: file_name.map(str::to_string),
            hash,
            ingested,
        });
        Ok(&upload.ingested)
    }

    pub fn ingested(&self) -> Result<&Ingested, SessionError> {
        Ok(&self.current()?.ingested)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.upload.as_ref().and_then(|u| u.file_name.as_deref())
    }

    /// The keyword guess, before configuration overrides
    pub fn suggested_mapping(&self) -> &ColumnMapping {
        &self.suggested
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Replace the mapping after validating it against the uploaded headers
    pub fn confirm_mapping(&mut self, mapping: ColumnMapping) -> Result<(), SessionError> {
        mapping.validate(self.current()?.ingested.table.columns())?;
        self.mapping = mapping;
        Ok(())
    }

    /// Assign one field, or unmap it with `None`
    pub fn set_field(&mut self, field: CanonicalField, column: Option<String>) -> Result<(), SessionError> {
        let mut mapping = self.mapping.clone();
        mapping.set(field, column);
        self.confirm_mapping(mapping)
    }

    pub fn mapped(&self) -> Result<MappedTable, SessionError> {
        Ok(apply_mapping(&self.current()?.ingested.table, &self.mapping)?)
    }

    pub fn leads(&self) -> Result<LeadSet, SessionError> {
        Ok(apply_filters(&self.mapped()?, &self.config.filters, self.today))
    }

    /// Lead table in display order, with helper columns when configured
    pub fn display(&self, leads: &LeadSet) -> Result<RecordTable, SessionError> {
        lead_display(leads, &self.config, self.today)
    }

    pub fn roofing_summary(&self) -> Result<RoofingSummary, SessionError> {
        let range = self.config.aggregation.as_ref().ok_or(SessionError::NoAggregationRange)?;
        Ok(aggregate(&self.mapped()?, range, &self.config.filters.roofing_keywords)?)
    }

    /// Everything non-fatal the user should see for the current state
    pub fn notices(&self) -> Result<Vec<Notice>, SessionError> {
        let mut notices = self.current()?.ingested.notices.clone();
        notices.extend(self.leads()?.notices);
        if let Some(range) = &self.config.aggregation {
            let summary = aggregate(&self.mapped()?, range, &self.config.filters.roofing_keywords)?;
            for notice in summary.notices {
                if !notices.contains(&notice) {
                    notices.push(notice);
                }
            }
        }
        notices.extend(available_formats().1);
        Ok(notices)
    }

    pub fn available_exports(&self) -> Vec<ExportFormat> {
        available_formats().0
    }

    /// Export the current leads (and the roofing summary when a range is
    /// configured). Results are memoized per upload, mapping, configuration
    /// and day.
    #[instrument(skip(self))]
    pub fn export(&mut self, format: ExportFormat) -> Result<ExportArtifact, SessionError> {
        let upload = self.upload.as_ref().ok_or(SessionError::NoUpload)?;
        let key = CacheKey::new(&upload.hash, &(format, &self.config, &self.mapping, self.today))?;
        let mapping = &self.mapping;
        let config = &self.config;
        let today = self.today;

        self.export_cache.get_or_try_insert_with(key, || -> Result<ExportArtifact, SessionError> {
            let mapped = apply_mapping(&upload.ingested.table, mapping)?;
            let leads = apply_filters(&mapped, &config.filters, today);
            let mut tables = vec![NamedTable::leads(lead_display(&leads, config, today)?)];
            if let Some(range) = &config.aggregation {
                let summary = aggregate(&mapped, range, &config.filters.roofing_keywords)?;
                tables.extend(summary_tables(&summary, range.granularity)?);
            }

            let options = ExportOptions {
                metadata_line: Some(
                    config
                        .export
                        .metadata_line
                        .clone()
                        .unwrap_or_else(|| format!("Generated {}. {}", today, leads.summary())),
                ),
                ..config.export.clone()
            };
            Ok(report_export::export(&tables, format, &options)?)
        })
    }

    fn current(&self) -> Result<&Upload, SessionError> {
        self.upload.as_ref().ok_or(SessionError::NoUpload)
    }
}

/// Suggested mapping with configured overrides applied. An override takes
/// its column away from whichever field the suggestion gave it to.
fn with_overrides(suggested: &ColumnMapping, config: &SessionConfig) -> ColumnMapping {
    let mut mapping = suggested.clone();
    for field in CanonicalField::ALL {
        let Some(column) = config.mapping_override(field) else {
            continue;
        };
        if let Some(column) = &column {
            let holders: Vec<CanonicalField> = mapping
                .iter()
                .filter(|(other, source)| *other != field && *source == column.as_str())
                .map(|(other, _)| other)
                .collect();
            for other in holders {
                mapping.set(other, None);
            }
        }
        mapping.set(field, column);
    }
    mapping
}

fn lead_display(leads: &LeadSet, config: &SessionConfig, today: NaiveDate) -> Result<RecordTable, SessionError> {
    Ok(display_table(
        &leads.leads,
        today,
        &config.filters.roofing_keywords,
        config.show_helpers,
    )?)
}

/// Series, contractor ranking and detail as exportable tables
fn summary_tables(summary: &RoofingSummary, granularity: BucketGranularity) -> Result<Vec<NamedTable>, TableError> {
    let period = match granularity {
        BucketGranularity::Week => "week",
        BucketGranularity::Month => "month",
    };
    let series = RecordTable::from_rows(
        vec!["Period Start".to_string(), "Roofing Permits".to_string()],
        summary
            .series
            .iter()
            .map(|b| vec![CellValue::Date(b.bucket), CellValue::Number(b.count as f64)])
            .collect(),
    )?;
    let contractors = RecordTable::from_rows(
        vec!["Contractor".to_string(), "Roofing Permits".to_string()],
        summary
            .top_contractors
            .iter()
            .map(|c| vec![CellValue::Text(c.contractor.clone()), CellValue::Number(c.count as f64)])
            .collect(),
    )?;

    Ok(vec![
        NamedTable::new(format!("Roofing by {period}"), series),
        NamedTable::new("Top Contractors", contractors),
        NamedTable::new("Roofing Permits", summary.detail.clone()),
    ])
}
