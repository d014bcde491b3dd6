//! Session configuration loaded from TOML
//!
//! Every section is optional; a missing section takes the defaults of the
//! component it configures.

use anyhow::Context;
use lead_engine::{AggregationConfig, FilterConfig};
use permit_ingest::IngestOptions;
use permit_types::CanonicalField;
use report_export::ExportOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Mapping override value that leaves a field unmapped
pub const UNMAPPED: &str = "none";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub filters: FilterConfig,
    pub ingest: IngestOptions,
    pub export: ExportOptions,
    /// Roofing summary range; no summary sheet is exported without one
    pub aggregation: Option<AggregationConfig>,
    /// Append `_months_remaining` and `_roofing_related` to the lead table
    pub show_helpers: bool,
    /// Source column per canonical label ("Issued Date" = "Issue Dt"),
    /// applied over the suggested mapping
    pub mapping: BTreeMap<String, String>,
}

impl SessionConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use lead_session::SessionConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = SessionConfig::from_str(r#"
    ///     [filters]
    ///     max_months_remaining = 6
    ///     counties = ["Nevada"]
    /// "#)?;
    /// assert_eq!(config.filters.max_months_remaining, 6);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        if let Some(label) = config.mapping.keys().find(|l| CanonicalField::from_label(l).is_none()) {
            anyhow::bail!("Unknown field in [mapping]: {label}");
        }
        Ok(config)
    }

    /// Override value for `field`: `Some(None)` unmaps it, `None` keeps the
    /// suggestion
    pub fn mapping_override(&self, field: CanonicalField) -> Option<Option<String>> {
        self.mapping
            .iter()
            .find(|(label, _)| CanonicalField::from_label(label) == Some(field))
            .map(|(_, column)| {
                let column = column.trim();
                if column.eq_ignore_ascii_case(UNMAPPED) {
                    None
                } else {
                    Some(column.to_string())
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lead_engine::BucketGranularity;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SessionConfig::from_str("").unwrap();
        assert_eq!(config.filters, FilterConfig::default());
        assert_eq!(config.export.file_stem, "permit_leads");
        assert_eq!(config.ingest.extraction.time_budget_ms, 30_000);
        assert!(config.aggregation.is_none());
        assert!(!config.show_helpers);
    }

    #[test]
    fn test_full_config() {
        let config = SessionConfig::from_str(
            r#"
            show_helpers = true

            [filters]
            max_months_remaining = -2
            statuses = ["Issued"]
            exclude_roofing = false
            query = "main st"

            [ingest.extraction]
            time_budget_ms = 500
            max_pages = 3

            [export]
            title = "Nevada County leads"
            metadata_line = "Run weekly"

            [aggregation]
            start = "2025-01-01"
            end = "2025-03-31"
            granularity = "week"

            [mapping]
            "Issued Date" = "Issue Dt"
            county = "none"
            "#,
        )
        .unwrap();

        assert!(config.show_helpers);
        assert_eq!(config.filters.max_months_remaining, -2);
        assert_eq!(config.filters.statuses, vec!["Issued"]);
        assert_eq!(config.filters.counties, FilterConfig::default().counties);
        assert_eq!(config.ingest.extraction.max_pages, Some(3));
        assert_eq!(config.export.metadata_line.as_deref(), Some("Run weekly"));

        let aggregation = config.aggregation.clone().unwrap();
        assert_eq!(aggregation.start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(aggregation.granularity, BucketGranularity::Week);
        assert_eq!(aggregation.top_n, 20);

        assert_eq!(
            config.mapping_override(CanonicalField::IssuedDate),
            Some(Some("Issue Dt".to_string()))
        );
        assert_eq!(config.mapping_override(CanonicalField::County), Some(None));
        assert_eq!(config.mapping_override(CanonicalField::Permit), None);
    }

    #[test]
    fn test_malformed_toml_has_context() {
        let err = SessionConfig::from_str("[filters\nmax = 1").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML configuration"));
    }

    #[test]
    fn test_unknown_mapping_label() {
        let err = SessionConfig::from_str("[mapping]\nOwner = \"Owner Name\"").unwrap_err();
        assert!(err.to_string().contains("Unknown field in [mapping]: Owner"));
    }

    #[test]
    fn test_missing_file() {
        let err = SessionConfig::from_file("/nonexistent/session.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
