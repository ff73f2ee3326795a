//! Configuration management and validation.
//!
//! A single `PipelineConfig` is resolved once at startup, validated eagerly,
//! and then passed by reference to every component. Nothing downstream reads
//! the environment or the command line directly.

use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_DATE_CUTOFF, DEFAULT_MAX_INVALID_FRACTION,
    DEFAULT_MAX_STRING_LENGTH, OUTPUT_SUFFIX, REPORT_SUFFIX, TIMESTAMP_FORMATS,
};
use crate::error::{ProcessorError, Result};
use crate::models::DerivationKind;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which calendar parts are derived from the primary timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFeatureSet {
    /// YEAR, QUARTER, MONTH, DAY, HOUR, IS_WEEKEND
    #[default]
    Standard,
    /// Standard plus MINUTE and SECOND
    Extended,
}

impl TimeFeatureSet {
    /// Derivations in output order
    pub fn kinds(&self) -> Vec<DerivationKind> {
        let mut kinds = vec![
            DerivationKind::Year,
            DerivationKind::Quarter,
            DerivationKind::Month,
            DerivationKind::Day,
            DerivationKind::Hour,
        ];
        if *self == TimeFeatureSet::Extended {
            kinds.push(DerivationKind::Minute);
            kinds.push(DerivationKind::Second);
        }
        kinds.push(DerivationKind::IsWeekend);
        kinds
    }
}

/// Global configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Raw accident export to read
    pub input_path: PathBuf,

    /// Output CSV; defaults to `<input_stem>-cleaned.csv` beside the input
    pub output_path: Option<PathBuf>,

    /// Report file; defaults to `<output_stem>_report.txt` beside the output
    pub report_path: Option<PathBuf>,

    /// Rows read and processed per chunk
    pub chunk_size: usize,

    /// Rows whose primary timestamp is before this instant are dropped
    pub date_cutoff: NaiveDateTime,

    /// Replaces the built-in drop list when set
    pub delete_columns: Option<Vec<String>>,

    /// Calendar parts derived from the primary timestamp
    pub time_features: TimeFeatureSet,

    /// Longest trimmed value allowed in a quality-checked text column
    pub max_string_length: usize,

    /// Replaces the catalog's quality-checked text columns when set
    pub quality_columns: Option<Vec<String>>,

    /// Drop rows whose severity is outside 1..=4
    pub validate_severity: bool,

    /// Drop near-duplicate rows within each chunk
    pub deduplicate: bool,

    /// Invalid-value fraction in one column of one chunk that aborts the run
    pub max_invalid_fraction: f64,

    /// Show a progress bar while chunks are processed
    pub show_progress: bool,

    /// Diagnostic output only; never changes results
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            output_path: None,
            report_path: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            date_cutoff: parse_date_cutoff(DEFAULT_DATE_CUTOFF).unwrap_or_default(),
            delete_columns: None,
            time_features: TimeFeatureSet::Standard,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            quality_columns: None,
            validate_severity: true,
            deduplicate: false,
            max_invalid_fraction: DEFAULT_MAX_INVALID_FRACTION,
            show_progress: true,
            verbose: false,
        }
    }
}

impl PipelineConfig {
    /// Create configuration for the given input file with all defaults
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            ..Default::default()
        }
    }

    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    pub fn with_report_path(mut self, report_path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(report_path.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_date_cutoff(mut self, date_cutoff: NaiveDateTime) -> Self {
        self.date_cutoff = date_cutoff;
        self
    }

    /// Replace the built-in drop list
    pub fn with_delete_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.delete_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_time_features(mut self, time_features: TimeFeatureSet) -> Self {
        self.time_features = time_features;
        self
    }

    pub fn with_max_string_length(mut self, max_string_length: usize) -> Self {
        self.max_string_length = max_string_length;
        self
    }

    pub fn with_quality_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quality_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_deduplication(mut self) -> Self {
        self.deduplicate = true;
        self
    }

    pub fn without_severity_check(mut self) -> Self {
        self.validate_severity = false;
        self
    }

    pub fn with_max_invalid_fraction(mut self, fraction: f64) -> Self {
        self.max_invalid_fraction = fraction;
        self
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Output path, derived from the input path when not given
    pub fn resolved_output_path(&self) -> PathBuf {
        match &self.output_path {
            Some(path) => path.clone(),
            None => sibling_with_suffix(&self.input_path, OUTPUT_SUFFIX, "csv"),
        }
    }

    /// Report path, derived from the output path when not given
    pub fn resolved_report_path(&self) -> PathBuf {
        match &self.report_path {
            Some(path) => path.clone(),
            None => sibling_with_suffix(&self.resolved_output_path(), REPORT_SUFFIX, "txt"),
        }
    }

    /// Check everything that can be checked without reading the input
    pub fn validate(&self) -> Result<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(ProcessorError::configuration("input path is required"));
        }

        if self.chunk_size == 0 {
            return Err(ProcessorError::configuration(
                "chunk size must be at least one row",
            ));
        }

        if self.max_string_length == 0 {
            return Err(ProcessorError::configuration(
                "maximum string length must be positive",
            ));
        }

        if !(self.max_invalid_fraction > 0.0 && self.max_invalid_fraction <= 1.0) {
            return Err(ProcessorError::configuration(format!(
                "invalid-value fraction must be in (0, 1], got {}",
                self.max_invalid_fraction
            )));
        }

        if let Some(columns) = &self.delete_columns {
            if columns.iter().any(|name| name.trim().is_empty()) {
                return Err(ProcessorError::configuration(
                    "delete column list contains an empty name",
                ));
            }
        }

        if let Some(columns) = &self.quality_columns {
            if columns.iter().any(|name| name.trim().is_empty()) {
                return Err(ProcessorError::configuration(
                    "quality column list contains an empty name",
                ));
            }
        }

        if self.resolved_output_path() == self.input_path {
            return Err(ProcessorError::configuration(
                "output path must differ from the input path",
            ));
        }

        debug!("Configuration validated: {:?}", self);
        Ok(())
    }
}

/// Parse a cutoff given as `YYYY-MM-DD` or a full timestamp
pub fn parse_date_cutoff(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(timestamp);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| {
            ProcessorError::configuration(format!(
                "malformed date cutoff '{}' (expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)",
                value
            ))
        })
}

/// Split a comma-separated column list, dropping surrounding whitespace
pub fn parse_column_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn sibling_with_suffix(path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    path.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{}{}.{}", stem, suffix, extension))
}
