//! Row filtering by date cutoff and data quality
//!
//! Every row gets exactly one verdict, evaluated in a fixed order so that a
//! row is never counted under two reasons: an unparseable timestamp first,
//! then the date cutoff, then the quality rules.

use crate::config::PipelineConfig;
use crate::constants::SEVERITY_RANGE;
use crate::error::Result;
use crate::schema::SchemaCatalog;
use crate::transform::coercion::parse_integer;
use crate::transform::deduplication::{DuplicateKey, DuplicateTracker};
use crate::transform::features::DerivedFeatures;
use crate::transform::stats::ChunkStats;
use polars::prelude::*;
use tracing::debug;

/// Why a row leaves the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityDefect {
    UnparseableTimestamp,
    NegativeDuration,
    OversizedString,
    InvalidSeverity,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    BeforeCutoff,
    Defect(QualityDefect),
}

/// Raw text columns the filter inspects
struct FilterInputs {
    severity: Option<StringChunked>,
    quality: Vec<StringChunked>,
    latitude: Option<StringChunked>,
    longitude: Option<StringChunked>,
}

/// Applies the date-cutoff and quality predicates to a chunk
#[derive(Debug)]
pub struct RowFilter<'a> {
    config: &'a PipelineConfig,
    catalog: &'a SchemaCatalog,
}

impl<'a> RowFilter<'a> {
    pub fn new(config: &'a PipelineConfig, catalog: &'a SchemaCatalog) -> Self {
        Self { config, catalog }
    }

    /// Keep the rows that pass every predicate and count the rest
    ///
    /// # Arguments
    ///
    /// * `df` - Chunk after feature derivation
    /// * `features` - Parsed timestamps and duration flags for each row
    /// * `stats` - Chunk statistics receiving the drop counts
    ///
    /// # Returns
    ///
    /// The chunk restricted to kept rows, in their original order
    pub fn apply(
        &self,
        df: &DataFrame,
        features: &DerivedFeatures,
        stats: &mut ChunkStats,
    ) -> Result<DataFrame> {
        let inputs = self.collect_inputs(df)?;
        let mut tracker = self.config.deduplicate.then(DuplicateTracker::new);

        let mask: BooleanChunked = (0..df.height())
            .map(|row| {
                let verdict = self.classify(row, &inputs, features, tracker.as_mut());
                match verdict {
                    Verdict::Keep => {}
                    Verdict::BeforeCutoff => stats.rows_dropped_by_date += 1,
                    Verdict::Defect(defect) => {
                        stats.rows_dropped_by_quality += 1;
                        let counter = match defect {
                            QualityDefect::UnparseableTimestamp => {
                                &mut stats.quality.unparseable_timestamp
                            }
                            QualityDefect::NegativeDuration => &mut stats.quality.negative_duration,
                            QualityDefect::OversizedString => &mut stats.quality.oversized_string,
                            QualityDefect::InvalidSeverity => &mut stats.quality.invalid_severity,
                            QualityDefect::Duplicate => &mut stats.quality.duplicates,
                        };
                        *counter += 1;
                    }
                }
                verdict == Verdict::Keep
            })
            .collect();

        let filtered = df.filter(&mask)?;
        debug!(
            "Row filter kept {} of {} rows ({} by date, {} by quality)",
            filtered.height(),
            df.height(),
            stats.rows_dropped_by_date,
            stats.rows_dropped_by_quality
        );
        Ok(filtered)
    }

    fn classify(
        &self,
        row: usize,
        inputs: &FilterInputs,
        features: &DerivedFeatures,
        tracker: Option<&mut DuplicateTracker>,
    ) -> Verdict {
        let Some(start) = features.start.get(row).copied().flatten() else {
            return Verdict::Defect(QualityDefect::UnparseableTimestamp);
        };

        if start < self.config.date_cutoff {
            return Verdict::BeforeCutoff;
        }

        if let Some(severity) = &inputs.severity {
            let valid = severity
                .get(row)
                .and_then(parse_integer)
                .is_some_and(|level| SEVERITY_RANGE.contains(&level));
            if !valid {
                return Verdict::Defect(QualityDefect::InvalidSeverity);
            }
        }

        if features.negative_duration.get(row).copied().unwrap_or(false) {
            return Verdict::Defect(QualityDefect::NegativeDuration);
        }

        let max = self.config.max_string_length;
        let oversized = inputs.quality.iter().any(|column| {
            column
                .get(row)
                .is_some_and(|value| value.trim().chars().count() > max)
        });
        if oversized {
            return Verdict::Defect(QualityDefect::OversizedString);
        }

        if let Some(tracker) = tracker {
            let key = DuplicateKey::new(
                inputs.latitude.as_ref().and_then(|c| c.get(row)),
                inputs.longitude.as_ref().and_then(|c| c.get(row)),
                start,
            );
            if tracker.is_duplicate(key) {
                return Verdict::Defect(QualityDefect::Duplicate);
            }
        }

        Verdict::Keep
    }

    fn collect_inputs(&self, df: &DataFrame) -> Result<FilterInputs> {
        let severity = if self.config.validate_severity {
            text_column(df, self.catalog.severity_column())?
        } else {
            None
        };

        let mut quality = Vec::with_capacity(self.catalog.quality_columns().len());
        for name in self.catalog.quality_columns() {
            if let Some(column) = text_column(df, name)? {
                quality.push(column);
            }
        }

        let (latitude, longitude) = if self.config.deduplicate {
            let (lat, lng) = self.catalog.location_columns();
            (text_column(df, lat)?, text_column(df, lng)?)
        } else {
            (None, None)
        };

        Ok(FilterInputs {
            severity,
            quality,
            latitude,
            longitude,
        })
    }
}

fn text_column(df: &DataFrame, name: &str) -> Result<Option<StringChunked>> {
    if df.get_column_index(name).is_none() {
        return Ok(None);
    }
    let series = df.column(name)?.as_materialized_series();
    let text = match series.dtype() {
        DataType::String => series.str()?.clone(),
        _ => series.cast(&DataType::String)?.str()?.clone(),
    };
    Ok(Some(text))
}
