//! Feature derivation from accident timestamps
//!
//! Computes the time-dimension columns and DURATION from the raw start and
//! end timestamps, then removes the consumed timestamp columns. The parsed
//! start timestamps are handed to the row filter so the text is parsed once.

use crate::constants::TIMESTAMP_FORMATS;
use crate::error::Result;
use crate::models::DerivationKind;
use crate::schema::SchemaCatalog;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use polars::prelude::*;
use tracing::{debug, warn};

/// Parse a raw export timestamp in any of the known layouts
///
/// The local wall-clock value is kept as-is; no timezone shift is applied.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Value of one derived feature for a row
pub fn derive_value(
    kind: DerivationKind,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
) -> Option<i64> {
    let value = match kind {
        DerivationKind::Year => start.year() as i64,
        DerivationKind::Quarter => start.month().div_ceil(3) as i64,
        DerivationKind::Month => start.month() as i64,
        DerivationKind::Day => start.day() as i64,
        DerivationKind::Hour => start.hour() as i64,
        DerivationKind::Minute => start.minute() as i64,
        DerivationKind::Second => start.second() as i64,
        DerivationKind::IsWeekend => {
            i64::from(matches!(start.weekday(), Weekday::Sat | Weekday::Sun))
        }
        DerivationKind::Duration => (end? - start).num_seconds().max(0),
    };
    Some(value)
}

/// Per-row results of feature derivation that later phases need
#[derive(Debug, Clone, Default)]
pub struct DerivedFeatures {
    /// Parsed primary timestamp, `None` where it failed to parse
    pub start: Vec<Option<NaiveDateTime>>,
    /// Rows whose end timestamp precedes the start timestamp
    pub negative_duration: Vec<bool>,
    /// Names of the columns added to the chunk
    pub added: Vec<String>,
    /// Names of the timestamp columns removed from the chunk
    pub consumed: Vec<String>,
}

/// Computes derived columns from the chunk's timestamps
#[derive(Debug)]
pub struct FeatureDeriver<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> FeatureDeriver<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Add every derived column to the chunk and drop the consumed timestamps
    ///
    /// # Arguments
    ///
    /// * `df` - Chunk containing the primary (and optionally end) timestamp
    ///
    /// # Returns
    ///
    /// Parsed timestamps and negative-duration flags for the row filter
    pub fn derive(&self, df: &mut DataFrame) -> Result<DerivedFeatures> {
        let start = self.parse_column(df, self.catalog.primary_timestamp())?;
        let end = match self.catalog.end_timestamp() {
            Some(name) if df.get_column_index(name).is_some() => {
                Some(self.parse_column(df, name)?)
            }
            Some(name) => {
                warn!("End timestamp column {} missing from chunk", name);
                None
            }
            None => None,
        };

        let negative_duration: Vec<bool> = match &end {
            Some(end) => start
                .iter()
                .zip(end)
                .map(|pair| matches!(pair, (Some(begin), Some(finish)) if finish < begin))
                .collect(),
            None => vec![false; start.len()],
        };

        let mut added = Vec::with_capacity(self.catalog.derived_columns().len());
        for derived in self.catalog.derived_columns() {
            let values: Vec<Option<i64>> = start
                .iter()
                .enumerate()
                .map(|(row, timestamp)| {
                    let end_timestamp = end.as_ref().and_then(|end| end[row]);
                    timestamp.and_then(|ts| derive_value(derived.kind, ts, end_timestamp))
                })
                .collect();
            df.with_column(Series::new(derived.name.as_str().into(), values))?;
            added.push(derived.name.clone());
        }

        let mut consumed = Vec::new();
        for name in self.catalog.consumed_columns() {
            if df.get_column_index(name).is_some() {
                df.drop_in_place(name)?;
                consumed.push(name.clone());
            }
        }

        debug!(
            "Derived {} columns and consumed {:?} for {} rows",
            added.len(),
            consumed,
            start.len()
        );

        Ok(DerivedFeatures {
            start,
            negative_duration,
            added,
            consumed,
        })
    }

    fn parse_column(&self, df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDateTime>>> {
        let column = df.column(name)?.as_materialized_series();
        let parsed: Vec<Option<NaiveDateTime>> = match column.dtype() {
            DataType::String => column
                .str()?
                .into_iter()
                .map(|value| value.and_then(parse_timestamp))
                .collect(),
            _ => column
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(|value| value.and_then(parse_timestamp))
                .collect(),
        };
        Ok(parsed)
    }
}
