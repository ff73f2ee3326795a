//! Type coercion and string normalisation for chunk columns
//!
//! Raw CSV values arrive as text. Each catalog column is narrowed to its
//! semantic type here. A value that cannot be represented degrades to null
//! and is then replaced by the column default when the column is not
//! nullable. Only a column that is (almost) entirely invalid is fatal.

use crate::error::{ProcessorError, Result};
use crate::models::{ColumnDescriptor, DefaultValue, IntegerWidth, SemanticType};
use crate::schema::SchemaCatalog;
use crate::transform::stats::ChunkStats;
use polars::prelude::*;
use tracing::debug;

/// Outcome of parsing one raw value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<T> {
    Missing,
    Valid(T),
    Invalid,
}

impl<T> Cell<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Cell::Valid(value) => Some(value),
            Cell::Missing | Cell::Invalid => None,
        }
    }
}

/// Parse an integer, accepting integral floats such as `2.0`
pub fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => {
            if value >= i64::MIN as f64 && value <= i64::MAX as f64 {
                Some(value as i64)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Parse a boolean flag: 0/1/true/false in any case
pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Round half away from zero and reject values wider than `precision` digits
pub fn fit_decimal(value: f64, precision: u32, scale: u32) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }

    let factor = 10f64.powi(scale as i32);
    let rounded = (value * factor).round() / factor;
    let limit = 10f64.powi(precision.saturating_sub(scale) as i32);

    if rounded.abs() >= limit {
        None
    } else {
        Some(rounded)
    }
}

fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

fn integer_cells(series: &Series, width: IntegerWidth) -> Result<Vec<Cell<i64>>> {
    let (min, max) = width.range();
    let in_range = |value: i64| {
        if value >= min && value <= max {
            Cell::Valid(value)
        } else {
            Cell::Invalid
        }
    };

    let cells = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|value| match value {
                None => Cell::Missing,
                Some(raw) if is_blank(raw) => Cell::Missing,
                Some(raw) => parse_integer(raw).map_or(Cell::Invalid, in_range),
            })
            .collect(),
        _ => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|value| value.map_or(Cell::Missing, in_range))
            .collect(),
    };
    Ok(cells)
}

fn decimal_cells(series: &Series, precision: u32, scale: u32) -> Result<Vec<Cell<f64>>> {
    let fit = |value: f64| fit_decimal(value, precision, scale).map_or(Cell::Invalid, Cell::Valid);

    let cells = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|value| match value {
                None => Cell::Missing,
                Some(raw) if is_blank(raw) => Cell::Missing,
                Some(raw) => raw.trim().parse::<f64>().map_or(Cell::Invalid, fit),
            })
            .collect(),
        _ => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|value| value.map_or(Cell::Missing, fit))
            .collect(),
    };
    Ok(cells)
}

fn boolean_cells(series: &Series) -> Result<Vec<Cell<bool>>> {
    let cells = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|value| match value {
                None => Cell::Missing,
                Some(raw) if is_blank(raw) => Cell::Missing,
                Some(raw) => parse_boolean(raw).map_or(Cell::Invalid, Cell::Valid),
            })
            .collect(),
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|value| value.map_or(Cell::Missing, Cell::Valid))
            .collect(),
        _ => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|value| match value {
                None => Cell::Missing,
                Some(0) => Cell::Valid(false),
                Some(1) => Cell::Valid(true),
                Some(_) => Cell::Invalid,
            })
            .collect(),
    };
    Ok(cells)
}

/// Result of coercing one column
#[derive(Debug)]
pub struct CoercedColumn {
    pub series: Series,
    pub invalid: usize,
    pub non_null: usize,
    pub defaults_filled: usize,
}

/// Narrow a raw column to its catalog type, filling defaults for nulls
///
/// # Arguments
///
/// * `series` - Raw column; text or an already numeric derived column
/// * `descriptor` - Catalog entry for the column
///
/// # Returns
///
/// The typed column and counts of invalid values and default fills
pub fn coerce_column(series: &Series, descriptor: &ColumnDescriptor) -> Result<CoercedColumn> {
    let name = series.name().clone();

    match descriptor.semantic_type {
        SemanticType::NarrowInteger(width) => {
            let cells = integer_cells(series, width)?;
            let default = match &descriptor.default_for_null {
                Some(DefaultValue::Integer(value)) => Some(*value),
                _ => None,
            };
            let (values, counts) = resolve(cells, default, descriptor.nullable);
            let series = match width {
                IntegerWidth::I8 => Int8Chunked::from_iter_options(
                    name,
                    values.into_iter().map(|v| v.map(|v| v as i8)),
                )
                .into_series(),
                IntegerWidth::I16 => Int16Chunked::from_iter_options(
                    name,
                    values.into_iter().map(|v| v.map(|v| v as i16)),
                )
                .into_series(),
                IntegerWidth::I32 => Int32Chunked::from_iter_options(
                    name,
                    values.into_iter().map(|v| v.map(|v| v as i32)),
                )
                .into_series(),
            };
            Ok(counts.with_series(series))
        }
        SemanticType::Decimal { precision, scale } => {
            let cells = decimal_cells(series, precision, scale)?;
            let default = match &descriptor.default_for_null {
                Some(DefaultValue::Decimal(value)) => Some(*value),
                Some(DefaultValue::Integer(value)) => Some(*value as f64),
                _ => None,
            };
            let (values, counts) = resolve(cells, default, descriptor.nullable);
            let series = Float64Chunked::from_iter_options(name, values.into_iter()).into_series();
            Ok(counts.with_series(series))
        }
        SemanticType::Boolean => {
            let cells = boolean_cells(series)?;
            let default = match &descriptor.default_for_null {
                Some(DefaultValue::Boolean(value)) => Some(*value),
                _ => None,
            };
            let (values, counts) = resolve(cells, default, descriptor.nullable);
            // Emitted as 0/1 for BIT columns
            let series = Int8Chunked::from_iter_options(
                name,
                values.into_iter().map(|v| v.map(i8::from)),
            )
            .into_series();
            Ok(counts.with_series(series))
        }
        SemanticType::BoundedString { .. } => {
            let series = match series.dtype() {
                DataType::String => series.clone(),
                _ => series.cast(&DataType::String)?,
            };
            Ok(CoercedColumn {
                non_null: series.len() - series.null_count(),
                series,
                invalid: 0,
                defaults_filled: 0,
            })
        }
    }
}

struct CellCounts {
    invalid: usize,
    non_null: usize,
    defaults_filled: usize,
}

impl CellCounts {
    fn with_series(self, series: Series) -> CoercedColumn {
        CoercedColumn {
            series,
            invalid: self.invalid,
            non_null: self.non_null,
            defaults_filled: self.defaults_filled,
        }
    }
}

fn resolve<T: Copy>(
    cells: Vec<Cell<T>>,
    default: Option<T>,
    nullable: bool,
) -> (Vec<Option<T>>, CellCounts) {
    let mut counts = CellCounts {
        invalid: 0,
        non_null: 0,
        defaults_filled: 0,
    };

    let values = cells
        .into_iter()
        .map(|cell| {
            match cell {
                Cell::Valid(_) => counts.non_null += 1,
                Cell::Invalid => {
                    counts.non_null += 1;
                    counts.invalid += 1;
                }
                Cell::Missing => {}
            }
            match (cell.into_option(), default) {
                (Some(value), _) => Some(value),
                (None, Some(fill)) if !nullable => {
                    counts.defaults_filled += 1;
                    Some(fill)
                }
                (None, _) => None,
            }
        })
        .collect();

    (values, counts)
}

/// Applies catalog types to every catalog column present in a chunk
#[derive(Debug)]
pub struct TypeCoercer<'a> {
    catalog: &'a SchemaCatalog,
    max_invalid_fraction: f64,
}

impl<'a> TypeCoercer<'a> {
    pub fn new(catalog: &'a SchemaCatalog, max_invalid_fraction: f64) -> Self {
        Self {
            catalog,
            max_invalid_fraction,
        }
    }

    /// Invalid share is measured over all rows of the chunk. A lone value is
    /// never enough to abort: at least two non-null values must be present.
    fn is_fatal(&self, coerced: &CoercedColumn, rows: usize) -> bool {
        if coerced.non_null < 2 || rows == 0 {
            return false;
        }
        coerced.invalid as f64 / rows as f64 >= self.max_invalid_fraction
    }

    /// Coerce all typed catalog columns of the chunk in place
    pub fn coerce(&self, df: &mut DataFrame, stats: &mut ChunkStats) -> Result<()> {
        for descriptor in self.catalog.descriptors() {
            if descriptor.semantic_type.is_textual() {
                continue;
            }

            let Some(column) = df.column(&descriptor.source_name).ok() else {
                continue;
            };
            let rows = column.len();
            let coerced = coerce_column(column.as_materialized_series(), descriptor)?;

            if coerced.invalid > 0 {
                if self.is_fatal(&coerced, rows) {
                    return Err(ProcessorError::CoercionFailed {
                        column: descriptor.source_name.clone(),
                        invalid: coerced.invalid,
                        checked: rows,
                        limit: self.max_invalid_fraction * 100.0,
                    });
                }
                debug!(
                    "{} invalid values in column {} replaced",
                    coerced.invalid, descriptor.source_name
                );
            }

            stats.add_coercion_warnings(&descriptor.target_name, coerced.invalid);
            stats.add_defaults_filled(&descriptor.target_name, coerced.defaults_filled);
            df.with_column(coerced.series)?;
        }

        Ok(())
    }

    /// Trim every text column and fill textual defaults
    ///
    /// Empty values become null; catalog columns with a textual default get
    /// that default instead. Values longer than the column's bound are left
    /// intact and counted as coercion warnings.
    pub fn normalize_strings(&self, df: &mut DataFrame, stats: &mut ChunkStats) -> Result<()> {
        let text_columns: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|column| column.dtype() == &DataType::String)
            .map(|column| column.name().to_string())
            .collect();

        for name in text_columns {
            let descriptor = self.catalog.descriptor_for_source(&name);
            let fill = descriptor.and_then(ColumnDescriptor::text_default);
            let max_len = match descriptor.map(|d| d.semantic_type) {
                Some(SemanticType::BoundedString { max_len }) => Some(max_len),
                _ => None,
            };

            let mut filled = 0;
            let mut oversized = 0;
            let normalized: StringChunked = {
                let raw = df.column(&name)?.as_materialized_series().str()?;
                raw.into_iter()
                    .map(|value| {
                        let trimmed = value.map(str::trim).filter(|v| !v.is_empty());
                        match (trimmed, fill) {
                            (Some(text), _) => {
                                if max_len.is_some_and(|max| text.chars().count() > max) {
                                    oversized += 1;
                                }
                                Some(text.to_string())
                            }
                            (None, Some(default)) => {
                                filled += 1;
                                Some(default.to_string())
                            }
                            (None, None) => None,
                        }
                    })
                    .collect()
            };

            let target = self.catalog.target_name_for(&name);
            stats.add_defaults_filled(&target, filled);
            stats.add_coercion_warnings(&target, oversized);
            if oversized > 0 {
                debug!(
                    "{} values in {} exceed the column bound of {:?}",
                    oversized, name, max_len
                );
            }

            df.with_column(normalized.with_name(name.as_str().into()).into_series())?;
        }

        Ok(())
    }
}
