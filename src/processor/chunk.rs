//! Per-chunk transformation state machine
//!
//! DROP_COLUMNS -> DERIVE_FEATURES -> FILTER_ROWS -> COERCE_TYPES ->
//! NORMALIZE_STRINGS -> RENAME_COLUMNS -> REORDER_COLUMNS. Phases run strictly
//! in this order; any fatal error is tagged with the chunk index and phase.

use crate::config::PipelineConfig;
use crate::error::{ProcessorError, Result};
use crate::models::Phase;
use crate::schema::SchemaCatalog;
use crate::transform::{ChunkStats, FeatureDeriver, RowFilter, TypeCoercer};
use polars::prelude::*;
use tracing::debug;

/// Pure transformation of one chunk into its output form
#[derive(Debug)]
pub struct ChunkProcessor<'a> {
    catalog: &'a SchemaCatalog,
    deriver: FeatureDeriver<'a>,
    filter: RowFilter<'a>,
    coercer: TypeCoercer<'a>,
}

impl<'a> ChunkProcessor<'a> {
    pub fn new(config: &'a PipelineConfig, catalog: &'a SchemaCatalog) -> Self {
        Self {
            catalog,
            deriver: FeatureDeriver::new(catalog),
            filter: RowFilter::new(config, catalog),
            coercer: TypeCoercer::new(catalog, config.max_invalid_fraction),
        }
    }

    /// Run every phase on a chunk
    ///
    /// # Arguments
    ///
    /// * `chunk_index` - Zero-based position of the chunk in the input
    /// * `chunk` - Raw text columns as read from the source
    ///
    /// # Returns
    ///
    /// The chunk in target column order together with its statistics
    pub fn process(&self, chunk_index: usize, chunk: DataFrame) -> Result<(DataFrame, ChunkStats)> {
        let mut stats = ChunkStats::new(chunk_index, chunk.height());
        let fail = |phase: Phase| move |e: ProcessorError| e.in_chunk(chunk_index, phase);

        let mut df = chunk;
        self.drop_columns(&mut df, &mut stats)
            .map_err(fail(Phase::DropColumns))?;

        let features = self
            .deriver
            .derive(&mut df)
            .map_err(fail(Phase::DeriveFeatures))?;
        stats.columns_derived = features.added.len();

        let mut df = self
            .filter
            .apply(&df, &features, &mut stats)
            .map_err(fail(Phase::FilterRows))?;

        self.coercer
            .coerce(&mut df, &mut stats)
            .map_err(fail(Phase::CoerceTypes))?;

        self.coercer
            .normalize_strings(&mut df, &mut stats)
            .map_err(fail(Phase::NormalizeStrings))?;

        self.rename_columns(&mut df)
            .map_err(fail(Phase::RenameColumns))?;

        let df = self
            .reorder_columns(df, &mut stats)
            .map_err(fail(Phase::ReorderColumns))?;

        stats.rows_out = df.height();
        debug_assert!(stats.is_consistent(), "row accounting broken: {:?}", stats);

        debug!(
            "Chunk {}: {} rows in, {} out ({} by date, {} by quality)",
            chunk_index,
            stats.rows_in,
            stats.rows_out,
            stats.rows_dropped_by_date,
            stats.rows_dropped_by_quality
        );

        Ok((df, stats))
    }

    /// Remove configured columns; ones already absent are ignored
    fn drop_columns(&self, df: &mut DataFrame, stats: &mut ChunkStats) -> Result<()> {
        for name in self.catalog.columns_to_drop() {
            if df.get_column_index(name).is_some() {
                df.drop_in_place(name)?;
                stats.columns_dropped += 1;
            }
        }
        Ok(())
    }

    /// Apply source-to-target names; unmapped columns get their canonical name
    fn rename_columns(&self, df: &mut DataFrame) -> Result<()> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        for name in names {
            let target = self.catalog.target_name_for(&name);
            if target != name {
                df.rename(&name, target.as_str().into())?;
            }
        }
        Ok(())
    }

    /// Project onto the exact target order
    fn reorder_columns(&self, df: DataFrame, stats: &mut ChunkStats) -> Result<DataFrame> {
        let target_order = self.catalog.target_order();

        let missing: Vec<String> = target_order
            .iter()
            .filter(|name| df.get_column_index(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ProcessorError::SchemaMismatch { missing });
        }

        stats.unmapped_columns = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .filter(|name| !target_order.contains(name))
            .collect();
        if !stats.unmapped_columns.is_empty() {
            debug!(
                "Discarding columns outside the target schema: {:?}",
                stats.unmapped_columns
            );
        }

        Ok(df.select(target_order.iter().map(String::as_str))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &[&str] = &[
        "ID", "Severity", "Start_Time", "End_Time", "Start_Lat", "Start_Lng", "City",
    ];

    fn raw_chunk(rows: &[[&str; 7]]) -> DataFrame {
        let columns = HEADER
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let values: Vec<Option<&str>> = rows
                    .iter()
                    .map(|row| Some(row[index]).filter(|v| !v.is_empty()))
                    .collect();
                Column::from(Series::new((*name).into(), values))
            })
            .collect();
        DataFrame::new(columns).unwrap()
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig::new("in.csv")
    }

    fn narrow_catalog(config: &PipelineConfig) -> SchemaCatalog {
        SchemaCatalog::new(config).unwrap()
    }

    #[test]
    fn test_missing_target_column_is_schema_mismatch() {
        let config = small_config();
        let catalog = narrow_catalog(&config);
        let processor = ChunkProcessor::new(&config, &catalog);

        let chunk = raw_chunk(&[[
            "A-1",
            "2",
            "2019-03-01 08:00:00",
            "2019-03-01 08:05:30",
            "39.865",
            "-84.058",
            "Dayton",
        ]]);
        let err = processor.process(4, chunk).unwrap_err();

        match err {
            ProcessorError::ChunkFailed {
                chunk,
                phase,
                source,
            } => {
                assert_eq!(chunk, 4);
                assert_eq!(phase, Phase::ReorderColumns);
                assert!(matches!(*source, ProcessorError::SchemaMismatch { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rename_maps_catalog_and_unknown_columns() {
        let config = small_config();
        let catalog = narrow_catalog(&config);
        let processor = ChunkProcessor::new(&config, &catalog);

        let mut df = DataFrame::new(vec![
            Column::from(Series::new("Distance(mi)".into(), vec!["1.0"])),
            Column::from(Series::new("Start_Lat".into(), vec!["39.8"])),
            Column::from(Series::new("Extra Notes".into(), vec!["x"])),
        ])
        .unwrap();
        processor.rename_columns(&mut df).unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["DISTANCE", "LATITUDE", "EXTRA_NOTES"]);
    }

    #[test]
    fn test_drop_ignores_absent_columns() {
        let config = small_config();
        let catalog = narrow_catalog(&config);
        let processor = ChunkProcessor::new(&config, &catalog);

        let mut df = raw_chunk(&[["A-1", "2", "2019-03-01 08:00:00", "", "", "", "X"]]);
        let mut stats = ChunkStats::default();
        processor.drop_columns(&mut df, &mut stats).unwrap();

        assert_eq!(stats.columns_dropped, 1);
        assert!(df.get_column_index("ID").is_none());
        assert_eq!(df.width(), HEADER.len() - 1);
    }
}
