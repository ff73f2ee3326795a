//! Main processing engine.
//!
//! Drives the complete run: header validation, sequential chunk reading,
//! per-chunk transformation, append-only output, statistics accumulation
//! and the final report. Chunks are handled strictly one at a time.

pub mod chunk;
pub mod reader;
pub mod report;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{chunk::ChunkProcessor, reader::ChunkReader, writer::ChunkWriter};

use crate::config::PipelineConfig;
use crate::constants::MEMORY_PRESSURE_THRESHOLD;
use crate::error::{ProcessorError, Result};
use crate::header::read_source_header;
use crate::models::Phase;
use crate::schema::SchemaCatalog;
use crate::transform::RunStats;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use sysinfo::System;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Main processor for the accident dataset
#[derive(Debug)]
pub struct DatasetProcessor {
    config: PipelineConfig,
    catalog: SchemaCatalog,
    output_path: PathBuf,
    report_path: PathBuf,
    cancellation: Option<CancellationToken>,
    system_monitor: System,
}

impl DatasetProcessor {
    /// Create a processor, validating configuration before any data is read
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        if !config.input_path.is_file() {
            return Err(ProcessorError::InputNotFound {
                path: config.input_path.clone(),
            });
        }

        let catalog = SchemaCatalog::new(&config)?;
        let output_path = config.resolved_output_path();
        let report_path = config.resolved_report_path();

        Ok(Self {
            config,
            catalog,
            output_path,
            report_path,
            cancellation: None,
            system_monitor: System::new(),
        })
    }

    /// Stop at the next chunk boundary once the token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Main processing entry point
    pub fn process(&mut self) -> Result<RunStats> {
        let start_time = Instant::now();
        let input_path = self.config.input_path.clone();

        info!("Processing {}", input_path.display());
        info!("Output: {}", self.output_path.display());

        let header = read_source_header(&input_path)?;
        self.catalog.validate_header(&header, &input_path)?;

        let mut stats = RunStats::new();
        stats.input_bytes = std::fs::metadata(&input_path)?.len();
        stats.input_columns = header.len();
        stats.output_columns = self.catalog.target_order().len();
        stats.columns_deleted = self
            .catalog
            .columns_to_drop()
            .iter()
            .filter(|name| header.contains(name))
            .cloned()
            .collect();
        stats.columns_consumed = self
            .catalog
            .consumed_columns()
            .iter()
            .filter(|name| header.contains(name))
            .cloned()
            .collect();
        stats.columns_added = self
            .catalog
            .derived_columns()
            .iter()
            .map(|derived| derived.name.clone())
            .collect();

        let mut writer = ChunkWriter::create(&self.output_path)?;

        if let Err(e) = self.run_chunks(&mut writer, &mut stats) {
            warn!(
                "Run aborted; partial output retained at {} ({} rows in {} chunks) and should be discarded",
                self.output_path.display(),
                writer.rows_written(),
                writer.chunks_written()
            );
            return Err(e);
        }

        if stats.chunks_processed == 0 {
            debug!("Input has no data rows; writing header only");
            writer.write_header_only(self.catalog.target_order())?;
        }

        stats.output_bytes = writer.finish()?;
        stats.elapsed = start_time.elapsed();

        let report = report::render_report(&stats, &self.config, &self.catalog);
        report::write_report(&self.report_path, &report)?;
        println!("{}", report);
        report::print_summary(&stats, &self.output_path, &self.report_path);

        info!("{}", stats.summary());
        Ok(stats)
    }

    fn run_chunks(&mut self, writer: &mut ChunkWriter, stats: &mut RunStats) -> Result<()> {
        let mut reader = ChunkReader::open(&self.config.input_path, self.config.chunk_size)?;
        let processor = ChunkProcessor::new(&self.config, &self.catalog);
        let progress = self.progress_bar(stats.input_bytes);

        let mut chunk_index = 0;
        loop {
            if let Some(token) = &self.cancellation {
                if token.is_cancelled() {
                    progress.abandon_with_message("interrupted");
                    return Err(ProcessorError::Interrupted {
                        reason: format!("stop requested before chunk {}", chunk_index),
                    });
                }
            }

            let Some(chunk) = reader
                .next_chunk()
                .map_err(|e| e.in_chunk(chunk_index, Phase::Read))?
            else {
                break;
            };

            let (mut processed, chunk_stats) = processor.process(chunk_index, chunk)?;
            writer
                .write_chunk(&mut processed)
                .map_err(|e| e.in_chunk(chunk_index, Phase::Write))?;

            stats.absorb(&chunk_stats);
            progress.set_position(reader.bytes_read());
            progress.set_message(format!(
                "chunk {} | {} rows kept",
                chunk_index, stats.rows_out
            ));

            if check_memory_pressure(&mut self.system_monitor) {
                warn!(
                    "Memory usage above {:.0}% after chunk {}; consider a smaller --chunk-size",
                    MEMORY_PRESSURE_THRESHOLD * 100.0,
                    chunk_index
                );
            }

            chunk_index += 1;
        }

        progress.finish_with_message(format!("{} chunks", chunk_index));
        Ok(())
    }

    fn progress_bar(&self, total_bytes: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total_bytes);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("Processing chunks".bright_yellow().to_string());
        pb
    }
}

/// Check if the system is under memory pressure
fn check_memory_pressure(system: &mut System) -> bool {
    system.refresh_memory();

    let used_memory = system.used_memory() as f64;
    let total_memory = system.total_memory() as f64;

    if total_memory == 0.0 {
        return false;
    }

    let memory_usage = used_memory / total_memory;
    if memory_usage > MEMORY_PRESSURE_THRESHOLD {
        debug!(
            "Memory pressure detected: {:.1}% usage (threshold: {:.1}%)",
            memory_usage * 100.0,
            MEMORY_PRESSURE_THRESHOLD * 100.0
        );
        true
    } else {
        false
    }
}
