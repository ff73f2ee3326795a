//! Append-only CSV output for processed chunks
//!
//! The output file is truncated when the writer is created. The first chunk
//! writes the header; every later chunk must carry exactly the same columns
//! and appends rows only.

use crate::error::{ProcessorError, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sequential CSV sink shared by all chunks of a run
#[derive(Debug)]
pub struct ChunkWriter {
    output_path: PathBuf,
    sink: BufWriter<File>,
    header: Option<Vec<String>>,
    chunks_written: usize,
    rows_written: usize,
}

impl ChunkWriter {
    /// Create (or truncate) the output file
    pub fn create(output_path: &Path) -> Result<Self> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(output_path)?;
        debug!("Opened output file {}", output_path.display());

        Ok(Self {
            output_path: output_path.to_path_buf(),
            sink: BufWriter::new(file),
            header: None,
            chunks_written: 0,
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }

    /// Append one processed chunk
    pub fn write_chunk(&mut self, df: &mut DataFrame) -> Result<()> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let include_header = match &self.header {
            None => {
                self.header = Some(names);
                true
            }
            Some(expected) if *expected == names => false,
            Some(expected) => {
                let missing = expected
                    .iter()
                    .filter(|name| !names.contains(name))
                    .cloned()
                    .collect();
                return Err(ProcessorError::SchemaMismatch { missing });
            }
        };

        CsvWriter::new(&mut self.sink)
            .include_header(include_header)
            .finish(df)?;

        self.chunks_written += 1;
        self.rows_written += df.height();
        Ok(())
    }

    /// Write just the header when no chunk produced output
    pub fn write_header_only(&mut self, names: &[String]) -> Result<()> {
        if self.header.is_some() {
            return Ok(());
        }

        let mut writer = csv::Writer::from_writer(&mut self.sink);
        writer.write_record(names)?;
        writer.flush()?;
        drop(writer);

        self.header = Some(names.to_vec());
        Ok(())
    }

    /// Flush and return the size of the finished file in bytes
    pub fn finish(mut self) -> Result<u64> {
        self.sink.flush()?;
        let bytes = fs::metadata(&self.output_path)?.len();
        debug!(
            "Wrote {} rows in {} chunks to {} ({} bytes)",
            self.rows_written,
            self.chunks_written,
            self.output_path.display(),
            bytes
        );
        Ok(bytes)
    }
}
