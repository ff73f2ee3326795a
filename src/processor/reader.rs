//! Chunked CSV reading for the raw accident export
//!
//! The source is read sequentially with the `csv` crate and materialised one
//! chunk at a time as a `DataFrame` of text columns. Only the current chunk
//! is ever held in memory.

use crate::error::Result;
use crate::header::clean_header;
use csv::{Reader, ReaderBuilder, StringRecord};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Finite, forward-only sequence of row chunks over one CSV file
#[derive(Debug)]
pub struct ChunkReader {
    reader: Reader<File>,
    header: Vec<String>,
    chunk_size: usize,
    record: StringRecord,
    chunks_read: usize,
    rows_read: usize,
    exhausted: bool,
}

impl ChunkReader {
    /// Open the file and consume its header row
    pub fn open(file_path: &Path, chunk_size: usize) -> Result<Self> {
        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let header = clean_header(reader.headers()?);

        Ok(Self {
            reader,
            header,
            chunk_size: chunk_size.max(1),
            record: StringRecord::new(),
            chunks_read: 0,
            rows_read: 0,
            exhausted: false,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Bytes of the source consumed so far
    pub fn bytes_read(&self) -> u64 {
        self.reader.position().byte()
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Read up to `chunk_size` rows; `None` once the file is exhausted
    ///
    /// Empty fields become nulls. A record whose field count differs from
    /// the header is an error.
    pub fn next_chunk(&mut self) -> Result<Option<DataFrame>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut columns: Vec<Vec<Option<String>>> = self
            .header
            .iter()
            .map(|_| Vec::with_capacity(self.chunk_size.min(1 << 16)))
            .collect();
        let mut rows = 0;

        while rows < self.chunk_size {
            if !self.reader.read_record(&mut self.record)? {
                self.exhausted = true;
                break;
            }
            for (values, field) in columns.iter_mut().zip(self.record.iter()) {
                values.push((!field.is_empty()).then(|| field.to_string()));
            }
            rows += 1;
        }

        if rows == 0 {
            return Ok(None);
        }

        let frame = DataFrame::new(
            self.header
                .iter()
                .zip(columns)
                .map(|(name, values)| Column::from(Series::new(name.as_str().into(), values)))
                .collect(),
        )?;

        self.chunks_read += 1;
        self.rows_read += rows;
        debug!(
            "Read chunk {} with {} rows ({} bytes consumed)",
            self.chunks_read - 1,
            rows,
            self.bytes_read()
        );

        Ok(Some(frame))
    }
}

impl Iterator for ChunkReader {
    type Item = Result<DataFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}
