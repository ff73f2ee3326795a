//! Error handling for accident dataset processing.
//!
//! Only configuration, schema, coercion and I/O failures are fatal. Bad
//! individual values and rows that fail the quality rules are absorbed into
//! chunk statistics and never surface here.

use crate::models::Phase;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input file not found at path: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Malformed header in file: {path} - {reason}")]
    MalformedHeader { path: PathBuf, reason: String },

    #[error("Schema mismatch: target columns missing after processing: {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    #[error(
        "Coercion failed for column {column}: {invalid} of {checked} values invalid (limit {limit:.1}%)"
    )]
    CoercionFailed {
        column: String,
        invalid: usize,
        checked: usize,
        limit: f64,
    },

    #[error("Chunk {chunk} failed during {phase}: {source}")]
    ChunkFailed {
        chunk: usize,
        phase: Phase,
        #[source]
        source: Box<ProcessorError>,
    },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl ProcessorError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Attach the chunk index and pipeline phase to a fatal error
    pub fn in_chunk(self, chunk: usize, phase: Phase) -> Self {
        match self {
            already @ Self::ChunkFailed { .. } => already,
            other => Self::ChunkFailed {
                chunk,
                phase,
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
