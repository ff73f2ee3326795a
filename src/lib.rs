//! Accident Processor Library
//!
//! Turns the raw US traffic-accident CSV export into a schema-conformant,
//! type-narrowed CSV ready for bulk load into a relational star schema.
//!
//! This library provides tools for:
//! - Describing source, derived and target columns in one schema catalog
//! - Reading multi-gigabyte exports in bounded row chunks
//! - Deriving time features and durations from raw timestamps
//! - Filtering rows by date cutoff and data quality
//! - Narrowing values to warehouse types with deterministic defaults
//! - Writing the cleaned output and a before/after report

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod header;
pub mod models;
pub mod processor;
pub mod schema;
pub mod transform;

// Re-export commonly used types
pub use config::{PipelineConfig, TimeFeatureSet};
pub use error::{ProcessorError, Result};
pub use processor::DatasetProcessor;
pub use schema::SchemaCatalog;
pub use transform::{ChunkStats, RunStats};
