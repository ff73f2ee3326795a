//! Per-chunk transforms applied by the chunk processor
//!
//! Each submodule owns one concern and works on a polars `DataFrame`
//! holding a single chunk.

pub mod coercion;
pub mod deduplication;
pub mod features;
pub mod filter;
pub mod stats;

pub use coercion::TypeCoercer;
pub use deduplication::{DuplicateKey, DuplicateTracker};
pub use features::{DerivedFeatures, FeatureDeriver, parse_timestamp};
pub use filter::{QualityDefect, RowFilter, Verdict};
pub use stats::{ChunkStats, QualityBreakdown, RunStats};
