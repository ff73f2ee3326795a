//! Row statistics for chunk processing and the whole run
//!
//! `ChunkStats` is produced by every chunk call and handed back to the
//! driver, which folds it into the single `RunStats` accumulator.

use std::collections::BTreeMap;
use std::time::Duration;

/// Rows dropped as quality defects, by cause
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityBreakdown {
    pub unparseable_timestamp: usize,
    pub negative_duration: usize,
    pub oversized_string: usize,
    pub invalid_severity: usize,
    pub duplicates: usize,
}

impl QualityBreakdown {
    pub fn total(&self) -> usize {
        self.unparseable_timestamp
            + self.negative_duration
            + self.oversized_string
            + self.invalid_severity
            + self.duplicates
    }

    pub fn merge(&mut self, other: &QualityBreakdown) {
        self.unparseable_timestamp += other.unparseable_timestamp;
        self.negative_duration += other.negative_duration;
        self.oversized_string += other.oversized_string;
        self.invalid_severity += other.invalid_severity;
        self.duplicates += other.duplicates;
    }

    /// Labelled counts in a stable order for reporting
    pub fn entries(&self) -> [(&'static str, usize); 5] {
        [
            ("unparseable_timestamp", self.unparseable_timestamp),
            ("negative_duration", self.negative_duration),
            ("oversized_string", self.oversized_string),
            ("invalid_severity", self.invalid_severity),
            ("duplicates", self.duplicates),
        ]
    }
}

/// Statistics for a single processed chunk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkStats {
    /// Zero-based position of the chunk in the input
    pub chunk_index: usize,
    pub rows_in: usize,
    pub rows_dropped_by_date: usize,
    pub rows_dropped_by_quality: usize,
    pub rows_out: usize,
    pub quality: QualityBreakdown,
    /// Values that failed coercion, per target column
    pub coercion_warnings: BTreeMap<String, usize>,
    /// Nulls replaced by a column default, per target column
    pub defaults_filled: BTreeMap<String, usize>,
    pub columns_dropped: usize,
    pub columns_derived: usize,
    /// Chunk columns with no place in the output schema
    pub unmapped_columns: Vec<String>,
}

impl ChunkStats {
    pub fn new(chunk_index: usize, rows_in: usize) -> Self {
        Self {
            chunk_index,
            rows_in,
            ..Default::default()
        }
    }

    /// rows_out = rows_in - dropped by date - dropped by quality
    pub fn is_consistent(&self) -> bool {
        self.rows_dropped_by_date + self.rows_dropped_by_quality + self.rows_out == self.rows_in
            && self.quality.total() == self.rows_dropped_by_quality
    }

    pub fn add_coercion_warnings(&mut self, column: &str, count: usize) {
        if count > 0 {
            *self.coercion_warnings.entry(column.to_string()).or_default() += count;
        }
    }

    pub fn add_defaults_filled(&mut self, column: &str, count: usize) {
        if count > 0 {
            *self.defaults_filled.entry(column.to_string()).or_default() += count;
        }
    }
}

/// Totals for a complete run, owned and mutated only by the driver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub chunks_processed: usize,
    pub rows_in: usize,
    pub rows_dropped_by_date: usize,
    pub rows_dropped_by_quality: usize,
    pub rows_out: usize,
    pub quality: QualityBreakdown,
    pub coercion_warnings: BTreeMap<String, usize>,
    pub defaults_filled: BTreeMap<String, usize>,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub input_columns: usize,
    pub output_columns: usize,
    pub columns_deleted: Vec<String>,
    pub columns_consumed: Vec<String>,
    pub columns_added: Vec<String>,
    pub unmapped_columns: Vec<String>,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk's statistics into the run totals
    pub fn absorb(&mut self, chunk: &ChunkStats) {
        self.chunks_processed += 1;
        self.rows_in += chunk.rows_in;
        self.rows_dropped_by_date += chunk.rows_dropped_by_date;
        self.rows_dropped_by_quality += chunk.rows_dropped_by_quality;
        self.rows_out += chunk.rows_out;
        self.quality.merge(&chunk.quality);

        for (column, count) in &chunk.coercion_warnings {
            *self.coercion_warnings.entry(column.clone()).or_default() += count;
        }
        for (column, count) in &chunk.defaults_filled {
            *self.defaults_filled.entry(column.clone()).or_default() += count;
        }
        for column in &chunk.unmapped_columns {
            if !self.unmapped_columns.contains(column) {
                self.unmapped_columns.push(column.clone());
            }
        }
    }

    pub fn rows_dropped(&self) -> usize {
        self.rows_dropped_by_date + self.rows_dropped_by_quality
    }

    /// Percentage of input rows removed
    pub fn row_reduction(&self) -> f64 {
        reduction(self.rows_in as f64, self.rows_out as f64)
    }

    /// Percentage of input bytes saved in the output file
    pub fn size_reduction(&self) -> f64 {
        reduction(self.input_bytes as f64, self.output_bytes as f64)
    }

    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.rows_in as f64 / seconds
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} -> {} rows in {} chunks ({} by date, {} by quality) | {:.1}% smaller | {:.1}s",
            self.rows_in,
            self.rows_out,
            self.chunks_processed,
            self.rows_dropped_by_date,
            self.rows_dropped_by_quality,
            self.size_reduction(),
            self.elapsed.as_secs_f64()
        )
    }
}

fn reduction(before: f64, after: f64) -> f64 {
    if before <= 0.0 {
        0.0
    } else {
        (1.0 - after / before) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, rows_in: usize, by_date: usize, oversized: usize) -> ChunkStats {
        let mut stats = ChunkStats::new(index, rows_in);
        stats.rows_dropped_by_date = by_date;
        stats.quality.oversized_string = oversized;
        stats.rows_dropped_by_quality = oversized;
        stats.rows_out = rows_in - by_date - oversized;
        stats
    }

    #[test]
    fn test_chunk_consistency() {
        let stats = chunk(0, 10, 3, 2);
        assert!(stats.is_consistent());

        let mut broken = stats.clone();
        broken.rows_out += 1;
        assert!(!broken.is_consistent());

        let mut unexplained = stats;
        unexplained.quality.oversized_string = 0;
        assert!(!unexplained.is_consistent());
    }

    #[test]
    fn test_run_absorbs_chunks() {
        let mut first = chunk(0, 10, 3, 2);
        first.add_coercion_warnings("HUMIDITY", 2);
        first.add_coercion_warnings("PRESSURE", 0);
        let mut second = chunk(1, 5, 0, 1);
        second.add_coercion_warnings("HUMIDITY", 1);

        let mut run = RunStats::new();
        run.absorb(&first);
        run.absorb(&second);

        assert_eq!(run.chunks_processed, 2);
        assert_eq!(run.rows_in, 15);
        assert_eq!(run.rows_out, 9);
        assert_eq!(run.rows_dropped(), 6);
        assert_eq!(run.quality.oversized_string, 3);
        assert_eq!(run.coercion_warnings.get("HUMIDITY"), Some(&3));
        assert!(!run.coercion_warnings.contains_key("PRESSURE"));
    }

    #[test]
    fn test_reductions() {
        let run = RunStats {
            rows_in: 200,
            rows_out: 150,
            input_bytes: 1000,
            output_bytes: 400,
            ..Default::default()
        };
        assert!((run.row_reduction() - 25.0).abs() < 1e-9);
        assert!((run.size_reduction() - 60.0).abs() < 1e-9);
        assert_eq!(RunStats::new().row_reduction(), 0.0);
    }
}
