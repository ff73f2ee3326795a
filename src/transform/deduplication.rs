//! Near-duplicate detection for accident records
//!
//! Two reports of the same accident usually differ only in source and in
//! the last digits of their coordinates. Rows are keyed on location rounded
//! to four decimal places and the start time truncated to the minute; the
//! first row for a key is kept.

use crate::constants::DEDUP_COORDINATE_SCALE;
use chrono::{NaiveDateTime, Timelike};
use std::collections::HashSet;

/// Identity of an accident for duplicate detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    latitude: Option<i64>,
    longitude: Option<i64>,
    minute: Option<NaiveDateTime>,
}

impl DuplicateKey {
    pub fn new(latitude: Option<&str>, longitude: Option<&str>, start: NaiveDateTime) -> Self {
        Self {
            latitude: latitude.and_then(scaled_coordinate),
            longitude: longitude.and_then(scaled_coordinate),
            minute: start.with_second(0).and_then(|ts| ts.with_nanosecond(0)),
        }
    }
}

fn scaled_coordinate(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| (value * DEDUP_COORDINATE_SCALE).round() as i64)
}

/// Remembers keys seen within one chunk
#[derive(Debug, Default)]
pub struct DuplicateTracker {
    seen: HashSet<DuplicateKey>,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the key, returning true if it was already seen
    pub fn is_duplicate(&mut self, key: DuplicateKey) -> bool {
        !self.seen.insert(key)
    }
}
