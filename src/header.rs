//! Source header reading for the raw accident export.
//!
//! The header row is read once before any chunk so that configuration
//! errors are raised before data is touched.

use crate::error::{ProcessorError, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::Path;
use tracing::debug;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Column names from a header record, without BOM or surrounding whitespace
pub fn clean_header(record: &StringRecord) -> Vec<String> {
    record
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let name = if index == 0 {
                name.trim_start_matches(BYTE_ORDER_MARK)
            } else {
                name
            };
            name.trim().to_string()
        })
        .collect()
}

/// Read only the header row of a CSV file
pub fn read_source_header(file_path: &Path) -> Result<Vec<String>> {
    let file = File::open(file_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ProcessorError::InputNotFound {
            path: file_path.to_path_buf(),
        },
        _ => ProcessorError::Io(e),
    })?;

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let header = clean_header(reader.headers()?);

    if header.iter().all(String::is_empty) {
        return Err(ProcessorError::MalformedHeader {
            path: file_path.to_path_buf(),
            reason: "file has no header row".to_string(),
        });
    }

    debug!(
        "Read {} header columns from {}",
        header.len(),
        file_path.display()
    );
    Ok(header)
}
