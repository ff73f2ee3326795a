//! Output must not depend on how the input is split into chunks

use super::{accident_row, test_config, write_dataset};
use crate::processor::DatasetProcessor;
use std::fs;
use tempfile::TempDir;

fn mixed_rows() -> Vec<String> {
    let long_street = "x".repeat(75);
    vec![
        accident_row(&[("ID", "A-1")]),
        accident_row(&[("ID", "A-2"), ("Start_Time", "2016-02-08 05:46:00")]),
        accident_row(&[("ID", "A-3"), ("Street", long_street.as_str())]),
        accident_row(&[
            ("ID", "A-4"),
            ("Start_Time", "2021-06-05 14:30:00"),
            ("End_Time", "2021-06-05 15:00:00"),
        ]),
        accident_row(&[("ID", "A-5"), ("Severity", "0")]),
        accident_row(&[
            ("ID", "A-6"),
            ("Wind_Chill(F)", "30.5"),
            ("Pressure(in)", "N/A"),
        ]),
        accident_row(&[("ID", "A-7"), ("Start_Time", "garbage")]),
        accident_row(&[("ID", "A-8"), ("City", "")]),
        accident_row(&[("ID", "A-9"), ("Start_Time", "2018-01-01 00:00:00")]),
    ]
}

fn run_with_chunk_size(temp_dir: &TempDir, chunk_size: usize) -> (Vec<u8>, usize) {
    let input = temp_dir.path().join("US_Accidents.csv");
    let output = temp_dir.path().join(format!("cleaned-{}.csv", chunk_size));
    let config = test_config(&input, temp_dir)
        .with_output_path(&output)
        .with_chunk_size(chunk_size);

    let mut processor = DatasetProcessor::new(config).unwrap();
    let stats = processor.process().unwrap();
    assert_eq!(
        stats.rows_out,
        stats.rows_in - stats.rows_dropped_by_date - stats.rows_dropped_by_quality
    );
    assert_eq!(stats.quality.total(), stats.rows_dropped_by_quality);

    (fs::read(&output).unwrap(), stats.chunks_processed)
}

#[test]
fn test_chunk_size_does_not_change_output() {
    let temp_dir = TempDir::new().unwrap();
    write_dataset(&temp_dir, &mixed_rows());

    let (whole, chunks) = run_with_chunk_size(&temp_dir, 1000);
    assert_eq!(chunks, 1);

    for chunk_size in [1, 2, 3, 4] {
        let (split, chunks) = run_with_chunk_size(&temp_dir, chunk_size);
        assert_eq!(chunks, mixed_rows().len().div_ceil(chunk_size));
        assert_eq!(split, whole, "chunk size {} changed the output", chunk_size);
    }
}

#[test]
fn test_rerun_is_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    write_dataset(&temp_dir, &mixed_rows());

    let (first, _) = run_with_chunk_size(&temp_dir, 3);
    let (second, _) = run_with_chunk_size(&temp_dir, 3);
    assert_eq!(first, second);
}

#[test]
fn test_row_order_is_preserved() {
    let temp_dir = TempDir::new().unwrap();
    write_dataset(&temp_dir, &mixed_rows());

    let input = temp_dir.path().join("US_Accidents.csv");
    let config = test_config(&input, &temp_dir)
        .with_delete_columns(["Description"])
        .with_chunk_size(2);
    let mut processor = DatasetProcessor::new(config).unwrap();
    processor.process().unwrap();

    let (header, rows) = super::read_output(processor.output_path());
    let ids: Vec<&str> = rows
        .iter()
        .map(|row| super::field(&header, row, "ID"))
        .collect();
    assert_eq!(ids, vec!["A-1", "A-4", "A-6", "A-8", "A-9"]);
}

#[test]
fn test_single_bad_value_is_not_fatal_at_any_chunk_size() {
    let temp_dir = TempDir::new().unwrap();
    write_dataset(
        &temp_dir,
        &[
            accident_row(&[("ID", "A-1"), ("Pressure(in)", "N/A")]),
            accident_row(&[("ID", "A-2"), ("Pressure(in)", "")]),
            accident_row(&[("ID", "A-3")]),
        ],
    );

    let (single, chunks) = run_with_chunk_size(&temp_dir, 1);
    assert_eq!(chunks, 3);
    let (pairs, _) = run_with_chunk_size(&temp_dir, 2);
    let (whole, _) = run_with_chunk_size(&temp_dir, 3);

    assert_eq!(single, pairs);
    assert_eq!(single, whole);
}
