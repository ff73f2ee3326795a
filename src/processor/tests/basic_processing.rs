//! Basic processing integration tests

use super::{accident_row, field, read_output, test_config, write_dataset};
use crate::config::TimeFeatureSet;
use crate::processor::DatasetProcessor;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_basic_processing_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_dataset(
        &temp_dir,
        &[
            accident_row(&[]),
            accident_row(&[("ID", "A-2"), ("Start_Time", "2017-12-31 23:59:00")]),
            accident_row(&[("ID", "A-3"), ("Start_Time", "2021-06-05 14:30:00"), ("End_Time", "2021-06-05 15:00:00")]),
        ],
    );

    let mut processor = DatasetProcessor::new(test_config(&input, &temp_dir)).unwrap();
    let expected_header = processor.catalog().target_order().to_vec();
    let stats = processor.process().unwrap();

    assert_eq!(stats.rows_in, 3);
    assert_eq!(stats.rows_dropped_by_date, 1);
    assert_eq!(stats.rows_dropped_by_quality, 0);
    assert_eq!(stats.rows_out, 2);
    assert_eq!(stats.chunks_processed, 1);
    assert!(stats.output_bytes > 0);

    let (header, rows) = read_output(processor.output_path());
    assert_eq!(header, expected_header);
    assert_eq!(rows.len(), 2);

    let first = &rows[0];
    assert_eq!(field(&header, first, "SEVERITY"), "2");
    assert_eq!(field(&header, first, "DURATION"), "330");
    assert_eq!(field(&header, first, "YEAR"), "2019");
    assert_eq!(field(&header, first, "QUARTER"), "1");
    assert_eq!(field(&header, first, "IS_WEEKEND"), "0");
    assert_eq!(field(&header, first, "TRAFFIC_SIGNAL"), "1");
    assert_eq!(field(&header, first, "AMENITY"), "0");
    assert_eq!(field(&header, first, "CITY"), "Dayton");
    assert_eq!(field(&header, first, "WIND_CHILL"), "");
    let latitude: f64 = field(&header, first, "LATITUDE").parse().unwrap();
    assert!((latitude - 39.865147).abs() < 1e-9);

    let saturday = &rows[1];
    assert_eq!(field(&header, saturday, "IS_WEEKEND"), "1");
    assert_eq!(field(&header, saturday, "DAY"), "5");
    assert_eq!(field(&header, saturday, "HOUR"), "14");
    assert_eq!(field(&header, saturday, "DURATION"), "1800");

    assert!(processor.report_path().exists());
    let report = fs::read_to_string(processor.report_path()).unwrap();
    assert!(report.contains("dropped by date cutoff: 1"));
}

#[test]
fn test_missing_text_becomes_unknown() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_dataset(
        &temp_dir,
        &[accident_row(&[("City", ""), ("Weather_Condition", "   "), ("Zipcode", " 45424 ")])],
    );

    let mut processor = DatasetProcessor::new(test_config(&input, &temp_dir)).unwrap();
    let stats = processor.process().unwrap();

    let (header, rows) = read_output(processor.output_path());
    assert_eq!(field(&header, &rows[0], "CITY"), "Unknown");
    assert_eq!(field(&header, &rows[0], "WEATHER_CONDITION"), "Unknown");
    assert_eq!(field(&header, &rows[0], "ZIPCODE"), "45424");
    assert_eq!(stats.defaults_filled.get("CITY"), Some(&1));
}

#[test]
fn test_out_of_range_values_are_defaulted_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_dataset(
        &temp_dir,
        &[
            accident_row(&[("Distance(mi)", "123456.7"), ("Bump", "maybe")]),
            accident_row(&[("ID", "A-2")]),
        ],
    );

    let mut processor = DatasetProcessor::new(test_config(&input, &temp_dir)).unwrap();
    let stats = processor.process().unwrap();

    assert_eq!(stats.rows_out, 2);
    assert_eq!(stats.coercion_warnings.get("DISTANCE"), Some(&1));
    assert_eq!(stats.coercion_warnings.get("BUMP"), Some(&1));

    let (header, rows) = read_output(processor.output_path());
    let distance: f64 = field(&header, &rows[0], "DISTANCE").parse().unwrap();
    assert_eq!(distance, 0.0);
    assert_eq!(field(&header, &rows[0], "BUMP"), "0");
}

#[test]
fn test_extended_time_features_and_kept_auxiliary_columns() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_dataset(
        &temp_dir,
        &[accident_row(&[("Start_Time", "2019-03-01 08:07:09")])],
    );

    let config = test_config(&input, &temp_dir)
        .with_time_features(TimeFeatureSet::Extended)
        .with_delete_columns(["ID"]);
    let mut processor = DatasetProcessor::new(config).unwrap();
    processor.process().unwrap();

    let (header, rows) = read_output(processor.output_path());
    assert_eq!(field(&header, &rows[0], "MINUTE"), "7");
    assert_eq!(field(&header, &rows[0], "SECOND"), "9");
    assert!(header.iter().any(|c| c == "DESCRIPTION"));
    assert!(header.iter().any(|c| c == "WEATHER_TIMESTAMP"));
    assert!(!header.iter().any(|c| c == "ID"));
}

#[test]
fn test_header_only_input_writes_header_only_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_dataset(&temp_dir, &[]);

    let mut processor = DatasetProcessor::new(test_config(&input, &temp_dir)).unwrap();
    let expected_header = processor.catalog().target_order().to_vec();
    let stats = processor.process().unwrap();

    assert_eq!(stats.chunks_processed, 0);
    assert_eq!(stats.rows_out, 0);

    let (header, rows) = read_output(processor.output_path());
    assert_eq!(header, expected_header);
    assert!(rows.is_empty());
}

#[test]
fn test_all_rows_filtered_still_writes_header() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_dataset(
        &temp_dir,
        &[accident_row(&[("Start_Time", "2016-01-01 00:00:00")])],
    );

    let mut processor = DatasetProcessor::new(test_config(&input, &temp_dir)).unwrap();
    let expected_header = processor.catalog().target_order().to_vec();
    let stats = processor.process().unwrap();

    assert_eq!(stats.chunks_processed, 1);
    assert_eq!(stats.rows_out, 0);
    let (header, rows) = read_output(processor.output_path());
    assert_eq!(header, expected_header);
    assert!(rows.is_empty());
}
