//! Integration tests for the processor module
//!
//! Runs the complete pipeline over small accident exports written to
//! temporary directories.

pub mod basic_processing;
pub mod chunk_invariance;

use crate::config::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Column order of the raw accident export
pub const SOURCE_HEADER: &[&str] = &[
    "ID",
    "Source",
    "Severity",
    "Start_Time",
    "End_Time",
    "Start_Lat",
    "Start_Lng",
    "End_Lat",
    "End_Lng",
    "Distance(mi)",
    "Description",
    "Street",
    "City",
    "County",
    "State",
    "Zipcode",
    "Country",
    "Timezone",
    "Airport_Code",
    "Weather_Timestamp",
    "Temperature(F)",
    "Wind_Chill(F)",
    "Humidity(%)",
    "Pressure(in)",
    "Visibility(mi)",
    "Wind_Direction",
    "Wind_Speed(mph)",
    "Precipitation(in)",
    "Weather_Condition",
    "Amenity",
    "Bump",
    "Crossing",
    "Give_Way",
    "Junction",
    "No_Exit",
    "Railway",
    "Roundabout",
    "Station",
    "Stop",
    "Traffic_Calming",
    "Traffic_Signal",
    "Turning_Loop",
    "Sunrise_Sunset",
    "Civil_Twilight",
    "Nautical_Twilight",
    "Astronomical_Twilight",
];

fn default_value(column: &str) -> &'static str {
    match column {
        "ID" => "A-1",
        "Source" => "Source2",
        "Severity" => "2",
        "Start_Time" => "2019-03-01 08:00:00",
        "End_Time" => "2019-03-01 08:05:30",
        "Start_Lat" => "39.865147",
        "Start_Lng" => "-84.058723",
        "Distance(mi)" => "0.01",
        "Description" => "Right lane blocked due to accident on I-70 Eastbound",
        "Street" => "I-70 E",
        "City" => "Dayton",
        "County" => "Montgomery",
        "State" => "OH",
        "Zipcode" => "45424",
        "Country" => "US",
        "Timezone" => "US/Eastern",
        "Airport_Code" => "KFFO",
        "Weather_Timestamp" => "2019-03-01 07:56:00",
        "Temperature(F)" => "36.9",
        "Humidity(%)" => "91.0",
        "Pressure(in)" => "29.68",
        "Visibility(mi)" => "10.0",
        "Wind_Direction" => "Calm",
        "Precipitation(in)" => "0.02",
        "Weather_Condition" => "Light Rain",
        "Traffic_Signal" => "True",
        "Sunrise_Sunset" | "Civil_Twilight" | "Nautical_Twilight" | "Astronomical_Twilight" => {
            "Day"
        }
        "Amenity" | "Bump" | "Crossing" | "Give_Way" | "Junction" | "No_Exit" | "Railway"
        | "Roundabout" | "Station" | "Stop" | "Traffic_Calming" | "Turning_Loop" => "False",
        _ => "",
    }
}

fn quote(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One CSV record with realistic defaults and the given overrides
pub fn accident_row(overrides: &[(&str, &str)]) -> String {
    SOURCE_HEADER
        .iter()
        .map(|column| {
            let value = overrides
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, value)| *value)
                .unwrap_or_else(|| default_value(column));
            quote(value)
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Write an export with the full header and the given records
pub fn write_dataset(temp_dir: &TempDir, rows: &[String]) -> PathBuf {
    let path = temp_dir.path().join("US_Accidents.csv");
    let mut content = SOURCE_HEADER.join(",");
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

/// Default configuration with quiet output paths inside the temp dir
pub fn test_config(input: &Path, temp_dir: &TempDir) -> PipelineConfig {
    PipelineConfig::new(input)
        .with_output_path(temp_dir.path().join("out").join("cleaned.csv"))
        .with_report_path(temp_dir.path().join("out").join("report.txt"))
        .without_progress()
}

/// Output records keyed by header name
pub fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

/// Value of `column` in an output row
pub fn field<'a>(header: &[String], row: &'a [String], column: &str) -> &'a str {
    let index = header
        .iter()
        .position(|name| name == column)
        .unwrap_or_else(|| panic!("column {column} not in output"));
    &row[index]
}
