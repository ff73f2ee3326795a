//! Before/after report for a completed run
//!
//! The same text is written to the report file and echoed to stdout; a
//! shorter coloured summary is printed for interactive use.

use crate::config::PipelineConfig;
use crate::constants::SQL_TABLE_NAME;
use crate::error::Result;
use crate::schema::SchemaCatalog;
use crate::transform::RunStats;
use colored::*;
use std::fmt;
use std::fs;
use std::path::Path;

const RULE: &str = "============================================================";

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

/// Render the plain-text run report
pub fn render_report(stats: &RunStats, config: &PipelineConfig, catalog: &SchemaCatalog) -> String {
    RunReport {
        stats,
        config,
        catalog,
    }
    .to_string()
}

/// Report sections over one finished run
struct RunReport<'a> {
    stats: &'a RunStats,
    config: &'a PipelineConfig,
    catalog: &'a SchemaCatalog,
}

impl fmt::Display for RunReport<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let RunReport {
            stats,
            config,
            catalog,
        } = self;
        let output_path = config.resolved_output_path();

        writeln!(out, "{}", RULE)?;
        writeln!(out, "ACCIDENT DATASET PROCESSING REPORT")?;
        writeln!(out, "{}", RULE)?;
        writeln!(out, "Input file:  {}", config.input_path.display())?;
        writeln!(out, "Output file: {}", output_path.display())?;
        writeln!(out)?;

        writeln!(out, "File size")?;
        writeln!(
            out,
            "  before: {:>14} bytes ({:.2} MB)",
            stats.input_bytes,
            megabytes(stats.input_bytes)
        )?;
        writeln!(
            out,
            "  after:  {:>14} bytes ({:.2} MB)",
            stats.output_bytes,
            megabytes(stats.output_bytes)
        )?;
        writeln!(out, "  reduction: {:.2}%", stats.size_reduction())?;
        writeln!(out)?;

        writeln!(out, "Rows")?;
        writeln!(out, "  before: {}", stats.rows_in)?;
        writeln!(out, "  after:  {}", stats.rows_out)?;
        writeln!(out, "  reduction: {:.2}%", stats.row_reduction())?;
        writeln!(out, "  dropped by date cutoff: {}", stats.rows_dropped_by_date)?;
        writeln!(out, "  dropped by quality:     {}", stats.rows_dropped_by_quality)?;
        for (reason, count) in stats.quality.entries() {
            writeln!(out, "    {:<22} {}", reason, count)?;
        }
        writeln!(out)?;

        writeln!(out, "Columns")?;
        writeln!(
            out,
            "  before: {}  after: {}",
            stats.input_columns, stats.output_columns
        )?;
        writeln!(out, "  deleted:  {}", list_or_none(&stats.columns_deleted))?;
        writeln!(out, "  consumed: {}", list_or_none(&stats.columns_consumed))?;
        writeln!(out, "  added:    {}", list_or_none(&stats.columns_added))?;
        if !stats.unmapped_columns.is_empty() {
            writeln!(
                out,
                "  discarded (not in target schema): {}",
                stats.unmapped_columns.join(", ")
            )?;
        }
        writeln!(out)?;

        if !stats.coercion_warnings.is_empty() {
            writeln!(out, "Coercion warnings")?;
            for (column, count) in &stats.coercion_warnings {
                writeln!(out, "  {:<22} {}", column, count)?;
            }
            writeln!(out)?;
        }

        if !stats.defaults_filled.is_empty() {
            writeln!(out, "Defaults filled")?;
            for (column, count) in &stats.defaults_filled {
                writeln!(out, "  {:<22} {}", column, count)?;
            }
            writeln!(out)?;
        }

        write_type_conversion(out, catalog)?;

        writeln!(out, "Configuration")?;
        writeln!(out, "  chunk size:        {}", config.chunk_size)?;
        writeln!(out, "  date cutoff:       {}", config.date_cutoff)?;
        writeln!(out, "  max string length: {}", config.max_string_length)?;
        writeln!(out, "  time features:     {:?}", config.time_features)?;
        writeln!(out, "  severity check:    {}", config.validate_severity)?;
        writeln!(out, "  deduplicate:       {}", config.deduplicate)?;
        writeln!(out)?;

        writeln!(out, "Chunks processed: {}", stats.chunks_processed)?;
        writeln!(
            out,
            "Elapsed: {:.2}s ({:.0} rows/s)",
            stats.elapsed.as_secs_f64(),
            stats.throughput()
        )?;
        writeln!(out, "{}", RULE)?;

        Ok(())
    }
}

/// Column types as loaded into SQL Server, plus the matching CREATE TABLE
fn write_type_conversion(out: &mut fmt::Formatter<'_>, catalog: &SchemaCatalog) -> fmt::Result {
    let columns: Vec<_> = catalog
        .target_order()
        .iter()
        .filter_map(|name| catalog.descriptor(name))
        .collect();

    writeln!(out, "Type conversion")?;
    writeln!(
        out,
        "  {:<22} {:<12} {:<16} {}",
        "column", "dimension", "sql type", "nulls"
    )?;
    for column in &columns {
        writeln!(
            out,
            "  {:<22} {:<12} {:<16} {}",
            column.target_name,
            format!("{:?}", column.dimension),
            column.semantic_type.sql_type(),
            null_constraint(column.nullable)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "CREATE TABLE {} (", SQL_TABLE_NAME)?;
    for (index, column) in columns.iter().enumerate() {
        let separator = if index + 1 < columns.len() { "," } else { "" };
        writeln!(
            out,
            "    [{}] {} {}{}",
            column.target_name,
            column.semantic_type.sql_type(),
            null_constraint(column.nullable),
            separator
        )?;
    }
    writeln!(out, ");")?;
    writeln!(out)
}

fn null_constraint(nullable: bool) -> &'static str {
    if nullable { "NULL" } else { "NOT NULL" }
}

/// Write the report text to its file
pub fn write_report(path: &Path, report: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, report)?;
    Ok(())
}

/// Short coloured summary for the terminal
pub fn print_summary(stats: &RunStats, output_path: &Path, report_path: &Path) {
    println!("\n{}", "Processing complete".bright_green().bold());
    println!(
        "  {} {} -> {}",
        "Rows:".bright_cyan(),
        stats.rows_in.to_string().bright_white(),
        stats.rows_out.to_string().bright_white().bold()
    );
    println!(
        "  {} {} by date, {} by quality",
        "Dropped:".bright_cyan(),
        stats.rows_dropped_by_date.to_string().yellow(),
        stats.rows_dropped_by_quality.to_string().yellow()
    );
    println!(
        "  {} {:.1} MB -> {:.1} MB ({:.1}% smaller)",
        "Size:".bright_cyan(),
        megabytes(stats.input_bytes),
        megabytes(stats.output_bytes),
        stats.size_reduction()
    );
    println!(
        "  {} {}",
        "Output:".bright_cyan(),
        output_path.display()
    );
    println!(
        "  {} {}",
        "Report:".bright_cyan(),
        report_path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_stats() -> RunStats {
        let mut stats = RunStats {
            chunks_processed: 2,
            rows_in: 100,
            rows_dropped_by_date: 30,
            rows_dropped_by_quality: 5,
            rows_out: 65,
            input_bytes: 4096,
            output_bytes: 1024,
            input_columns: 46,
            output_columns: 46,
            columns_deleted: vec!["ID".to_string(), "Description".to_string()],
            columns_consumed: vec!["Start_Time".to_string(), "End_Time".to_string()],
            columns_added: vec!["YEAR".to_string(), "DURATION".to_string()],
            elapsed: Duration::from_millis(1500),
            ..Default::default()
        };
        stats.quality.oversized_string = 5;
        stats.coercion_warnings.insert("HUMIDITY".to_string(), 3);
        stats.defaults_filled.insert("CITY".to_string(), 7);
        stats
    }

    #[test]
    fn test_report_contains_before_and_after() {
        let config = PipelineConfig::new("data/US_Accidents.csv");
        let catalog = SchemaCatalog::new(&config).unwrap();
        let report = render_report(&sample_stats(), &config, &catalog);

        assert!(report.contains("before: 100"));
        assert!(report.contains("after:  65"));
        assert!(report.contains("reduction: 75.00%"));
        assert!(report.contains("dropped by date cutoff: 30"));
        assert!(report.contains("oversized_string"));
        assert!(report.contains("deleted:  ID, Description"));
        assert!(report.contains("added:    YEAR, DURATION"));
        assert!(report.contains("HUMIDITY"));
        assert!(report.contains("Chunks processed: 2"));
        assert!(report.contains("Elapsed: 1.50s"));

        let defaults = report.split("Defaults filled").nth(1).unwrap();
        assert!(defaults.lines().nth(1).unwrap().trim_start().starts_with("CITY"));
        assert!(defaults.lines().nth(1).unwrap().trim_end().ends_with('7'));
    }

    #[test]
    fn test_report_lists_sql_types_and_create_table() {
        let config = PipelineConfig::new("data/US_Accidents.csv");
        let catalog = SchemaCatalog::new(&config).unwrap();
        let report = render_report(&sample_stats(), &config, &catalog);

        assert!(report.contains("Type conversion"));
        assert!(report.contains("CREATE TABLE US_Accidents ("));
        assert!(report.contains("    [SEVERITY] TINYINT NOT NULL,"));
        assert!(report.contains("    [LATITUDE] DECIMAL(9,6) NOT NULL,"));
        assert!(report.contains("    [WIND_CHILL] DECIMAL(8,4) NULL,"));
        assert!(report.contains("    [YEAR] SMALLINT NOT NULL,"));
        assert!(!report.contains("[ID]"));

        // Every target column appears once and the last one closes the list
        let script = report.split("CREATE TABLE").nth(1).unwrap();
        let definitions: Vec<&str> = script
            .lines()
            .filter(|line| line.trim_start().starts_with('['))
            .collect();
        assert_eq!(definitions.len(), catalog.target_order().len());
        assert!(!definitions.last().unwrap().ends_with(','));
        assert!(script.contains(");"));
    }

    #[test]
    fn test_write_report_creates_parent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports").join("run.txt");

        write_report(&path, "hello\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
