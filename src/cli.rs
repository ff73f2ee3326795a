//! Command-line interface components.
//!
//! A thin adapter: arguments are turned into one `PipelineConfig` and
//! nothing else in the crate sees them.

use crate::config::{PipelineConfig, TimeFeatureSet, parse_column_list, parse_date_cutoff};
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "accidents")]
#[command(about = "Clean the US traffic-accident CSV export for star-schema bulk load")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Raw accident export (CSV with header row)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output CSV (default: <INPUT_STEM>-cleaned.csv beside the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report file (default: <OUTPUT_STEM>_report.txt beside the output)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Rows read and processed per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Drop rows that started before this date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub date_cutoff: Option<String>,

    /// Comma-separated columns to delete; replaces the built-in list
    #[arg(long, value_name = "A,B,...")]
    pub delete_columns: Option<String>,

    /// Comma-separated text columns checked by the length filter
    #[arg(long, value_name = "A,B,...")]
    pub quality_columns: Option<String>,

    /// Longest trimmed text value kept in quality-checked columns
    #[arg(long)]
    pub max_string_length: Option<usize>,

    /// Also derive MINUTE and SECOND
    #[arg(long)]
    pub extended_time_features: bool,

    /// Drop near-duplicate accidents within each chunk
    #[arg(long)]
    pub deduplicate: bool,

    /// Keep rows whose severity is outside 1-4
    #[arg(long)]
    pub no_severity_check: bool,

    /// Invalid-value fraction in one column of one chunk that aborts the run
    #[arg(long)]
    pub max_invalid_fraction: Option<f64>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Get log level based on verbosity
    pub fn get_log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Resolve the pipeline configuration, failing on malformed values
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::new(&self.input).with_verbose(self.verbose);

        if let Some(output) = &self.output {
            config = config.with_output_path(output);
        }
        if let Some(report) = &self.report {
            config = config.with_report_path(report);
        }
        if let Some(chunk_size) = self.chunk_size {
            config = config.with_chunk_size(chunk_size);
        }
        if let Some(cutoff) = &self.date_cutoff {
            config = config.with_date_cutoff(parse_date_cutoff(cutoff)?);
        }
        if let Some(columns) = &self.delete_columns {
            config = config.with_delete_columns(parse_column_list(columns));
        }
        if let Some(columns) = &self.quality_columns {
            config = config.with_quality_columns(parse_column_list(columns));
        }
        if let Some(max) = self.max_string_length {
            config = config.with_max_string_length(max);
        }
        if let Some(fraction) = self.max_invalid_fraction {
            config = config.with_max_invalid_fraction(fraction);
        }
        if self.extended_time_features {
            config = config.with_time_features(TimeFeatureSet::Extended);
        }
        if self.deduplicate {
            config = config.with_deduplication();
        }
        if self.no_severity_check {
            config = config.without_severity_check();
        }
        if self.no_progress {
            config = config.without_progress();
        }

        config.validate()?;
        debug!("Resolved configuration from arguments");
        Ok(config)
    }
}

/// Set up structured logging to stderr
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("accidents_processor={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}
