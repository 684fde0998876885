//! End-to-end extraction run.
//!
//! ```text
//! filter doc ──▶ FilterSpec ─┐
//!                            ├──▶ classify ──▶ write_partitions ──▶ RunSummary
//! export.csv ──▶ Dataset ────┘
//! ```
//!
//! The filter document is resolved before the export is opened, so a bad
//! document never costs a read of a multi-gigabyte file.
//!
//! # Example
//!
//! ```rust,ignore
//! use incident_extract::pipeline::{run, RunOptions};
//!
//! let summary = run(&RunOptions::new("RMS_Crime_Incidents.csv", "hoods.yaml"))?;
//! println!("{} matches", summary.matched);
//! ```

use chrono::{DateTime, Datelike, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{load_filter_spec, FilterSpec};
use crate::error::{MatchError, PipelineError, PipelineResult, WriteError, WriteResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::matcher::classify;
use crate::models::{MatchField, REQUIRED_COLUMNS};
use crate::parser::parse_csv_file_auto;
use crate::writer::{aggregate_file_name, write_partitions, PartitionReport, YearWindow};

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Incident export to read.
    pub input: PathBuf,
    /// Filter document.
    pub config: PathBuf,
    /// Directory receiving every output file.
    pub output_dir: PathBuf,
    /// Aggregate file name; derived from the filter document when `None`.
    pub aggregate_name: Option<String>,
    /// Calendar year closing the default window; today's year when `None`.
    pub current_year: Option<i32>,
}

impl RunOptions {
    pub fn new(input: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            config: config.into(),
            output_dir: PathBuf::from("."),
            aggregate_name: None,
            current_year: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_aggregate_name(mut self, name: impl Into<String>) -> Self {
        self.aggregate_name = Some(name.into());
        self
    }

    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }
}

/// What a run did, suitable for a JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub input: PathBuf,
    pub config: PathBuf,
    pub encoding: String,
    pub delimiter: char,
    pub records: usize,
    pub filter: FilterSpec,
    pub matched: usize,
    pub blank_location_skipped: usize,
    pub window: YearWindow,
    pub aggregate: PartitionReport,
    pub partitions: Vec<PartitionReport>,
    pub elapsed_ms: u64,
}

/// Run the whole extraction.
pub fn run(options: &RunOptions) -> PipelineResult<RunSummary> {
    let started_at = Local::now();
    let clock = Instant::now();

    // 1. Filter document
    log_info(format!("Reading filter {}...", options.config.display()));
    let spec = load_filter_spec(&options.config)?;
    for warning in &spec.warnings {
        log_warning(warning.as_str());
    }
    log_success(format!(
        "Matching {} against {} pattern(s)",
        spec.method,
        spec.patterns.len()
    ));

    // 2. Export
    log_info(format!("Reading {}...", options.input.display()));
    let parsed = parse_csv_file_auto(&options.input).map_err(|source| PipelineError::Csv {
        path: options.input.clone(),
        source,
    })?;
    let mut dataset = parsed.dataset;
    log_success(format!(
        "Read {} records ({}, '{}')",
        dataset.len(),
        parsed.encoding,
        format_delimiter(parsed.delimiter)
    ));
    log_info_indent(format!("Fieldnames: {}", dataset.schema().columns().join(", ")), 1);

    let mut required = vec![spec.method.column()];
    required.extend(REQUIRED_COLUMNS);
    if let Some(missing) = dataset.missing_columns(&required).first() {
        return Err(MatchError::MissingColumn(missing.to_string()).into());
    }

    if spec.method.needs_trailing_trim() {
        let trimmed = dataset.trim_trailing_whitespace(MatchField::OffenseDescription.column());
        if trimmed > 0 {
            log_info_indent(format!("Trimmed trailing whitespace from {} descriptions", trimmed), 1);
        }
    }

    // 3. Match
    log_info("Matching records...");
    let outcome = classify(&dataset, &spec)?;
    log_success(format!("Total matches: {}", outcome.aggregate.len()));
    if outcome.blank_location_skipped > 0 {
        log_info_indent(
            format!("{} records without location skipped", outcome.blank_location_skipped),
            1,
        );
    }

    // 4. Write
    let current_year = options.current_year.unwrap_or_else(|| started_at.year());
    let window = spec.year_window(current_year);
    let aggregate_name = options
        .aggregate_name
        .clone()
        .unwrap_or_else(|| aggregate_file_name(&options.config));
    guard_input(&options.input, &options.output_dir.join(&aggregate_name))?;

    log_info(format!(
        "Writing to {} (window {} to {})...",
        options.output_dir.display(),
        window.start,
        window.end
    ));
    let written = write_partitions(&outcome, dataset.schema(), window, &options.output_dir, &aggregate_name)?;

    let elapsed = clock.elapsed();
    log_success(format!("Total time: {:.2?}", elapsed));

    Ok(RunSummary {
        started_at,
        input: options.input.clone(),
        config: options.config.clone(),
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        records: dataset.len(),
        matched: outcome.aggregate.len(),
        blank_location_skipped: outcome.blank_location_skipped,
        window: written.window,
        aggregate: written.aggregate,
        partitions: written.partitions,
        filter: spec,
        elapsed_ms: elapsed.as_millis() as u64,
    })
}

/// Write `summary` as pretty JSON.
pub fn write_report(summary: &RunSummary, path: &Path) -> WriteResult<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Refuse an aggregate path that resolves to the input export.
fn guard_input(input: &Path, aggregate: &Path) -> WriteResult<()> {
    let same = match (input.canonicalize(), aggregate.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same {
        return Err(WriteError::WouldOverwriteInput(input.to_path_buf()));
    }
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
