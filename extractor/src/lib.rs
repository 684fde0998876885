//! # Incident Extract - pull matching crime incidents out of a city export
//!
//! Reads a municipal crime-incident CSV (e.g. Detroit's `RMS_Crime_Incidents.csv`),
//! keeps the records whose neighborhood, ZIP code, precinct, offense or
//! intersection matches a list of patterns, and writes one aggregate CSV plus
//! one CSV per pattern restricted to a year window.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ filter.yaml │────▶│   Config    │────▶│   Matcher   │────▶│   Writer    │
//! │ export.csv  │────▶│   Parser    │────▶│ (regex ^…)  │     │ (per group) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use incident_extract::{run, RunOptions};
//!
//! let summary = run(&RunOptions::new("RMS_Crime_Incidents.csv", "hoods.yaml")).unwrap();
//! println!("Matched {} incidents", summary.matched);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Records, schema and match fields
//! - [`parser`] - CSV reading with auto-detection
//! - [`config`] - Filter documents
//! - [`matcher`] - Pattern matching and grouping
//! - [`writer`] - Partition files
//! - [`pipeline`] - End-to-end run
//! - [`logs`] - Progress logging

// Core modules
pub mod error;
pub mod models;

// Input
pub mod config;
pub mod parser;

// Matching and output
pub mod matcher;
pub mod writer;

// Orchestration
pub mod logs;
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    CsvError,
    MatchError,
    PipelineError,
    PipelineResult,
    WriteError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Dataset,
    MatchField,
    Record,
    Schema,
};

// =============================================================================
// Re-exports - Parsing and configuration
// =============================================================================

pub use parser::{
    parse_bytes_auto,
    parse_csv,
    parse_csv_file_auto,
    ParseResult,
};

pub use config::{
    load_filter_spec,
    FilterDocument,
    FilterSpec,
};

// =============================================================================
// Re-exports - Matching and writing
// =============================================================================

pub use matcher::{
    classify,
    MatchGroup,
    MatchOutcome,
    Pattern,
};

pub use writer::{
    partition_file_names,
    write_partitions,
    PartitionReport,
    YearWindow,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    run,
    write_report,
    RunOptions,
    RunSummary,
};
