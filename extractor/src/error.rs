//! Error types for the incident extraction pipeline.
//!
//! This module defines one error type per pipeline layer:
//!
//! - [`CsvError`] - reading and decoding the incident export
//! - [`ConfigError`] - resolving a filter document into a [`crate::FilterSpec`]
//! - [`MatchError`] - data integrity failures found while matching
//! - [`WriteError`] - writing partition files
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Lower layers convert into [`PipelineError`] via `From`, so `?` works
//! across the whole run.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// CSV Input Errors
// =============================================================================

/// Errors while reading the incident export.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// The same column name appears twice in the header.
    #[error("Duplicate column in header: {0}")]
    DuplicateColumn(String),

    /// A row does not carry the same number of fields as the header.
    #[error("Line {line}: expected {expected} fields, found {found}")]
    RowWidth {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Invalid CSV format.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        CsvError::ParseError(err.to_string())
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while resolving a filter document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML/JSON or has the wrong shape.
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// A required key is absent.
    #[error("Missing required key '{0}'")]
    MissingKey(&'static str),

    /// `method` names a field we do not match on.
    #[error("Unrecognized method '{0}' (expected one of: {1})")]
    UnknownMethod(String, String),

    /// `pull_list` is present but holds no patterns.
    #[error("'pull_list' must contain at least one pattern")]
    EmptyPullList,

    /// A pattern is an empty string.
    #[error("'pull_list' entry {0} is empty")]
    EmptyPattern(usize),

    /// A pattern is not a valid regular expression.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A year bound is not an integer.
    #[error("'{key}' must be an integer, got '{value}'")]
    InvalidYear { key: &'static str, value: String },

    /// `start_year` is after `end_year`.
    #[error("'start_year' ({start}) is after 'end_year' ({end})")]
    InvertedWindow { start: i32, end: i32 },
}

// =============================================================================
// Matching Errors
// =============================================================================

/// Data integrity failures found while classifying records.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A matched record has an `incident_year` that is not an integer.
    #[error("Line {line}: matched record has non-integer incident_year '{value}'")]
    InvalidYear { line: u64, value: String },

    /// A column the matcher needs is not in the dataset header.
    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(String),
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing partition files.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Could not create or write the output file.
    #[error("Cannot write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("Cannot write '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The aggregate output would replace the input export.
    #[error("Refusing to overwrite the input file '{0}'")]
    WouldOverwriteInput(PathBuf),

    /// The aggregate file name is also a per-pattern file name.
    #[error("Aggregate name '{0}' collides with a per-pattern output file")]
    AggregateCollision(String),

    /// Summary report serialization failed.
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration document could not be read.
    #[error("Cannot read config '{path}': {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is invalid.
    #[error("Invalid config '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// Reading the incident export failed.
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: CsvError,
    },

    /// Matching failed.
    #[error("Match error: {0}")]
    Match(#[from] MatchError),

    /// Writing outputs failed.
    #[error("Output error: {0}")]
    Write(#[from] WriteError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration resolution.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for matching.
pub type MatchResult<T> = Result<T, MatchError>;

/// Result type for partition writing.
pub type WriteResult<T> = Result<T, WriteError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
