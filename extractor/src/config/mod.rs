//! Filter documents and their resolution into a [`FilterSpec`].
//!
//! A filter document is a small YAML file (JSON works too, as YAML flow
//! syntax):
//!
//! ```yaml
//! method: police_precinct
//! pull_list:
//!   - 08
//!   - 10
//! keep_blank_loc: True
//! start_year: 2021
//! end_year: 2024
//! ```
//!
//! Every scalar is read as its literal text, so `08` stays `08` and
//! `True` is compared as a token, never coerced by the YAML parser.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult, PipelineError, PipelineResult};
use crate::matcher::Pattern;
use crate::models::MatchField;
use crate::writer::YearWindow;

/// The only value of `keep_blank_loc` that enables it.
pub const TRUTHY_TOKEN: &str = "True";

/// Raw filter document, before validation.
///
/// Unknown keys are rejected so a misspelled `start_year` cannot silently
/// widen the window.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDocument {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub pull_list: Option<Vec<String>>,
    #[serde(default)]
    pub keep_blank_loc: Option<String>,
    #[serde(default)]
    pub start_year: Option<String>,
    #[serde(default)]
    pub end_year: Option<String>,
}

impl FilterDocument {
    /// Parse a document from YAML or JSON text.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| ConfigError::Malformed(e.to_string()))
    }
}

/// A validated filter.
#[derive(Debug, Clone, Serialize)]
pub struct FilterSpec {
    /// Column the patterns are tested against.
    pub method: MatchField,
    /// Compiled patterns, in document order, duplicates removed.
    pub patterns: Vec<Pattern>,
    /// Keep records with no `X`, `Y` or `nearest_intersection`.
    pub keep_blank_loc: bool,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    /// Non-fatal findings for the caller to report.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl FilterSpec {
    /// Validate a raw document.
    pub fn resolve(doc: FilterDocument) -> ConfigResult<Self> {
        let method_token = doc.method.ok_or(ConfigError::MissingKey("method"))?;
        let method: MatchField = method_token
            .trim()
            .parse()
            .map_err(|bad| ConfigError::UnknownMethod(bad, MatchField::known_methods()))?;

        let pull_list = doc.pull_list.ok_or(ConfigError::MissingKey("pull_list"))?;
        if pull_list.is_empty() {
            return Err(ConfigError::EmptyPullList);
        }

        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut patterns = Vec::with_capacity(pull_list.len());
        for (i, source) in pull_list.into_iter().enumerate() {
            if source.is_empty() {
                return Err(ConfigError::EmptyPattern(i + 1));
            }
            if !seen.insert(source.clone()) {
                warnings.push(format!("Duplicate pattern '{}' ignored", source));
                continue;
            }
            patterns.push(Pattern::compile(&source)?);
        }

        let keep_blank_loc = match doc.keep_blank_loc.as_deref() {
            Some(TRUTHY_TOKEN) => true,
            Some(other) => {
                warnings.push(format!(
                    "keep_blank_loc is '{}', not '{}'; blank locations will be dropped",
                    other, TRUTHY_TOKEN
                ));
                false
            }
            None => false,
        };

        let start_year = parse_year("start_year", doc.start_year)?;
        let end_year = parse_year("end_year", doc.end_year)?;
        match (start_year, end_year) {
            (Some(start), Some(end)) if start > end => {
                return Err(ConfigError::InvertedWindow { start, end });
            }
            (Some(_), None) | (None, Some(_)) => {
                warnings.push(
                    "Only one of start_year/end_year is set; using the default window".to_string(),
                );
            }
            _ => {}
        }

        Ok(Self {
            method,
            patterns,
            keep_blank_loc,
            start_year,
            end_year,
            warnings,
        })
    }

    /// Parse and validate document text.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        Self::resolve(FilterDocument::parse(text)?)
    }

    /// Pattern sources, in order.
    pub fn pull_list(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::source)
    }

    /// Effective year window given the current calendar year.
    pub fn year_window(&self, current_year: i32) -> YearWindow {
        YearWindow::resolve(self.start_year, self.end_year, current_year)
    }
}

fn parse_year(key: &'static str, value: Option<String>) -> ConfigResult<Option<i32>> {
    value
        .map(|v| {
            v.trim().parse::<i32>().map_err(|_| ConfigError::InvalidYear {
                key,
                value: v.clone(),
            })
        })
        .transpose()
}

/// Read and resolve a filter document from disk.
///
/// Errors name the document so the caller can report it as-is.
pub fn load_filter_spec(path: &Path) -> PipelineResult<FilterSpec> {
    let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;

    FilterSpec::parse(&text).map_err(|source| PipelineError::Config {
        path: path.to_path_buf(),
        source,
    })
}
