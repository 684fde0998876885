//! Record matcher: classifies every record against every pattern.
//!
//! Patterns are regular expressions anchored at the start of the field
//! value and left open at the end, so `ASSAULT` matches `ASSAULTIVE` but
//! not `AGGRAVATED ASSAULT`, while `.*ASSAULT` matches both.
//!
//! ```text
//!  Dataset ──▶ classify_record ──▶ Matched(pattern indices) ──▶ aggregate (sorted)
//!                     │                                    └──▶ one group per pattern
//!                     └──▶ BlankLocation / NoMatch (dropped, counted)
//! ```

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::config::FilterSpec;
use crate::error::{ConfigError, ConfigResult, MatchError, MatchResult};
use crate::models::{Dataset, Record, INCIDENT_OCCURRED_AT, INCIDENT_YEAR};

// =============================================================================
// Pattern
// =============================================================================

/// One `pull_list` entry, compiled.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` as a start-anchored regular expression.
    pub fn compile(source: &str) -> ConfigResult<Self> {
        let invalid = |e: regex::Error| ConfigError::InvalidPattern {
            pattern: source.to_string(),
            message: e.to_string(),
        };

        // Validate on its own first: `a)(b` is only well-formed once wrapped.
        Regex::new(source).map_err(invalid)?;
        let regex = Regex::new(&format!("^(?:{})", source)).map_err(invalid)?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern as written in the filter document.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when `value` starts with text the pattern can generate.
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// A record that matched at least one pattern, with its parsed year.
#[derive(Debug, Clone, Copy)]
pub struct Matched<'a> {
    pub record: &'a Record,
    pub year: i32,
}

impl<'a> Matched<'a> {
    pub fn occurred_at(&self) -> &'a str {
        self.record.get_or_empty(INCIDENT_OCCURRED_AT)
    }
}

/// Records matching one pattern, in input order.
#[derive(Debug, Clone)]
pub struct MatchGroup<'a> {
    pub pattern: &'a Pattern,
    pub records: Vec<Matched<'a>>,
}

/// Everything the writer needs.
#[derive(Debug, Clone)]
pub struct MatchOutcome<'a> {
    /// Each matching record once, sorted by `incident_occurred_at`.
    pub aggregate: Vec<Matched<'a>>,
    /// One group per pattern, in `pull_list` order.
    pub groups: Vec<MatchGroup<'a>>,
    /// Records dropped by the blank-location policy.
    pub blank_location_skipped: usize,
}

/// How a single record relates to the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordClass {
    /// Dropped: no `X`, `Y` or `nearest_intersection` and the policy says so.
    BlankLocation,
    /// No pattern matched, or the match field could not be read.
    NoMatch,
    /// Indices of the filter's patterns that matched.
    Matched(Vec<usize>),
}

// =============================================================================
// Classification
// =============================================================================

/// Classify one record. Pure, no year handling.
pub fn classify_record(record: &Record, spec: &FilterSpec) -> RecordClass {
    if !spec.keep_blank_loc && record.has_blank_location() {
        return RecordClass::BlankLocation;
    }

    let Some(raw) = record.get(spec.method.column()) else {
        return RecordClass::NoMatch;
    };
    let value = if spec.method.needs_trailing_trim() {
        raw.trim_end()
    } else {
        raw
    };

    let hits: Vec<usize> = spec
        .patterns
        .iter()
        .enumerate()
        .filter(|(_, p)| p.matches(value))
        .map(|(i, _)| i)
        .collect();

    if hits.is_empty() {
        RecordClass::NoMatch
    } else {
        RecordClass::Matched(hits)
    }
}

/// Parse `incident_year` of a matched record.
fn incident_year(record: &Record) -> MatchResult<i32> {
    let raw = record.get_or_empty(INCIDENT_YEAR);
    raw.trim().parse::<i32>().map_err(|_| MatchError::InvalidYear {
        line: record.line(),
        value: raw.to_string(),
    })
}

/// Classify the whole dataset.
///
/// Fails if the match column or `incident_year` is not in the header, or
/// if any matched record has a non-integer `incident_year`.
pub fn classify<'a>(dataset: &'a Dataset, spec: &'a FilterSpec) -> MatchResult<MatchOutcome<'a>> {
    for column in [spec.method.column(), INCIDENT_YEAR] {
        if !dataset.schema().contains(column) {
            return Err(MatchError::MissingColumn(column.to_string()));
        }
    }

    let mut groups: Vec<MatchGroup<'a>> = spec
        .patterns
        .iter()
        .map(|pattern| MatchGroup {
            pattern,
            records: Vec::new(),
        })
        .collect();
    let mut aggregate = Vec::new();
    let mut blank_location_skipped = 0;

    for record in dataset.records() {
        match classify_record(record, spec) {
            RecordClass::BlankLocation => blank_location_skipped += 1,
            RecordClass::NoMatch => {}
            RecordClass::Matched(hits) => {
                let matched = Matched {
                    record,
                    year: incident_year(record)?,
                };
                aggregate.push(matched);
                for i in hits {
                    groups[i].records.push(matched);
                }
            }
        }
    }

    // Stable: ties keep input order.
    aggregate.sort_by(|a, b| a.occurred_at().cmp(b.occurred_at()));

    Ok(MatchOutcome {
        aggregate,
        groups,
        blank_location_skipped,
    })
}
