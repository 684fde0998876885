//! Domain models for the incident extraction pipeline.
//!
//! - [`Schema`] - ordered column list shared by every record
//! - [`Record`] - one incident row
//! - [`Dataset`] - the whole export held in memory
//! - [`MatchField`] - the closed set of columns a filter may match on

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// Well-known columns
// =============================================================================

/// Year the incident occurred, an integer in string form.
pub const INCIDENT_YEAR: &str = "incident_year";

/// Occurrence timestamp, ISO ordered, used for the aggregate sort.
pub const INCIDENT_OCCURRED_AT: &str = "incident_occurred_at";

/// Longitude.
pub const LOCATION_X: &str = "X";

/// Latitude.
pub const LOCATION_Y: &str = "Y";

/// Nearest intersection, also a match field.
pub const NEAREST_INTERSECTION: &str = "nearest_intersection";

/// Columns that must be present in every dataset, whatever the match field.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    INCIDENT_YEAR,
    INCIDENT_OCCURRED_AT,
    LOCATION_X,
    LOCATION_Y,
    NEAREST_INTERSECTION,
];

// =============================================================================
// Match Field
// =============================================================================

/// Column a filter document matches its patterns against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    ZipCode,
    Neighborhood,
    ReportNumber,
    PolicePrecinct,
    OffenseCategory,
    OffenseDescription,
    NearestIntersection,
}

impl MatchField {
    /// Every recognized field, in documentation order.
    pub const ALL: [MatchField; 7] = [
        MatchField::ZipCode,
        MatchField::Neighborhood,
        MatchField::ReportNumber,
        MatchField::PolicePrecinct,
        MatchField::OffenseCategory,
        MatchField::OffenseDescription,
        MatchField::NearestIntersection,
    ];

    /// Column name in the export. Identical to the `method` token.
    pub fn column(self) -> &'static str {
        match self {
            MatchField::ZipCode => "zip_code",
            MatchField::Neighborhood => "neighborhood",
            MatchField::ReportNumber => "report_number",
            MatchField::PolicePrecinct => "police_precinct",
            MatchField::OffenseCategory => "offense_category",
            MatchField::OffenseDescription => "offense_description",
            MatchField::NearestIntersection => NEAREST_INTERSECTION,
        }
    }

    /// Offense descriptions arrive with trailing padding in the export.
    pub fn needs_trailing_trim(self) -> bool {
        matches!(self, MatchField::OffenseDescription)
    }

    /// Comma-separated list of every method token.
    pub fn known_methods() -> String {
        Self::ALL
            .iter()
            .map(|f| f.column())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for MatchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.column() == s)
            .ok_or_else(|| s.to_string())
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Ordered header of the export plus a name lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema. Returns the first duplicated name on failure.
    pub fn new(columns: Vec<String>) -> Result<Self, String> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(name.clone());
            }
        }
        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }
}

// =============================================================================
// Record
// =============================================================================

/// One incident row. Values are stored in schema order.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<String>,
    line: u64,
}

impl Record {
    /// Build a record. Short rows are padded with empty strings so every
    /// record carries the full schema.
    pub fn new(schema: Arc<Schema>, mut values: Vec<String>, line: u64) -> Self {
        values.resize(schema.len(), String::new());
        Self {
            schema,
            values,
            line,
        }
    }

    /// Value of `column`, or `None` when the schema has no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.schema
            .position(column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// Value of `column`, empty when the column is unknown.
    pub fn get_or_empty(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Values in schema order, ready to be written back out.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// 1-based line of the record in the source file.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// True when `X`, `Y` and `nearest_intersection` are all empty.
    pub fn has_blank_location(&self) -> bool {
        [LOCATION_X, LOCATION_Y, NEAREST_INTERSECTION]
            .iter()
            .all(|c| self.get_or_empty(c).is_empty())
    }

    fn trim_end_at(&mut self, index: usize) {
        if let Some(value) = self.values.get_mut(index) {
            let trimmed_len = value.trim_end().len();
            value.truncate(trimmed_len);
        }
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// The full export held in memory.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(schema: Arc<Schema>, records: Vec<Record>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Columns from `required` that the header lacks.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|c| !self.schema.contains(c))
            .collect()
    }

    /// Strip trailing whitespace from every value of `column`.
    ///
    /// Returns how many values changed.
    pub fn trim_trailing_whitespace(&mut self, column: &str) -> usize {
        let Some(index) = self.schema.position(column) else {
            return 0;
        };
        let mut changed = 0;
        for record in &mut self.records {
            let before = record.values[index].len();
            record.trim_end_at(index);
            if record.values[index].len() != before {
                changed += 1;
            }
        }
        changed
    }

    /// Every distinct value of `column` with its number of occurrences,
    /// sorted by value.
    pub fn distinct_values(&self, column: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            if let Some(value) = record.get(column) {
                *counts.entry(value.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }
}
