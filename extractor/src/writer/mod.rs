//! Partition writer: one aggregate CSV plus one CSV per pattern.
//!
//! Every output carries the full input header. The aggregate holds every
//! match in `incident_occurred_at` order; a pattern's file holds only its
//! matches whose `incident_year` falls in the [`YearWindow`].

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{WriteError, WriteResult};
use crate::logs::log_success_indent;
use crate::matcher::{MatchOutcome, Matched};
use crate::models::Schema;

/// First year of the window when the filter document does not give both bounds.
pub const DEFAULT_START_YEAR: i32 = 2020;

// =============================================================================
// Year Window
// =============================================================================

/// Inclusive `[start, end]` year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearWindow {
    pub start: i32,
    pub end: i32,
}

impl YearWindow {
    /// Both bounds or neither: a lone bound is ignored and the whole window
    /// defaults to `[2020, current_year]`.
    pub fn resolve(start: Option<i32>, end: Option<i32>, current_year: i32) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => Self { start, end },
            _ => Self {
                start: DEFAULT_START_YEAR,
                end: current_year,
            },
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

// =============================================================================
// File naming
// =============================================================================

/// Keep only `[A-Za-z0-9]`.
pub fn sanitize(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// File name for each pattern, in order.
///
/// `Downtown` in `[2020, 2026]` becomes `Downtown - 2020 to 2026.csv`.
/// A pattern with nothing left after sanitizing is named `pattern{N}`;
/// repeated names get ` (2)`, ` (3)`, … so no partition overwrites another.
pub fn partition_file_names<'a, I>(patterns: I, window: YearWindow) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut used: HashMap<String, usize> = HashMap::new();
    patterns
        .into_iter()
        .enumerate()
        .map(|(i, pattern)| {
            let mut stem = sanitize(pattern);
            if stem.is_empty() {
                stem = format!("pattern{}", i + 1);
            }
            let seen = used.entry(stem.clone()).or_insert(0);
            *seen += 1;
            if *seen > 1 {
                stem = format!("{} ({})", stem, seen);
            }
            format!("{} - {} to {}.csv", stem, window.start, window.end)
        })
        .collect()
}

/// Aggregate file name from a filter document path: `hoods.yaml` → `hoods.csv`.
pub fn aggregate_file_name(config_path: &Path) -> String {
    let stem = config_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "matches".to_string());
    format!("{}.csv", stem)
}

// =============================================================================
// Writing
// =============================================================================

/// Rows written to one output file.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionReport {
    /// Pattern source, or `None` for the aggregate.
    pub pattern: Option<String>,
    pub path: PathBuf,
    pub rows: usize,
}

/// Everything written by [`write_partitions`].
#[derive(Debug, Clone, Serialize)]
pub struct WriteSummary {
    pub window: YearWindow,
    pub aggregate: PartitionReport,
    pub partitions: Vec<PartitionReport>,
}

/// Write `rows` under `schema`'s header to `path`, flushing before return.
fn write_csv<'r, 'a: 'r, I>(path: &Path, schema: &Schema, rows: I) -> WriteResult<usize>
where
    I: IntoIterator<Item = &'r Matched<'a>>,
{
    let csv_err = |source| WriteError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(schema.columns()).map_err(csv_err)?;

    let mut count = 0;
    for matched in rows {
        writer.write_record(matched.record.values()).map_err(csv_err)?;
        count += 1;
    }

    writer.flush().map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(count)
}

/// Write the aggregate file and one file per pattern into `output_dir`.
pub fn write_partitions(
    outcome: &MatchOutcome<'_>,
    schema: &Schema,
    window: YearWindow,
    output_dir: &Path,
    aggregate_name: &str,
) -> WriteResult<WriteSummary> {
    let names = partition_file_names(outcome.groups.iter().map(|g| g.pattern.source()), window);
    if names.iter().any(|n| n == aggregate_name) {
        return Err(WriteError::AggregateCollision(aggregate_name.to_string()));
    }

    std::fs::create_dir_all(output_dir).map_err(|source| WriteError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let aggregate_path = output_dir.join(aggregate_name);
    let rows = write_csv(&aggregate_path, schema, &outcome.aggregate)?;
    log_success_indent(format!("{}: {} rows", aggregate_name, rows), 1);
    let aggregate = PartitionReport {
        pattern: None,
        path: aggregate_path,
        rows,
    };

    let mut partitions = Vec::with_capacity(names.len());
    for (group, name) in outcome.groups.iter().zip(names) {
        let path = output_dir.join(&name);
        let in_window = group.records.iter().filter(|m| window.contains(m.year));
        let rows = write_csv(&path, schema, in_window)?;
        log_success_indent(format!("{}: {} rows", name, rows), 1);
        partitions.push(PartitionReport {
            pattern: Some(group.pattern.source().to_string()),
            path,
            rows,
        });
    }

    Ok(WriteSummary {
        window,
        aggregate,
        partitions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterSpec;
    use crate::matcher::classify;
    use crate::parser::parse_csv;

    const INPUT: &str = "\
incident_occurred_at,incident_year,neighborhood,X,Y,nearest_intersection
2019-06-01 12:00,2019,Downtown,-83.04,42.33,Woodward & Jefferson
2023-02-01 08:00,2023,Midtown,-83.06,42.35,Cass & Warren
2021-04-01 09:30,2021,Downtown,-83.05,42.33,Griswold & State
";

    #[test]
    fn test_window_resolution() {
        assert_eq!(
            YearWindow::resolve(Some(2018), Some(2022), 2026),
            YearWindow { start: 2018, end: 2022 }
        );
        assert_eq!(
            YearWindow::resolve(None, None, 2026),
            YearWindow { start: 2020, end: 2026 }
        );
        assert_eq!(
            YearWindow::resolve(Some(2015), None, 2026),
            YearWindow { start: 2020, end: 2026 }
        );
        assert_eq!(
            YearWindow::resolve(None, Some(2022), 2026),
            YearWindow { start: 2020, end: 2026 }
        );
    }

    #[test]
    fn test_window_is_inclusive() {
        let window = YearWindow { start: 2020, end: 2022 };
        assert!(window.contains(2020));
        assert!(window.contains(2022));
        assert!(!window.contains(2019));
        assert!(!window.contains(2023));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Dexter-Fenkell"), "DexterFenkell");
        assert_eq!(sanitize(".*ASSAULT"), "ASSAULT");
        assert_eq!(sanitize("Woodward & 7 Mile"), "Woodward7Mile");
        assert_eq!(sanitize("Société"), "Socit");
    }

    #[test]
    fn test_partition_file_names() {
        let window = YearWindow { start: 2020, end: 2026 };
        let names = partition_file_names(["Downtown", ".*ASSAULT", "ASSAULT", ".*", "ASSAULT$"], window);
        assert_eq!(
            names,
            vec![
                "Downtown - 2020 to 2026.csv",
                "ASSAULT - 2020 to 2026.csv",
                "ASSAULT (2) - 2020 to 2026.csv",
                "pattern4 - 2020 to 2026.csv",
                "ASSAULT (3) - 2020 to 2026.csv",
            ]
        );
    }

    #[test]
    fn test_aggregate_file_name() {
        assert_eq!(aggregate_file_name(Path::new("conf/east-side.yaml")), "eastside.csv");
        assert_eq!(aggregate_file_name(Path::new("...")), "matches.csv");
    }

    #[test]
    fn test_write_partitions() {
        let dataset = parse_csv(INPUT, ',').unwrap();
        let spec = FilterSpec::parse("method: neighborhood\npull_list: [Downtown, Midtown]\n").unwrap();
        let outcome = classify(&dataset, &spec).unwrap();
        let window = YearWindow { start: 2020, end: 2026 };
        let dir = tempfile::tempdir().unwrap();

        let summary = write_partitions(&outcome, dataset.schema(), window, dir.path(), "hoods.csv").unwrap();

        assert_eq!(summary.aggregate.rows, 3);
        let aggregate = std::fs::read_to_string(dir.path().join("hoods.csv")).unwrap();
        let lines: Vec<&str> = aggregate.lines().collect();
        assert_eq!(lines[0], INPUT.lines().next().unwrap());
        assert!(lines[1].starts_with("2019-06-01"));
        assert!(lines[2].starts_with("2021-04-01"));
        assert!(lines[3].starts_with("2023-02-01"));

        assert_eq!(summary.partitions.len(), 2);
        assert_eq!(summary.partitions[0].rows, 1);
        let downtown = std::fs::read_to_string(dir.path().join("Downtown - 2020 to 2026.csv")).unwrap();
        assert_eq!(downtown.lines().count(), 2);
        assert!(downtown.contains("2021-04-01 09:30"));
        assert!(!downtown.contains("2019-06-01"));

        assert_eq!(summary.partitions[1].pattern.as_deref(), Some("Midtown"));
        assert_eq!(summary.partitions[1].rows, 1);
    }

    #[test]
    fn test_aggregate_name_must_not_shadow_partition() {
        let dataset = parse_csv(INPUT, ',').unwrap();
        let spec = FilterSpec::parse("method: neighborhood\npull_list: [Downtown]\n").unwrap();
        let outcome = classify(&dataset, &spec).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let err = write_partitions(
            &outcome,
            dataset.schema(),
            YearWindow { start: 2020, end: 2026 },
            &out,
            "Downtown - 2020 to 2026.csv",
        )
        .unwrap_err();

        assert!(matches!(err, WriteError::AggregateCollision(ref n) if n == "Downtown - 2020 to 2026.csv"));
        assert!(!out.exists());
    }

    #[test]
    fn test_empty_partition_still_has_header() {
        let dataset = parse_csv(INPUT, ',').unwrap();
        let spec = FilterSpec::parse("method: neighborhood\npull_list: [Corktown]\n").unwrap();
        let outcome = classify(&dataset, &spec).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let summary = write_partitions(
            &outcome,
            dataset.schema(),
            YearWindow { start: 2020, end: 2026 },
            dir.path(),
            "none.csv",
        )
        .unwrap();

        assert_eq!(summary.aggregate.rows, 0);
        assert_eq!(summary.partitions[0].rows, 0);
        let corktown = std::fs::read_to_string(dir.path().join("Corktown - 2020 to 2026.csv")).unwrap();
        assert_eq!(corktown.lines().count(), 1);
    }
}
