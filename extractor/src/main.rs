//! Incident Extract CLI - pull matching incidents out of a crime export
//!
//! ```bash
//! incident-extract extract -c hoods.yaml RMS_Crime_Incidents.csv   # Full run
//! incident-extract check hoods.yaml                                # Validate a filter
//! incident-extract values RMS_Crime_Incidents.csv -f neighborhood  # Distinct values
//! incident-extract methods                                         # Match fields
//! ```

use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use incident_extract::{
    load_filter_spec, parse_csv_file_auto, run, write_report, MatchField, RunOptions,
};
use std::io::Write;
use std::path::{Path, PathBuf};

const DEFAULT_INPUT: &str = "RMS_Crime_Incidents.csv";

#[derive(Parser)]
#[command(name = "incident-extract")]
#[command(about = "Extract crime incidents matching configured patterns", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the extraction: aggregate file plus one file per pattern
    Extract {
        /// Incident export (CSV)
        #[arg(default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Filter document (YAML or JSON)
        #[arg(short, long, env = "INCIDENT_CONFIG")]
        config: PathBuf,

        /// Directory for output files
        #[arg(short, long, env = "INCIDENT_OUTPUT_DIR", default_value = ".")]
        output_dir: PathBuf,

        /// Aggregate file name (default: filter document name)
        #[arg(short, long)]
        aggregate: Option<String>,

        /// Write a JSON run summary to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate a filter document and show how it resolves
    Check {
        /// Filter document (YAML or JSON)
        #[arg(env = "INCIDENT_CONFIG")]
        config: PathBuf,
    },

    /// List distinct values of a match field with their counts
    Values {
        /// Incident export (CSV)
        #[arg(default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Field to enumerate (e.g. neighborhood, police_precinct)
        #[arg(short, long)]
        field: String,
    },

    /// Show recognized match fields
    Methods,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input,
            config,
            output_dir,
            aggregate,
            report,
        } => cmd_extract(input, config, output_dir, aggregate, report.as_deref()),

        Commands::Check { config } => cmd_check(&config),

        Commands::Values { input, field } => cmd_values(&input, &field),

        Commands::Methods => cmd_methods(),
    };

    // Straight to stderr: the logger may be filtered off.
    if let Err(e) = result {
        eprintln!("{}", fatal_message(e.as_ref()));
        std::process::exit(1);
    }
}

fn fatal_message(err: &dyn std::error::Error) -> String {
    format!("✗ Error: {}", err)
}

fn cmd_extract(
    input: PathBuf,
    config: PathBuf,
    output_dir: PathBuf,
    aggregate: Option<String>,
    report: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = RunOptions::new(input, config).with_output_dir(output_dir);
    if let Some(name) = aggregate {
        options = options.with_aggregate_name(name);
    }

    let summary = run(&options)?;

    if let Some(path) = report {
        write_report(&summary, path)?;
        log::info!("Report written to: {}", path.display());
    }

    Ok(())
}

fn cmd_check(config: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let spec = load_filter_spec(config)?;
    let window = spec.year_window(Local::now().year());

    println!("Filter: {}", config.display());
    println!("  method:         {} (column '{}')", spec.method, spec.method.column());
    println!("  keep_blank_loc: {}", spec.keep_blank_loc);
    println!("  window:         {} to {}", window.start, window.end);
    println!("  patterns:");
    let names = incident_extract::partition_file_names(spec.pull_list(), window);
    for (pattern, name) in spec.pull_list().zip(names) {
        println!("    {:<30} -> {}", pattern, name);
    }
    for warning in &spec.warnings {
        log::warn!("{}", warning);
    }

    Ok(())
}

fn cmd_values(input: &Path, field: &str) -> Result<(), Box<dyn std::error::Error>> {
    let field: MatchField = field.parse().map_err(|bad| {
        format!(
            "Unrecognized field '{}' (expected one of: {})",
            bad,
            MatchField::known_methods()
        )
    })?;

    log::info!("Reading {}...", input.display());
    let parsed = parse_csv_file_auto(input)?;
    if !parsed.dataset.schema().contains(field.column()) {
        return Err(format!("Column '{}' not found in {}", field.column(), input.display()).into());
    }

    let values = parsed.dataset.distinct_values(field.column());
    log::info!("{} distinct values of {}", values.len(), field);
    for (value, count) in values {
        println!("{}\t{}", value, count);
    }

    Ok(())
}

fn cmd_methods() -> Result<(), Box<dyn std::error::Error>> {
    for field in MatchField::ALL {
        let note = if field.needs_trailing_trim() {
            " (trailing whitespace ignored)"
        } else {
            ""
        };
        println!("{}{}", field, note);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use incident_extract::{ConfigError, PipelineError};

    #[test]
    fn test_fatal_message_carries_cause() {
        let err = PipelineError::Config {
            path: PathBuf::from("hoods.yaml"),
            source: ConfigError::MissingKey("pull_list"),
        };
        let msg = fatal_message(&err);
        assert!(msg.starts_with("✗ Error: "));
        assert!(msg.contains("hoods.yaml"));
        assert!(msg.contains("pull_list"));
    }
}
