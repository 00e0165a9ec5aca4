//! Mileage CLI - Command-line interface for Visual Mileage
//!
//! Commands:
//! - export: Turn pasted Timeero text into the mileage report
//! - validate: Check pasted text without touching the mileage chart
//! - doctor: Diagnose configuration and mileage chart health
//! - branches: Print the branch name to location code table

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use visual_mileage::legs::LegReconstructor;
use visual_mileage::normalizer::Normalizer;
use visual_mileage::parser::VisitParser;
use visual_mileage::{
    MileageConfig, MileageError, MileageProcessor, ReferenceTable, ReportFormat, MILEAGE_VERSION,
    PRODUCER_NAME,
};

/// Mileage - corrected branch-to-branch mileage from Timeero exports
#[derive(Parser)]
#[command(name = "mileage")]
#[command(version = MILEAGE_VERSION)]
#[command(about = "Build a corrected mileage report from pasted Timeero text", long_about = None)]
struct Cli {
    /// Log dropped entries and legs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the mileage report (overwrites the output file)
    Export {
        /// Pasted text file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Report path; defaults to the configured report path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format; inferred from the output extension when omitted
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Mileage chart CSV; overrides the configured path
        #[arg(long)]
        reference: Option<PathBuf>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print run statistics as JSON after the completion message
        #[arg(long)]
        stats: bool,
    },

    /// Check pasted text without looking up any distances
    Validate {
        /// Pasted text file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and mileage chart health
    Doctor {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Mileage chart CSV; overrides the configured path
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the branch name to location code table
    Branches {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Excel workbook with a frozen header row
    Xlsx,
    /// Comma-separated values
    Csv,
    /// JSON array of rows
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Xlsx => ReportFormat::Xlsx,
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<(), MileageCliError> {
    match cli.command {
        Commands::Export {
            input,
            output,
            format,
            reference,
            config,
            stats,
        } => cmd_export(
            &input,
            output,
            format,
            reference,
            config.as_deref(),
            stats,
        ),

        Commands::Validate {
            input,
            config,
            json,
        } => cmd_validate(&input, config.as_deref(), json),

        Commands::Doctor {
            config,
            reference,
            json,
        } => cmd_doctor(config.as_deref(), reference, json),

        Commands::Branches { config, json } => cmd_branches(config.as_deref(), json),
    }
}

fn cmd_export(
    input: &Path,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    reference: Option<PathBuf>,
    config: Option<&Path>,
    stats: bool,
) -> Result<(), MileageCliError> {
    let mut config = load_config(config)?;
    if let Some(reference) = reference {
        config.reference.path = reference;
    }
    let output = output.unwrap_or_else(|| config.report.path.clone());

    let text = read_input(input)?;
    let processor = MileageProcessor::from_config(&config)?;
    let (message, run) = processor.export(&text, &output, format.map(ReportFormat::from))?;

    println!("{}", message);
    if stats {
        println!("{}", serde_json::to_string_pretty(&run.stats)?);
    }

    Ok(())
}

fn cmd_validate(input: &Path, config: Option<&Path>, json: bool) -> Result<(), MileageCliError> {
    let config = load_config(config)?;
    let locations = config.location_map()?;
    let text = read_input(input)?;

    let parsed = VisitParser::new(config.parser.clone()).parse(&text);
    let visits_parsed = parsed.visits.len();
    let visits = Normalizer::normalize(parsed.visits)?;
    let days = LegReconstructor::group_by_day(&visits);

    let mut unknown_branches: Vec<String> = Vec::new();
    for visit in &visits {
        if locations.code(&visit.branch).is_none() && !unknown_branches.contains(&visit.branch) {
            unknown_branches.push(visit.branch.clone());
        }
    }

    let report = ValidationReport {
        lines_read: parsed.stats.lines_read,
        noise_lines: parsed.stats.noise_lines,
        visits_parsed,
        groups_discarded: parsed.stats.groups_discarded,
        trailing_fields: parsed.stats.trailing_fields,
        zero_duration_visits: visits_parsed - visits.len(),
        visits_kept: visits.len(),
        days: days.len(),
        first_date: days.first().map(|d| d.date.to_string()),
        last_date: days.last().map(|d| d.date.to_string()),
        unknown_branches,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Lines read:         {}", report.lines_read);
        println!("Noise lines:        {}", report.noise_lines);
        println!("Visits parsed:      {}", report.visits_parsed);
        println!("Entries discarded:  {}", report.groups_discarded);
        println!("Trailing fields:    {}", report.trailing_fields);
        println!("Zero-duration:      {}", report.zero_duration_visits);
        println!("Visits kept:        {}", report.visits_kept);
        println!("Days:               {}", report.days);
        if let (Some(first), Some(last)) = (&report.first_date, &report.last_date) {
            println!("Date range:         {} .. {}", first, last);
        }

        if !report.unknown_branches.is_empty() {
            println!("\nUnknown branches:");
            for name in &report.unknown_branches {
                println!("  - {}", name);
            }
        }
    }

    if report.visits_kept == 0 {
        Err(MileageCliError::NoVisits)
    } else if !report.unknown_branches.is_empty() {
        Err(MileageCliError::ValidationFailed(report.unknown_branches.len()))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    config_path: Option<&Path>,
    reference: Option<PathBuf>,
    json: bool,
) -> Result<(), MileageCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "mileage_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Visual Mileage version {}", MILEAGE_VERSION),
    });

    let (config_check, config) = check_config(config_path);
    checks.push(config_check);

    if let Some(mut config) = config {
        if let Some(reference) = reference {
            config.reference.path = reference;
        }
        checks.extend(check_lookups(&config));
    }

    // Check stdin (pasted text is usually piped in)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (use -i <file> or pipe the pasted text)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for -i -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: MILEAGE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Mileage Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MileageCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

/// Configuration file check; the config is returned only when it loaded
fn check_config(config_path: Option<&Path>) -> (DoctorCheck, Option<MileageConfig>) {
    match load_config(config_path) {
        Ok(config) => (
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: match config_path {
                    Some(path) => format!("Loaded {}", path.display()),
                    None => "Using built-in defaults".to_string(),
                },
            },
            Some(config),
        ),
        Err(e) => (
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
            None,
        ),
    }
}

/// Branch table and mileage chart checks
fn check_lookups(config: &MileageConfig) -> Vec<DoctorCheck> {
    let mut checks = Vec::new();

    let locations = match config.location_map() {
        Ok(locations) => {
            checks.push(DoctorCheck {
                name: "branches".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} branch names, {} location codes",
                    locations.len(),
                    locations.distinct_codes().len()
                ),
            });
            locations
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "branches".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            return checks;
        }
    };

    let path = &config.reference.path;
    if !path.exists() {
        checks.push(DoctorCheck {
            name: "mileage_chart".to_string(),
            status: CheckStatus::Error,
            message: format!("{} does not exist", path.display()),
        });
        return checks;
    }

    let table = match ReferenceTable::load(path, &config.reference.index_column) {
        Ok(table) => {
            checks.push(DoctorCheck {
                name: "mileage_chart".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} ({} locations)", path.display(), table.len()),
            });
            table
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "mileage_chart".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            return checks;
        }
    };

    let codes = locations.distinct_codes();
    let missing_rows: Vec<&str> = codes
        .iter()
        .copied()
        .filter(|code| !table.contains(code))
        .collect();
    let missing_cells = codes
        .iter()
        .flat_map(|from| codes.iter().map(move |to| (*from, *to)))
        .filter(|(from, to)| table.contains(from) && table.distance(from, to).is_none())
        .count();

    checks.push(if !missing_rows.is_empty() {
        DoctorCheck {
            name: "chart_coverage".to_string(),
            status: CheckStatus::Error,
            message: format!("Codes missing from chart: {}", missing_rows.join(", ")),
        }
    } else if missing_cells > 0 {
        DoctorCheck {
            name: "chart_coverage".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} code pairs have no distance", missing_cells),
        }
    } else {
        DoctorCheck {
            name: "chart_coverage".to_string(),
            status: CheckStatus::Ok,
            message: "Every branch code pair has a distance".to_string(),
        }
    });

    checks
}

fn cmd_branches(config: Option<&Path>, json: bool) -> Result<(), MileageCliError> {
    let config = load_config(config)?;
    let locations = config.location_map()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&locations.entries())?);
    } else {
        let width = locations
            .entries()
            .iter()
            .map(|e| e.name.len())
            .max()
            .unwrap_or(0);
        for entry in locations.entries() {
            println!("{:width$}  {}", entry.name, entry.code, width = width);
        }
    }

    Ok(())
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<MileageConfig, MileageCliError> {
    let config = match path {
        Some(path) => MileageConfig::from_file(path)?,
        None => MileageConfig::default(),
    };
    info!(
        reference = %config.reference.path.display(),
        report = %config.report.path.display(),
        "configuration loaded"
    );
    Ok(config)
}

fn read_input(input: &Path) -> Result<String, MileageCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

// Error types

#[derive(Debug, thiserror::Error)]
enum MileageCliError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Mileage(#[from] MileageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("No complete timeclock entries found in input")]
    NoVisits,

    #[error("{0} branch names have no location code")]
    ValidationFailed(usize),

    #[error("One or more health checks failed")]
    DoctorFailed,
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MileageCliError> for CliError {
    fn from(e: MileageCliError) -> Self {
        match e {
            MileageCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MileageCliError::Mileage(e) => mileage_error(e),
            MileageCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            MileageCliError::NoVisits => CliError {
                code: "NO_VISITS".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Paste the whole Timeero mileage listing, including the miles lines"
                        .to_string(),
                ),
            },
            MileageCliError::ValidationFailed(_) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: e.to_string(),
                hint: Some("Add them to the [[branches]] list in the config file".to_string()),
            },
            MileageCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: e.to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn mileage_error(e: MileageError) -> CliError {
    let (code, hint) = match &e {
        MileageError::ParseError { .. } => (
            "PARSE_ERROR",
            Some("The Timeero export layout may have changed; check the reported line"),
        ),
        MileageError::UnknownBranch(_) => (
            "LOOKUP_ERROR",
            Some("Add the branch to the [[branches]] list in the config file"),
        ),
        MileageError::MissingDistance { .. } => (
            "LOOKUP_ERROR",
            Some("Fill in the missing cell of the mileage chart"),
        ),
        MileageError::ReferenceTable(_) | MileageError::Csv(_) => (
            "REFERENCE_ERROR",
            Some("Check the mileage chart CSV"),
        ),
        MileageError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
        MileageError::Json(_) => ("JSON_ERROR", None),
        MileageError::Config(_) => ("CONFIG_ERROR", Some("Run 'mileage doctor' for details")),
        MileageError::Report(_) | MileageError::UnsupportedFormat(_) => (
            "REPORT_ERROR",
            Some("Use an .xlsx, .csv or .json output path"),
        ),
    };

    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    lines_read: usize,
    noise_lines: usize,
    visits_parsed: usize,
    groups_discarded: usize,
    trailing_fields: usize,
    zero_duration_visits: usize,
    visits_kept: usize,
    days: usize,
    first_date: Option<String>,
    last_date: Option<String>,
    unknown_branches: Vec<String>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_config_defaults() {
        let (check, config) = check_config(None);

        assert!(matches!(check.status, CheckStatus::Ok));
        assert_eq!(check.message, "Using built-in defaults");
        assert!(config.is_some());
    }

    #[test]
    fn test_check_config_reports_broken_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mileage.toml");
        fs::write(&path, "[parser]\nterminator = \"\"\n").unwrap();

        let (check, config) = check_config(Some(&path));

        assert!(matches!(check.status, CheckStatus::Error));
        assert!(check.message.contains("terminator"));
        assert!(config.is_none());
    }

    #[test]
    fn test_check_config_reports_missing_file() {
        let (check, config) = check_config(Some(Path::new("/nonexistent/mileage.toml")));

        assert!(matches!(check.status, CheckStatus::Error));
        assert!(config.is_none());
    }

    #[test]
    fn test_cli_error_messages() {
        let error = CliError::from(MileageCliError::ValidationFailed(2));
        assert_eq!(error.code, "VALIDATION_FAILED");
        assert_eq!(error.message, "2 branch names have no location code");
        assert!(error.hint.is_some());

        let error = CliError::from(MileageCliError::from(MileageError::UnknownBranch(
            "Airport Annex".to_string(),
        )));
        assert_eq!(error.code, "LOOKUP_ERROR");
        assert!(error.message.contains("Airport Annex"));

        let error = CliError::from(MileageCliError::NoVisits);
        assert_eq!(error.code, "NO_VISITS");
        assert_eq!(error.message, MileageCliError::NoVisits.to_string());
    }
}
