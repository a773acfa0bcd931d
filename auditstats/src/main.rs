use anyhow::{Context, Result};
use auditsheet_core::settings::DEFAULT_SETTINGS_FILE;
use auditsheet_core::stats;
use auditsheet_core::store::{self, FileStore};
use auditsheet_core::{AuditFilter, AuditParser, AuditSession, Settings};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::{Path, PathBuf};

mod formatter;

#[derive(Parser)]
#[command(name = "auditstats")]
#[command(about = "Compliance statistics over imported checklist audits")]
#[command(version)]
struct Cli {
    /// Only audits of this operation (case-insensitive)
    #[arg(long, value_name = "NAME")]
    operation: Option<String>,

    /// Only audits by this auditor (case-insensitive)
    #[arg(long, value_name = "NAME")]
    auditor: Option<String>,

    /// Only audits on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    from: Option<NaiveDate>,

    /// Only audits on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    to: Option<NaiveDate>,

    /// Also print the number of audits per day
    #[arg(long)]
    calendar: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Path to settings file (TOML)
    #[arg(short, long, value_name = "SETTINGS")]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = load_settings(cli.settings.as_deref())?;
    let store = FileStore::open(&settings.store_dir)?;
    let parser = AuditParser::with_settings(settings);

    // Rebuild the collection from the stored files
    let config = store::load_column_config(&store)?;
    let mut session = AuditSession::with_sources(store::load_sources(&store)?);
    let mut failures = Vec::new();
    if !session.sources().is_empty() {
        let report = session.reparse(&parser, config.as_ref());
        failures = report.failures;
    }

    let filter = AuditFilter {
        operation: cli.operation,
        auditor: cli.auditor,
        from: cli.from,
        to: cli.to,
    };
    let stats = session.stats(&filter);
    let calendar = cli
        .calendar
        .then(|| stats::calendar(filter.apply(session.files())));

    match cli.format {
        OutputFormat::Human => formatter::print_human(&stats, calendar.as_ref(), &failures),
        OutputFormat::Json => formatter::print_json(&stats, calendar.as_ref(), &failures)?,
    }

    // Stored files that all failed to parse
    let exit_code = if !session.sources().is_empty() && session.files().is_empty() {
        1
    } else {
        0
    };
    std::process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
    builder.parse_default_env();
    builder.init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    if let Some(path) = path {
        return Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()));
    }

    let default_path = PathBuf::from(DEFAULT_SETTINGS_FILE);
    if default_path.exists() {
        Settings::from_file(&default_path)
            .with_context(|| format!("Failed to load settings from {}", default_path.display()))
    } else {
        Ok(Settings::default())
    }
}
