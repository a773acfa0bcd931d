use anyhow::{Context, Result};
use auditsheet_core::session::{FileFailure, parse_batch};
use auditsheet_core::settings::DEFAULT_SETTINGS_FILE;
use auditsheet_core::store::{self, FileStore};
use auditsheet_core::{AuditParser, AuditSession, ColumnConfig, Settings, SourceFile};
use clap::{Parser, Subcommand};
use colored::*;
use log::LevelFilter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "auditcli")]
#[command(about = "Import and manage checklist audit spreadsheets", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to settings file (TOML)
    #[arg(short, long, value_name = "SETTINGS", global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the stored column configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Parse checklist files and add them to the collection
    Import {
        /// Excel/ODS files to import
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Keep the successful files when some files of the batch fail
        #[arg(long)]
        accept_partial: bool,
    },
    /// Re-run extraction over every stored file with the current configuration
    Reparse,
    /// List the files of the collection
    List,
    /// Remove every stored file
    Reset,
    /// Export every item of the collection to an XLSX file
    Export {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the stored configuration
    Show,
    /// Store the configuration read from a JSON file
    Set {
        #[arg(value_name = "JSON_FILE")]
        file: PathBuf,
    },
    /// Remove the stored configuration
    Clear,
    /// Store the preset for the legacy checklist template
    Legacy,
    /// Propose a configuration from a workbook's header row
    Suggest {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Store the proposal
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = load_settings(cli.settings.as_deref())?;
    let mut store = FileStore::open(&settings.store_dir)?;
    let parser = AuditParser::with_settings(settings);

    let succeeded = match cli.command {
        Command::Config { action } => {
            run_config(action, &parser, &mut store)?;
            true
        }
        Command::Import {
            files,
            accept_partial,
        } => run_import(&files, accept_partial, &parser, &mut store)?,
        Command::Reparse => {
            let session = load_session(&parser, &store)?;
            println!("Re-parsed {} file(s)", session.files().len());
            !session.files().is_empty()
        }
        Command::List => {
            let session = load_session(&parser, &store)?;
            print_files(&session);
            true
        }
        Command::Reset => {
            store::clear_sources(&mut store)?;
            println!("{}", "✓ Removed every stored file".green());
            true
        }
        Command::Export { output } => {
            let session = load_session(&parser, &store)?;
            auditsheet_core::writer::export_items(session.files(), &output)?;
            let items: usize = session.files().iter().map(|f| f.items.len()).sum();
            println!("{} {} items to {}", "✓ Exported".green(), items, output.display());
            !session.files().is_empty()
        }
    };

    std::process::exit(if succeeded { 0 } else { 1 });
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
    // RUST_LOG still wins when set
    builder.parse_default_env();
    builder.init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    if let Some(path) = path {
        return Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()));
    }

    // Try to load default settings from current directory if it exists
    let default_path = PathBuf::from(DEFAULT_SETTINGS_FILE);
    if default_path.exists() {
        Settings::from_file(&default_path)
            .with_context(|| format!("Failed to load settings from {}", default_path.display()))
    } else {
        Ok(Settings::default())
    }
}

fn run_config(action: ConfigAction, parser: &AuditParser, store: &mut FileStore) -> Result<()> {
    match action {
        ConfigAction::Show => match store::load_column_config(&*store)? {
            Some(config) => println!("{}", config.to_json()?),
            None => println!("{}", "No column configuration stored".yellow()),
        },
        ConfigAction::Set { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let config = ColumnConfig::from_json(&json)
                .with_context(|| format!("Invalid column configuration in {}", file.display()))?;
            save_config(store, &config)?;
        }
        ConfigAction::Clear => {
            store::clear_column_config(store)?;
            println!("{}", "✓ Column configuration cleared".green());
        }
        ConfigAction::Legacy => save_config(store, &ColumnConfig::legacy())?,
        ConfigAction::Suggest { file, save } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            let config = parser
                .suggest_config(&bytes)
                .with_context(|| format!("Failed to inspect {}", file.display()))?;
            println!("{}", config.to_json()?);
            if save {
                save_config(store, &config)?;
            }
        }
    }
    Ok(())
}

fn save_config(store: &mut FileStore, config: &ColumnConfig) -> Result<()> {
    store::save_column_config(store, config)?;
    println!("{}", "✓ Column configuration saved".green());
    // Incomplete configurations are stored so they can be finished later
    if let Err(e) = config.validate() {
        println!("  {} {}", "WARN".yellow().bold(), e);
    }
    Ok(())
}

fn run_import(
    files: &[PathBuf],
    accept_partial: bool,
    parser: &AuditParser,
    store: &mut FileStore,
) -> Result<bool> {
    let config = store::load_column_config(&*store)?;
    let sources = files
        .iter()
        .map(SourceFile::read)
        .collect::<Result<Vec<_>>>()?;

    let outcome = parse_batch(parser, sources, config.as_ref());
    for parsed in &outcome.parsed {
        println!(
            "  {} {} ({} items, {:.2}%)",
            "OK".green().bold(),
            parsed.source.name,
            parsed.audit.items.len(),
            parsed.audit.compliance
        );
    }
    print_failures(&outcome.failures);

    if outcome.is_empty() {
        println!("{}", "No file could be imported".red().bold());
        return Ok(false);
    }
    if outcome.has_failures() && !accept_partial {
        println!(
            "{} batch discarded; re-run with --accept-partial to keep the {} parsed file(s)",
            "Partial failure:".yellow().bold(),
            outcome.parsed.len()
        );
        return Ok(true);
    }

    let mut session = AuditSession::with_sources(store::load_sources(&*store)?);
    let added = session.accept(outcome);
    store::save_sources(store, session.sources())?;
    println!("{} {} file(s)", "✓ Imported".green(), added);
    Ok(true)
}

/// Rebuild the collection from the stored files and configuration
fn load_session(parser: &AuditParser, store: &FileStore) -> Result<AuditSession> {
    let config = store::load_column_config(&*store)?;
    let mut session = AuditSession::with_sources(store::load_sources(&*store)?);
    if session.sources().is_empty() {
        return Ok(session);
    }
    let report = session.reparse(parser, config.as_ref());
    print_failures(&report.failures);
    Ok(session)
}

fn print_failures(failures: &[FileFailure]) {
    for failure in failures {
        println!(
            "  {} {}: {}",
            "ERROR".red().bold(),
            failure.file_name,
            failure.error
        );
    }
}

fn print_files(session: &AuditSession) {
    if session.files().is_empty() {
        println!("{}", "No audits loaded".yellow());
        return;
    }
    for file in session.files() {
        println!("{} {}", "File:".bold(), file.file_name.cyan().bold());
        println!("  Operación: {}", file.operation);
        println!("  Fecha:     {}", file.date.format("%d/%m/%Y"));
        if !file.auditor.is_empty() {
            println!("  Auditor:   {}", file.auditor);
        }
        println!(
            "  Items:     {} ({} cumple, {} parcial, {} no cumple, {} no aplica)",
            file.total_items,
            file.counts.complies,
            file.counts.partial,
            file.counts.fails,
            file.counts.not_applicable
        );
        println!("  {} {:.2}%", "Cumplimiento:".bold(), file.compliance);
    }
}
