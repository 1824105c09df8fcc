mod registry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use uuid::Uuid;

use registry::{RunMeta, init_run_logging, start_run, write_report};
use tapigen_config::{
    ConfigError, OperationKind, PolicyResolver, RunOverrides, SettingsSource, resolve_policy,
};
use tapigen_core::{Error as CoreError, load_snapshot, snapshot_fingerprint, snapshot_json_schema};
use tapigen_generate::{
    ArtifactKind, FileLedger, GenerationEngine, GenerationError, OutputWriter, RunContext,
    TableSelection,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("snapshot error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Parser, Debug)]
#[command(name = "tapigen", version, about = "Table API generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate packages, triggers and views into the staging directory.
    Generate(GenerateArgs),
    /// Print the JSON Schema of the metadata snapshot format.
    Schema,
    /// Inspect or edit the file control ledger.
    #[command(subcommand)]
    Ledger(LedgerCommand),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Settings file.
    #[arg(long, default_value = "config/tapigen.toml")]
    config: PathBuf,
    /// Metadata snapshot JSON.
    #[arg(long)]
    snapshot: PathBuf,
    /// Comma separated table names, or `%` for every table of the table owner.
    #[arg(long, default_value = "%")]
    tables: String,
    /// Operation kinds to generate (comma separated).
    #[arg(long, value_delimiter = ',')]
    api_types: Option<Vec<OperationKind>>,
    #[arg(long)]
    table_owner: Option<String>,
    #[arg(long)]
    package_owner: Option<String>,
    #[arg(long)]
    trigger_owner: Option<String>,
    #[arg(long)]
    view_owner: Option<String>,
    #[arg(long)]
    tapi_author: Option<String>,
    #[arg(long)]
    app_name: Option<String>,
    #[arg(long)]
    staging_dir: Option<PathBuf>,
    #[arg(long)]
    templates_dir: Option<PathBuf>,
    /// Output directory for run records.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
}

#[derive(Args, Debug)]
struct LedgerTarget {
    /// Settings file used to locate the ledger.
    #[arg(long, default_value = "config/tapigen.toml")]
    config: PathBuf,
    /// Ledger path; overrides `file_controls.ledger_path`.
    #[arg(long)]
    ledger: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct LedgerRow {
    #[command(flatten)]
    target: LedgerTarget,
    schema: String,
    table: String,
    /// package, trigger or view.
    artifact: ArtifactKind,
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Print every ledger row.
    List(LedgerTarget),
    /// Allow regeneration of an artifact.
    Enable(LedgerRow),
    /// Protect an artifact from regeneration.
    Disable(LedgerRow),
}

fn main() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Schema => {
            let schema = snapshot_json_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Ledger(command) => run_ledger(command),
    }
}

fn run_generate(args: GenerateArgs) -> Result<ExitCode, CliError> {
    let overrides = RunOverrides {
        api_types: args.api_types,
        table_owner: args.table_owner,
        package_owner: args.package_owner,
        trigger_owner: args.trigger_owner,
        view_owner: args.view_owner,
        tapi_author: args.tapi_author,
        app_name: args.app_name,
        staging_dir: args.staging_dir,
        templates_dir: args.templates_dir,
    };
    let settings = SettingsSource::load(&args.config)?;
    let policy = resolve_policy(&settings, &overrides)?;

    let snapshot = load_snapshot(&args.snapshot)?;
    let fingerprint = snapshot_fingerprint(&snapshot)?;
    let run = RunContext::new(&policy);

    let meta = RunMeta {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        run_dir: args.run_dir,
        settings_path: args.config,
        snapshot_path: args.snapshot,
        snapshot_fingerprint: fingerprint,
        tables: args.tables,
        sentinel_mode: run.sentinel.mode().to_string(),
    };
    let run_paths = start_run(&meta, &policy)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %meta.run_id,
        snapshot = %meta.snapshot_path.display(),
        fingerprint = %meta.snapshot_fingerprint
    );
    let timer = Instant::now();

    let selection = TableSelection::parse(&meta.tables);
    let writer = OutputWriter::new(&policy.files.staging_dir)?;
    let mut ledger = FileLedger::open(&policy.files.ledger_path)?;
    let engine = GenerationEngine::new(policy, run)?;

    let report = match engine.run(&snapshot, &selection, &mut ledger, &writer, &meta.run_id) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(event = "run_finished", status = "aborted", error = %err);
            return Err(err.into());
        }
    };
    write_report(&run_paths, &report)?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    let status = if report.is_success() { "success" } else { "failed" };
    tracing::info!(
        event = "run_finished",
        status = status,
        units_written = report.units_written,
        warnings = report.warnings.len(),
        errors = report.errors.len(),
        duration_ms = timer.elapsed().as_millis() as u64
    );

    println!(
        "{} units written, {} warnings, {} errors ({})",
        report.units_written,
        report.warnings.len(),
        report.errors.len(),
        run_paths.root.display()
    );
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_ledger(command: LedgerCommand) -> Result<ExitCode, CliError> {
    match command {
        LedgerCommand::List(target) => {
            let ledger = FileLedger::open(&ledger_path(&target)?)?;
            println!("schema_name,table_name,artifact,generate");
            for entry in ledger.entries() {
                println!(
                    "{},{},{},{}",
                    entry.schema_name, entry.table_name, entry.artifact, entry.generate
                );
            }
        }
        LedgerCommand::Enable(row) => set_ledger_row(row, true)?,
        LedgerCommand::Disable(row) => set_ledger_row(row, false)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn set_ledger_row(row: LedgerRow, generate: bool) -> Result<(), CliError> {
    let path = ledger_path(&row.target)?;
    let mut ledger = FileLedger::open(&path)?;
    ledger.set(&row.schema, &row.table, row.artifact, generate)?;
    println!(
        "{}.{} {} generate={generate} ({})",
        row.schema,
        row.table,
        row.artifact,
        path.display()
    );
    Ok(())
}

/// The ledger location without resolving the full policy, so owners need not be set.
fn ledger_path(target: &LedgerTarget) -> Result<PathBuf, CliError> {
    if let Some(path) = &target.ledger {
        return Ok(path.clone());
    }
    let settings = if target.config.exists() {
        SettingsSource::load(&target.config)?
    } else {
        SettingsSource::default()
    };
    let resolver = PolicyResolver::new(&settings, &RunOverrides::default());
    resolver
        .lookup("file_controls", "ledger_path")
        .map(|(value, _)| Path::new(value.trim()).to_path_buf())
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or_else(|| CliError::InvalidArgument("file_controls.ledger_path is empty".to_string()))
}
