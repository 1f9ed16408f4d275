//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use skumap_core::pipeline::{ProgressReporter, UploadConfig, UploadResult, process_upload};
use skumap_resolver::{Resolution, Resolver};
use skumap_shared::{
    AppConfig, FileId, database_path, init_config, load_config, load_config_from, validate_sweep,
};
use skumap_storage::Storage;
use skumap_sweep::{SweepOptions, policy_from_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Resolve seller SKUs to canonical MSKUs.
#[derive(Parser, Debug)]
#[command(
    name = "skumap",
    version,
    about = "Resolve seller SKUs (including combo SKUs) to canonical MSKUs across CSV and XLSX uploads.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.skumap/skumap.toml.
    #[arg(long, global = true, env = "SKUMAP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Process CSV or XLSX uploads: resolve every SKU column and record samples.
    Process {
        /// Files to process.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Do not record results in the database.
        #[arg(long)]
        no_db: bool,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Look up a single SKU.
    Lookup {
        /// SKU to resolve.
        sku: String,
    },

    /// Resolve a combo SKU component by component.
    Combo {
        /// Combo SKU, components joined by '-'.
        sku: String,

        /// Fail if any component is unmapped.
        #[arg(long)]
        strict: bool,
    },

    /// Interactive session: process uploads, look up SKUs, and reload
    /// mappings without restarting.
    Shell {
        /// Do not record results in the database.
        #[arg(long)]
        no_db: bool,
    },

    /// Show recently processed files and their sample mappings.
    Results {
        /// Number of files to show.
        #[arg(short, long, default_value = "10")]
        limit: u32,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Database operations.
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Database subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum DbAction {
    /// Show processed file and mapping counts.
    Status,
    /// Delete a processed file and its sample mappings.
    Delete {
        /// Processed file ID (as shown by `skumap results`).
        id: String,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "skumap=info",
        1 => "skumap=debug",
        _ => "skumap=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = load_app_config(cli.config.as_deref())?;

    match cli.command {
        Command::Process { files, no_db, json } => cmd_process(&config, files, no_db, json).await,
        Command::Shell { no_db } => {
            crate::shell::run_shell(&config, cli.config.as_deref(), no_db).await
        }
        Command::Lookup { sku } => cmd_lookup(&config, &sku),
        Command::Combo { sku, strict } => cmd_combo(&config, &sku, strict),
        Command::Results { limit, json } => cmd_results(&config, limit, json).await,
        Command::Db { action } => match action {
            DbAction::Status => cmd_db_status(&config).await,
            DbAction::Delete { id } => cmd_db_delete(&config, &id).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Load `--config` if given, else `~/.skumap/skumap.toml` (or defaults).
pub(crate) fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Build the resolver from the config's `[mappings]` table.
pub(crate) fn build_resolver(config: &AppConfig) -> Result<Resolver> {
    let resolver = Resolver::load(config.mappings.clone())?;
    info!(entries = resolver.len(), "mapping table loaded");
    Ok(resolver)
}

pub(crate) fn show_resolution(resolution: &Resolution) -> &str {
    resolution.as_deref().unwrap_or("<unmapped>")
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_process(config: &AppConfig, files: Vec<PathBuf>, no_db: bool, json: bool) -> Result<()> {
    let result = run_upload(config, files, no_db, &CliProgress::new()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_upload(&result);
    Ok(())
}

/// Sweep `files` with the configured table and policy, recording them in the
/// database unless `no_db` is set or the database cannot be opened.
async fn run_upload(
    config: &AppConfig,
    files: Vec<PathBuf>,
    no_db: bool,
    progress: &dyn ProgressReporter,
) -> Result<UploadResult> {
    validate_sweep(&config.sweep)?;
    let resolver = build_resolver(config)?;
    let policy = policy_from_config(&config.sweep)?;

    let storage = if no_db {
        None
    } else {
        open_storage_or_skip(&database_path(config)?).await
    };

    let upload = UploadConfig {
        files,
        sweep: SweepOptions::from(&config.sweep),
    };

    let result = process_upload(
        &upload,
        &resolver,
        policy.as_ref(),
        storage.as_ref(),
        progress,
    )
    .await?;
    Ok(result)
}

/// Open the read-write database. A database that cannot be opened is not
/// fatal: uploads still run and report `db_saved: false`.
pub(crate) async fn open_storage_or_skip(path: &Path) -> Option<Storage> {
    match Storage::open(path).await {
        Ok(storage) => Some(storage),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "database unavailable, results will not be saved"
            );
            None
        }
    }
}

pub(crate) fn print_upload(result: &UploadResult) {
    println!();
    println!("  {}", result.message());
    for file in &result.files {
        println!();
        println!("  File:     {}", file.filename);
        println!("  Rows:     {}", file.total_rows);
        println!("  Columns:  {} ({})", file.columns_count, file.columns.join(", "));
        for report in &file.swept {
            println!(
                "  {:<20} -> {:<24} mapped {:>6}  unmapped {:>6}",
                report.source, report.derived, report.mapped, report.unmapped
            );
        }
        for sample in &file.samples {
            println!(
                "    {:<20} {:<24} {}",
                sample.column,
                sample.original.to_string(),
                sample.resolved.as_deref().unwrap_or("Not Mapped")
            );
        }
        println!("  Saved:    {}", if file.db_saved { "yes" } else { "no" });
    }
    for skipped in &result.skipped {
        println!("  Skipped:  {} ({})", skipped.path.display(), skipped.reason);
    }
    println!("  Time:     {:.2}s", result.elapsed.as_secs_f64());
    println!();
}

fn cmd_lookup(config: &AppConfig, sku: &str) -> Result<()> {
    let resolver = build_resolver(config)?;
    println!("{sku} -> {}", show_resolution(&resolver.lookup(sku)));
    Ok(())
}

fn cmd_combo(config: &AppConfig, sku: &str, strict: bool) -> Result<()> {
    let resolver = build_resolver(config)?;
    let combo = resolver.resolve_combo(sku);

    for part in &combo.parts {
        println!("{} -> {}", part.token, show_resolution(&part.resolution));
    }

    if strict && !combo.is_complete() {
        return Err(eyre!(
            "{} of {} components of '{sku}' are not mapped",
            combo.unmapped_count(),
            combo.len()
        ));
    }
    Ok(())
}

async fn cmd_results(config: &AppConfig, limit: u32, json: bool) -> Result<()> {
    let storage = Storage::open_readonly(&database_path(config)?).await?;
    let files = storage.list_processed_files(limit).await?;

    let mut report = Vec::with_capacity(files.len());
    for file in files {
        let mappings = storage.mappings_for_file(&file.id).await?;
        report.push((file, mappings));
    }

    if json {
        let value: Vec<_> = report
            .iter()
            .map(|(file, mappings)| serde_json::json!({ "file": file, "mappings": mappings }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if report.is_empty() {
        println!("No processed files yet.");
        return Ok(());
    }

    for (file, mappings) in &report {
        println!();
        println!(
            "  {}  {}  ({} rows, {} columns)  {}",
            file.processed_at.format("%Y-%m-%d %H:%M:%S"),
            file.filename,
            file.total_rows,
            file.columns_count,
            file.id
        );
        for m in mappings {
            println!(
                "    {:<20} {:<24} {}",
                m.source_column,
                m.original_sku,
                m.mapped_msku.as_deref().unwrap_or("Not Mapped")
            );
        }
    }
    println!();
    Ok(())
}

async fn cmd_db_status(config: &AppConfig) -> Result<()> {
    let path = database_path(config)?;
    match Storage::open_readonly(&path).await {
        Ok(storage) => match storage.status().await {
            Ok(status) => {
                println!("status:          connected");
                println!("database:        {}", path.display());
                println!("files processed: {}", status.files_processed);
                println!("sku mappings:    {}", status.sku_mappings);
            }
            Err(e) => {
                info!(error = %e, "status query failed");
                println!("status: tables_not_created");
            }
        },
        Err(e) => {
            info!(error = %e, "database unavailable");
            println!("status: not_connected ({})", path.display());
        }
    }
    Ok(())
}

async fn cmd_db_delete(config: &AppConfig, id: &str) -> Result<()> {
    let id: FileId = id
        .parse()
        .map_err(|e| eyre!("invalid processed file ID '{id}': {e}"))?;
    let storage = Storage::open(&database_path(config)?).await?;

    let Some(file) = storage.get_processed_file(&id).await? else {
        return Err(eyre!("no processed file with ID {id}"));
    };
    storage.delete_processed_file(&id).await?;
    println!("Deleted {} ({})", file.filename, id);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_processed(&self, filename: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processed [{current}/{total}] {filename}"));
    }

    fn done(&self, _result: &UploadResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skumap_core::pipeline::SilentProgress;

    #[test]
    fn parses_process_command() {
        let cli = Cli::try_parse_from(["skumap", "-vv", "process", "a.csv", "b.csv", "--no-db"])
            .expect("parse");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Process { files, no_db, json } => {
                assert_eq!(files, vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]);
                assert!(no_db);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn process_requires_files() {
        assert!(Cli::try_parse_from(["skumap", "process"]).is_err());
    }

    #[test]
    fn parses_combo_strict() {
        let cli = Cli::try_parse_from(["skumap", "combo", "pen-blue-pen-blue2", "--strict"])
            .expect("parse");
        match cli.command {
            Command::Combo { sku, strict } => {
                assert_eq!(sku, "pen-blue-pen-blue2");
                assert!(strict);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_global_config_flag() {
        let cli = Cli::try_parse_from([
            "skumap",
            "lookup",
            "pen",
            "--config",
            "/tmp/skumap.toml",
            "--log-format",
            "json",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/skumap.toml")));
        assert!(matches!(cli.log_format, LogFormat::Json));
    }

    #[test]
    fn parses_db_status_and_results() {
        let cli = Cli::try_parse_from(["skumap", "db", "status"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::Db {
                action: DbAction::Status
            }
        ));

        let cli = Cli::try_parse_from(["skumap", "results", "-l", "3"]).expect("parse");
        assert!(matches!(cli.command, Command::Results { limit: 3, json: false }));
    }

    #[test]
    fn parses_shell_and_db_delete() {
        let cli = Cli::try_parse_from(["skumap", "shell", "--no-db"]).expect("parse");
        assert!(matches!(cli.command, Command::Shell { no_db: true }));

        let cli = Cli::try_parse_from(["skumap", "db", "delete", "0190-abc"]).expect("parse");
        match cli.command {
            Command::Db {
                action: DbAction::Delete { id },
            } => assert_eq!(id, "0190-abc"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skumap_cli_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    fn config_with_db(path: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.path = Some(path.display().to_string());
        config
    }

    #[tokio::test]
    async fn upload_survives_unopenable_database() {
        let dir = temp_dir();
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "a regular file").expect("blocker file");
        let csv = dir.join("orders.csv");
        std::fs::write(&csv, "SKU\npen\nzzz\n").expect("csv");

        let config = config_with_db(&blocker.join("skumap.db"));
        let result = run_upload(&config, vec![csv], false, &SilentProgress)
            .await
            .expect("upload is not aborted");

        assert_eq!(result.files.len(), 1);
        let file = &result.files[0];
        assert!(!file.db_saved);
        assert!(file.file_id.is_none());
        assert_eq!(file.samples.len(), 2);
        assert_eq!(file.samples[0].resolved.as_deref(), Some("cste-pen"));
    }

    #[tokio::test]
    async fn upload_records_then_delete_removes() {
        let dir = temp_dir();
        let db = dir.join("skumap.db");
        let csv = dir.join("orders.csv");
        std::fs::write(&csv, "SKU\npen\n").expect("csv");

        let config = config_with_db(&db);
        let result = run_upload(&config, vec![csv], false, &SilentProgress)
            .await
            .expect("upload");
        let id = result.files[0].file_id.clone().expect("saved");

        cmd_db_delete(&config, &id.to_string()).await.expect("delete");
        let storage = Storage::open_readonly(&db).await.expect("open");
        assert!(storage.get_processed_file(&id).await.expect("get").is_none());

        assert!(cmd_db_delete(&config, &id.to_string()).await.is_err());
        assert!(cmd_db_delete(&config, "not-a-uuid").await.is_err());
    }

    #[test]
    fn combo_strict_fails_on_unmapped() {
        let config = AppConfig::default();
        assert!(cmd_combo(&config, "pen-blue-pen-blue2", true).is_ok());
        assert!(cmd_combo(&config, "pen-nope", true).is_err());
        assert!(cmd_combo(&config, "pen-nope", false).is_ok());
    }
}
