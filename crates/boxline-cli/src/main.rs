//! Boxline CLI
//!
//! - `import`: reconcile a container spreadsheet against a snapshot store
//! - `index`: show the normalized identifier → resource table of a store
//! - `normalize`: show the key a spreadsheet identifier resolves through

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boxline_import::normalize::normalize_identifier;
use boxline_import::{run_import_file, ImportConfig, ImportMode, ResourceIndex};
use boxline_store::SnapshotStore;

#[derive(Parser)]
#[command(name = "boxline")]
#[command(
    author,
    version,
    about = "Boxline: load box and barcode spreadsheets into an archival record store"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a container spreadsheet.
    ///
    /// Values come from `--config` (JSON) when given; flags override them.
    Import(ImportArgs),

    /// Print the resource index of a store, sorted by key.
    Index {
        /// Snapshot file of the record store
        #[arg(long)]
        store: PathBuf,
    },

    /// Print the normalized key of each identifier.
    Normalize {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Snapshot file of the record store (created if missing)
    #[arg(long)]
    store: PathBuf,

    /// JSON run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Container spreadsheet
    #[arg(long)]
    csv: Option<PathBuf>,

    /// batch | incremental
    #[arg(long)]
    mode: Option<ImportMode>,

    /// Progress report file
    #[arg(long)]
    status: Option<PathBuf>,

    /// Complaint file
    #[arg(long)]
    errors: Option<PathBuf>,

    /// Actor recorded against every write
    #[arg(long)]
    user: Option<String>,

    /// Do not echo the report streams to the console
    #[arg(long)]
    quiet: bool,
}

impl ImportArgs {
    fn resolve_config(&self) -> Result<ImportConfig> {
        let mut config = match &self.config {
            Some(path) => ImportConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ImportConfig::default(),
        };
        if let Some(csv) = &self.csv {
            config.csv_path = csv.clone();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(status) = &self.status {
            config.status_path = status.clone();
        }
        if let Some(errors) = &self.errors {
            config.error_path = errors.clone();
        }
        if let Some(user) = &self.user {
            config.username = user.clone();
        }
        if self.quiet {
            config.mirror_to_console = false;
        }
        Ok(config)
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Import(args) => cmd_import(&args),
        Commands::Index { store } => cmd_index(&store),
        Commands::Normalize { identifiers } => {
            cmd_normalize(&identifiers);
            Ok(())
        }
    }
}

fn cmd_import(args: &ImportArgs) -> Result<()> {
    let config = args.resolve_config()?;
    tracing::debug!(?config, "resolved import config");
    let store = SnapshotStore::open(&args.store)
        .with_context(|| format!("opening store {}", args.store.display()))?;

    eprintln!(
        "{} {} ({} mode) into {}",
        "Importing".green().bold(),
        config.csv_path.display(),
        config.mode.as_str(),
        store.snapshot_path().display()
    );
    let summary = run_import_file(&store, &config)
        .with_context(|| format!("import of {} failed", config.csv_path.display()))?;

    eprintln!("{} {summary}", "ok".green().bold());
    if summary.rows_skipped() > 0 || summary.update_failures > 0 {
        eprintln!(
            "{} {} skipped, {} failed updates; see {}",
            "info:".yellow().bold(),
            summary.rows_skipped(),
            summary.update_failures,
            config.error_path.display()
        );
    }
    Ok(())
}

fn cmd_index(store_path: &Path) -> Result<()> {
    let store = SnapshotStore::open(store_path)
        .with_context(|| format!("opening store {}", store_path.display()))?;
    let index = ResourceIndex::build(&store)?;

    if index.is_empty() {
        eprintln!("{} no resources in {}", "info:".yellow().bold(), store_path.display());
        return Ok(());
    }
    for (key, resource) in index.entries() {
        println!(
            "{}\t{}\t{}",
            key.bold(),
            resource.id,
            format!("repo {}", resource.repo_id).as_str().dimmed()
        );
    }
    Ok(())
}

fn cmd_normalize(identifiers: &[String]) {
    for raw in identifiers {
        println!("{raw}\t{}", normalize_identifier(raw));
    }
}
