mod config;
mod server;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use nk_core::ItemKind;
use nk_store::{Store, schema, sweep};

use crate::config::{EngineConfig, Tuning};

#[derive(Parser)]
#[command(name = "nk", about = "proof-of-work note retention engine")]
struct Cli {
    /// Database file path
    #[arg(long, global = true, env = "NK_DB_PATH")]
    db_path: Option<PathBuf>,

    /// TOML config file with engine tuning
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(flatten)]
    tuning: Tuning,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve HTTP ingest and queries, with periodic retention sweeps
    Serve {
        /// Listen port
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },

    /// Run one retention pass and print the report
    Sweep,

    /// Show store and scoring statistics
    Stats,
}

fn db_path(cli: &Cli) -> PathBuf {
    if let Some(path) = &cli.db_path {
        return path.clone();
    }
    std::env::var("NK_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notekeep.db")
}

fn open_store(cli: &Cli) -> Result<Store> {
    let path = db_path(cli);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Store::open(&path).with_context(|| format!("failed to open store at {}", path.display()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = EngineConfig::resolve(cli.config.as_deref(), &cli.tuning)?;

    match &cli.command {
        Commands::Serve { port } => cmd_serve(&cli, engine, *port).await,
        Commands::Sweep => cmd_sweep(&cli, engine),
        Commands::Stats => cmd_stats(&cli, engine),
    }
}

async fn cmd_serve(cli: &Cli, engine: EngineConfig, port: u16) -> Result<()> {
    let store = open_store(cli)?;
    tracing::info!(path = %db_path(cli).display(), "opened store");

    let state = server::AppState::new(store, engine);
    state
        .rehydrate()
        .await
        .context("failed to rehydrate aggregator")?;

    server::run(state, port).await
}

fn cmd_sweep(cli: &Cli, engine: EngineConfig) -> Result<()> {
    let store = open_store(cli)?;
    let report = sweep(&store, &engine.retention_config()).context("sweep failed")?;

    println!("tracked:  {}", report.tracked);
    println!("evicted:  {}", report.evicted);
    println!("capacity: {}", report.capacity);
    Ok(())
}

fn cmd_stats(cli: &Cli, engine: EngineConfig) -> Result<()> {
    let store = open_store(cli)?;
    let db_size = std::fs::metadata(db_path(cli)).map(|m| m.len()).unwrap_or(0);

    println!("notes:     {}", store.count(ItemKind::Note)?);
    println!("reactions: {}", store.count(ItemKind::Reaction)?);
    println!("reports:   {}", store.count(ItemKind::Report)?);
    println!("total:     {}", store.count_all()?);
    println!("capacity:  {}", engine.capacity);
    println!("db_size:   {:.1}MB", db_size as f64 / (1024.0 * 1024.0));
    println!(
        "schema:    {}",
        schema::get_schema_version(store.conn())?.unwrap_or(0)
    );
    Ok(())
}
