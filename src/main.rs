use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qb_reconcile::config::DEFAULT_CONFIG_PATH;
use qb_reconcile::{
    load_season_records, record_run, season_range, setup_database, verify_count, write_csv, Aggregator,
    PipelineConfig,
};

#[derive(Parser)]
#[command(name = "qb-reconcile")]
#[command(about = "Reconcile per-season QB stats, advanced metrics and salaries into one table")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge every season in the range and write the outputs
    Run {
        /// First season (inclusive)
        #[arg(long)]
        from: u16,
        /// Last season (inclusive)
        #[arg(long)]
        to: u16,
        /// TOML config; defaults apply when the file is missing
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Override the configured CSV output
        #[arg(long)]
        out: Option<PathBuf>,
        /// Override the configured SQLite database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Create the qb_season and events tables
    InitDb {
        #[arg(long)]
        db: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qb_reconcile=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_logging();

    match Cli::parse().command {
        Commands::Run { from, to, config, out, db } => run(from, to, &config, out, db),
        Commands::InitDb { db } => init_db(&db),
    }
}

fn run(from: u16, to: u16, config_path: &Path, out: Option<PathBuf>, db: Option<PathBuf>) -> Result<()> {
    let mut config = PipelineConfig::load_or_default(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    if let Some(out) = out {
        config.output_csv = out;
    }
    if db.is_some() {
        config.database = db;
    }

    let seasons = season_range(from, to)?;
    let aggregator = Aggregator::from_config(&config).context("Failed to set up sources")?;

    println!("🏈 QB season reconciliation: {}-{}", from, to);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (table, report) = aggregator
        .aggregate(seasons)
        .context("Season merge failed")?;

    for season in &report.seasons {
        println!("\n📅 {} - {} records", season.season, season.records);
        for join in &season.joins {
            println!("   {}", join.summary());
        }
        for skipped in &season.skipped_sources {
            println!("   {}: not published for this season", skipped);
        }
    }

    let written = write_csv(&table, &config.output_csv)
        .with_context(|| format!("Failed to write {}", config.output_csv.display()))?;
    println!("\n💾 Wrote {} rows to {}", written, config.output_csv.display());

    if let Some(path) = &config.audit_json {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write audit report {}", path.display()))?;
        println!("🗂️  Audit report: {}", path.display());
    }

    if let Some(path) = &config.database {
        let mut conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        setup_database(&conn)?;
        load_season_records(&mut conn, &table)?;
        record_run(&conn, &report)?;
        println!("🗄️  Database now holds {} season rows", verify_count(&conn)?);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {}", report.summary());
    info!(run_id = %report.run_id, "run complete");

    Ok(())
}

fn init_db(path: &Path) -> Result<()> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open database {}", path.display()))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode: {}", path.display());
    Ok(())
}
