//! Schedule-Harvest main entry point
//!
//! This is the command-line interface for the Schedule-Harvest catalog harvester.

use anyhow::Context;
use clap::Parser;
use schedule_harvest::config::{load_config_with_hash, Config};
use schedule_harvest::crawler::run_harvest;
use schedule_harvest::output::{load_statistics, print_outcome, print_statistics};
use schedule_harvest::storage::{open_store, RecordStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Schedule-Harvest: a course-schedule catalog harvester
///
/// Schedule-Harvest fetches every schedule page of a quarter, classifies
/// the course blocks into section, general and dated meetings, and stores
/// them in a SQLite catalog. Each run resets the quarter's scrape data first.
#[derive(Parser, Debug)]
#[command(name = "schedule-harvest")]
#[command(version)]
#[command(about = "A course-schedule catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with_all = ["stats", "reset_only"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "reset_only"])]
    stats: bool,

    /// Clear offerings, section groups and meetings, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    reset_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.reset_only {
        handle_reset(&config)?;
    } else {
        handle_harvest(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("schedule_harvest=info,warn"),
            1 => EnvFilter::new("schedule_harvest=debug,info"),
            2 => EnvFilter::new("schedule_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Schedule-Harvest Dry Run ===\n");

    println!("Catalog:");
    println!("  Base URL: {}", config.catalog.base_url);
    println!(
        "  Max concurrent pages: {}",
        config.catalog.max_concurrent_pages
    );
    println!("  Request timeout: {}s", config.catalog.request_timeout_secs);
    println!("  User agent: {}", config.catalog.user_agent);

    println!("\nDatabase:");
    println!("  Path: {}", config.database.path);
    println!("  Write workers: {}", config.database.workers);

    println!("\nQuarter:");
    println!("  {} ({})", config.quarter.code, config.quarter.name);
    if config.quarter.subjects.is_empty() {
        println!("  Subjects: every subject in the catalog");
    } else {
        println!("  Subjects: {}", config.quarter.subjects.join(", "));
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.database.path);

    let store = open_store(Path::new(&config.database.path), 1)?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --reset-only mode
fn handle_reset(config: &Config) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.database.path), 1)?;
    store.reset()?;
    println!("✓ Scrape data cleared from {}", config.database.path);
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} from {} with {} write workers",
        config.quarter.code,
        config.catalog.base_url,
        config.database.workers
    );

    let outcome = run_harvest(config, config_hash)
        .await
        .context("Harvest failed")?;
    print_outcome(&outcome);

    Ok(())
}
