//! Statistics from the catalog database
//!
//! This module provides functionality for extracting and displaying
//! catalog statistics from the storage layer.

use crate::storage::{RunRecord, SqliteStore};
use crate::Result;

/// Catalog statistics summary
#[derive(Debug, Clone)]
pub struct CatalogStatistics {
    /// Row count of every catalog table, in dependency order
    pub table_counts: Vec<(&'static str, u64)>,

    /// Most recent scrape run, if any
    pub latest_run: Option<RunRecord>,
}

impl CatalogStatistics {
    /// Row count of one table, 0 for unknown tables
    pub fn count(&self, table: &str) -> u64 {
        self.table_counts
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Rows across the three meeting tables
    pub fn total_meetings(&self) -> u64 {
        ["section_meeting", "general_meeting", "dated_meeting"]
            .iter()
            .map(|table| self.count(table))
            .sum()
    }

    /// Wall-clock duration of the latest run, once it has finished
    pub fn latest_run_seconds(&self) -> Option<i64> {
        let run = self.latest_run.as_ref()?;
        let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
        let finished = run
            .finished_at
            .as_deref()?
            .parse::<chrono::DateTime<chrono::Utc>>()
            .ok()?;
        Some((finished - started).num_seconds())
    }
}

/// Loads statistics from storage
///
/// # Returns
///
/// * `Ok(CatalogStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(store: &SqliteStore) -> Result<CatalogStatistics> {
    Ok(CatalogStatistics {
        table_counts: store.table_counts()?,
        latest_run: store.latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Rows by Table:");
    for (table, count) in &stats.table_counts {
        println!("  {:<16} {}", table, count);
    }
    println!("  {:<16} {}", "(all meetings)", stats.total_meetings());
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  Id: {}", run.id);
            println!("  Quarter: {}", run.quarter_code);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(seconds) = stats.latest_run_seconds() {
                println!("  Duration: {}s", seconds);
            }
            println!("  Records written: {}", run.tally.written);
            println!("  Records failed: {}", run.tally.failed);
            println!("  Blocks rejected: {}", run.tally.rejected);
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("No scrape runs recorded"),
    }
}
