//! Crawler module for harvesting the schedule catalog
//!
//! This module contains the fetching side of the harvester, including:
//! - HTTP access to the subject list and schedule pages
//! - HTML parsing into raw table rows and page counts
//! - Bounded-concurrency page harvesting feeding the write queue
//! - Overall run orchestration

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{HarvestTally, Harvester};
pub use fetcher::{build_http_client, CatalogClient};
pub use parser::{parse_schedule_page, parse_subject_list, SchedulePage};

use crate::config::Config;
use crate::ingest::{WriteCoordinator, WriteReport};
use crate::storage::{open_store, RecordStore, RunStatus, RunTally, SqliteStore, Subject};
use crate::{HarvestError, Result};
use std::path::Path;
use std::sync::Arc;

/// What a completed run did
#[derive(Debug)]
pub struct HarvestOutcome {
    pub run_id: i64,
    pub harvest: HarvestTally,
    pub writes: WriteReport,
}

impl HarvestOutcome {
    pub fn tally(&self) -> RunTally {
        RunTally {
            written: self.writes.written,
            failed: self.writes.failed_count(),
            rejected: self.harvest.rejected,
        }
    }
}

/// Runs a complete harvest of the configured quarter
///
/// This is the main entry point for a run. It will:
/// 1. Open the store and record the run
/// 2. Register the quarter and the catalog's subjects
/// 3. Reset the scrape-scoped tables
/// 4. Fetch, classify and write every page of every selected subject
/// 5. Record the run's outcome
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Fingerprint of the configuration file, stored with the run
pub async fn run_harvest(config: &Config, config_hash: &str) -> Result<HarvestOutcome> {
    let store = Arc::new(open_store(
        Path::new(&config.database.path),
        config.database.workers as usize,
    )?);

    let run_id = store.start_run(&config.quarter.code, config_hash)?;
    tracing::info!("Starting run {} for {}", run_id, config.quarter.code);

    match harvest_into(&store, config).await {
        Ok((harvest, writes)) => {
            let outcome = HarvestOutcome {
                run_id,
                harvest,
                writes,
            };
            store.finish_run(run_id, RunStatus::Completed, &outcome.tally())?;
            Ok(outcome)
        }
        Err(e) => Err(record_failure(&store, run_id, e)),
    }
}

/// Marks a run failed and hands back the error that failed it
///
/// A ledger update that also fails is logged; the harvest error wins.
fn record_failure(store: &SqliteStore, run_id: i64, error: HarvestError) -> HarvestError {
    tracing::error!("Run {} failed: {}", run_id, error);
    if let Err(ledger) = store.finish_run(run_id, RunStatus::Failed, &RunTally::default()) {
        tracing::warn!("Could not mark run {} as failed: {}", run_id, ledger);
    }
    error
}

async fn harvest_into(
    store: &Arc<SqliteStore>,
    config: &Config,
) -> Result<(HarvestTally, WriteReport)> {
    let quarter = &config.quarter;
    store.register_quarter(&quarter.code, &quarter.name)?;

    let client = CatalogClient::new(&config.catalog)?;
    let subjects = client.fetch_subjects(&quarter.code).await?;
    let registered = store.register_subjects(&subjects)?;
    tracing::info!("Catalog lists {} subjects", registered);

    let selected = select_subjects(subjects, &quarter.subjects);
    tracing::info!("Harvesting {} subjects", selected.len());

    let coordinator =
        WriteCoordinator::new(Arc::clone(store), config.database.workers as usize);
    let session = coordinator.begin().await?;
    let writer = session.writer();
    let sender = writer.sender();

    let harvester = Harvester::new(client, config.catalog.max_concurrent_pages as usize);
    let harvested = harvester
        .harvest_quarter(&quarter.code, &selected, &sender)
        .await;
    drop(sender);

    // Drain the queue even when harvesting stopped early
    let writes = writer.finish().await?;
    Ok((harvested?, writes))
}

/// Keeps the allow-listed subjects, or all of them when the list is empty
fn select_subjects(subjects: Vec<Subject>, allow: &[String]) -> Vec<Subject> {
    if allow.is_empty() {
        return subjects;
    }

    for code in allow {
        if !subjects.iter().any(|s| &s.code == code) {
            tracing::warn!("Subject {} is not offered this quarter", code);
        }
    }

    subjects
        .into_iter()
        .filter(|s| allow.contains(&s.code))
        .collect()
}
