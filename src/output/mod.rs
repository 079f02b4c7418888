//! Output module for reporting harvest results
//!
//! This module handles:
//! - Printing the outcome of a harvest run
//! - Loading and printing catalog statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, CatalogStatistics};

use crate::crawler::HarvestOutcome;

/// Prints the tally of a finished run
pub fn print_outcome(outcome: &HarvestOutcome) {
    let harvest = &outcome.harvest;
    let writes = &outcome.writes;

    println!("=== Harvest Run {} ===\n", outcome.run_id);

    println!("Fetching:");
    println!("  Subjects: {}", harvest.subjects);
    println!("  Pages: {}", harvest.pages);
    println!("  Failed pages: {}", harvest.failed_pages);
    println!();

    println!("Classification:");
    println!("  Records: {}", harvest.records);
    println!("  Rejected blocks: {}", harvest.rejected);
    println!();

    println!("Writing:");
    println!("  Written: {}", writes.written);
    println!(
        "  Failed: {} ({} retryable)",
        writes.failed_count(),
        writes.retryable_count()
    );

    if !writes.failed.is_empty() {
        println!();
        println!("Failed Records:");
        for failed in &writes.failed {
            println!("  - {}: {}", failed.label, failed.reason);
        }
    }
}
