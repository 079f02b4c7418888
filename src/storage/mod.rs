//! Storage module for the relational course catalog
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - A bounded pool of connections shared by write workers
//! - Atomic execution of per-record write plans
//! - Scrape run tracking

mod pool;
mod schema;
mod sqlite;
mod traits;

pub use pool::{ConnectionPool, PooledConnection};
pub use schema::TABLES;
pub use sqlite::SqliteStore;
pub use traits::{RecordStore, StoreError, StoreResult, Subject};

use std::path::Path;

/// Opens the store at `path` with one connection per write worker
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `workers` - Number of write workers that will share the store
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully opened store
/// * `Err(StoreError)` - Failed to open or initialize the database
pub fn open_store(path: &Path, workers: usize) -> StoreResult<SqliteStore> {
    SqliteStore::open(path, workers)
}

/// Represents a scrape run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub quarter_code: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub tally: RunTally,
}

/// Outcome counts of a scrape run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    /// Records persisted
    pub written: usize,
    /// Records whose write failed
    pub failed: usize,
    /// Blocks the classifier rejected
    pub rejected: usize,
}

/// Status of a scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
