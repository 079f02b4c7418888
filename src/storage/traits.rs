//! Storage traits and error types
//!
//! This module defines the seam between the write coordinator and the
//! relational store, so that tests can substitute their own store.

use crate::ingest::WritePlan;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to open database {path}: {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection pool needs at least one connection")]
    EmptyPool,

    #[error("Unknown quarter: {0}")]
    UnknownQuarter(String),

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    #[error("Write plan out of order: {0}")]
    MalformedPlan(&'static str),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

impl StoreError {
    /// Whether the failure is about reaching the store rather than the data
    ///
    /// The store never retries by itself; callers decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Open { .. } | Self::Io(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A subject as listed by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub code: String,
    pub name: String,
}

impl Subject {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Trait for relational store implementations
///
/// Implementations must be shareable across worker threads; each call to
/// [`RecordStore::apply`] is one atomic unit.
pub trait RecordStore: Send + Sync {
    /// Creates the quarter if absent and returns its id; never overwrites
    fn register_quarter(&self, code: &str, name: &str) -> StoreResult<i64>;

    /// Creates every subject that is absent; returns how many were given
    fn register_subjects(&self, subjects: &[Subject]) -> StoreResult<usize>;

    /// Truncates the scrape-scoped tables
    ///
    /// Quarters, subjects and courses are kept.
    fn reset(&self) -> StoreResult<()>;

    /// Executes a write plan in a single transaction
    ///
    /// On any failure nothing from the plan is kept.
    fn apply(&self, plan: &WritePlan) -> StoreResult<()>;
}
