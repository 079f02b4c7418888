//! Schedule-Harvest: a course-schedule catalog harvester
//!
//! This crate fetches a university's schedule-of-classes pages, classifies
//! the table rows into course, section-group and meeting records, and stores
//! them in a relational catalog.

pub mod config;
pub mod crawler;
pub mod ingest;
pub mod output;
pub mod schedule;
pub mod storage;

use thiserror::Error;

/// Main error type for Schedule-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Malformed subject list: {0}")]
    SubjectList(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Write worker failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Schedule-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use schedule::{classify, group_blocks, CourseMeetingRecord, MeetingRecord, RawRow, RowOrigin};
pub use storage::{RecordStore, SqliteStore};
