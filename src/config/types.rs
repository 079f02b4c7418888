use serde::Deserialize;

/// Main configuration structure for Schedule-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub database: DatabaseConfig,
    pub quarter: QuarterConfig,
}

/// Where and how the schedule catalog is fetched
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Base URL the subject list and schedule pages hang off
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum number of schedule pages fetched at once
    #[serde(rename = "max-concurrent-pages", default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Relational store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,

    /// Number of write workers, which is also the connection pool size
    #[serde(default = "default_workers")]
    pub workers: u32,
}

/// The quarter to harvest
#[derive(Debug, Clone, Deserialize)]
pub struct QuarterConfig {
    /// Term code as used by the catalog (e.g., "WI21")
    pub code: String,

    /// Display name (e.g., "Winter 2021")
    pub name: String,

    /// Subject codes to harvest; empty means every listed subject
    #[serde(default)]
    pub subjects: Vec<String>,
}

fn default_max_concurrent_pages() -> u32 {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("schedule-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_workers() -> u32 {
    8
}
