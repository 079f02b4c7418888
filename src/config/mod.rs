//! Configuration module for Schedule-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use schedule_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting {} with {} workers", config.quarter.code, config.database.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CatalogConfig, Config, DatabaseConfig, QuarterConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
