use crate::config::types::{CatalogConfig, Config, DatabaseConfig, QuarterConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for both page concurrency and write workers
const MAX_PARALLELISM: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_database_config(&config.database)?;
    validate_quarter_config(&config.quarter)?;
    Ok(())
}

/// Validates catalog configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use HTTP or HTTPS",
            config.base_url
        )));
    }

    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > MAX_PARALLELISM {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-pages must be between 1 and {}, got {}",
            MAX_PARALLELISM, config.max_concurrent_pages
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates database configuration
fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }

    if config.workers < 1 || config.workers > MAX_PARALLELISM {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_PARALLELISM, config.workers
        )));
    }

    Ok(())
}

/// Validates quarter configuration
fn validate_quarter_config(config: &QuarterConfig) -> Result<(), ConfigError> {
    validate_code("quarter code", &config.code)?;

    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "quarter name cannot be empty".to_string(),
        ));
    }

    for subject in &config.subjects {
        validate_code("subject code", subject)?;
    }

    Ok(())
}

/// Catalog codes are short alphanumeric tokens such as "WI21" or "CSE"
fn validate_code(what: &str, code: &str) -> Result<(), ConfigError> {
    if code.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", what)));
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation(format!(
            "{} must be alphanumeric, got '{}'",
            what, code
        )));
    }

    Ok(())
}
