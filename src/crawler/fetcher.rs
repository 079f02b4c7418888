//! HTTP fetcher for the schedule catalog
//!
//! This module builds the HTTP client and the two catalog endpoints:
//! - the subject list for a quarter (JSON)
//! - one page of a subject's schedule of classes (HTML)
//!
//! Any non-2xx response is an error. Nothing is retried here.

use crate::config::CatalogConfig;
use crate::crawler::parser::parse_subject_list;
use crate::storage::Subject;
use crate::{HarvestError, Result};
use reqwest::Client;
use std::time::Duration;
use url::Url;

const SUBJECT_LIST_PATH: &str = "subject-list.json";
const SCHEDULE_PATH: &str = "scheduleOfClassesFacultyResult.htm";

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use schedule_harvest::config::CatalogConfig;
/// use schedule_harvest::crawler::build_http_client;
///
/// let config = CatalogConfig {
///     base_url: "https://act.ucsd.edu/scheduleOfClasses".to_string(),
///     max_concurrent_pages: 8,
///     request_timeout_secs: 30,
///     user_agent: "schedule-harvest/0.1".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &CatalogConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for one catalog installation
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    /// Creates a client for the catalog at `config.base_url`
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        // Fail early on a base that cannot take a path
        Url::parse(&config.base_url)?;

        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the subject list for a quarter
    pub fn subject_list_url(&self, quarter_code: &str) -> Result<Url> {
        let url = Url::parse_with_params(
            &format!("{}/{}", self.base_url, SUBJECT_LIST_PATH),
            &[("selectedTerm", quarter_code)],
        )?;
        Ok(url)
    }

    /// URL of one page of a subject's schedule
    ///
    /// The first page is requested without a page parameter.
    pub fn schedule_url(&self, quarter_code: &str, subject_code: &str, page: u32) -> Result<Url> {
        let mut url = Url::parse_with_params(
            &format!("{}/{}", self.base_url, SCHEDULE_PATH),
            &[
                ("selectedSubjects", subject_code),
                ("selectedTerm", quarter_code),
                ("schedOption1", "true"),
                ("schedOption2", "true"),
            ],
        )?;
        if page > 1 {
            url.query_pairs_mut()
                .append_pair("page", &page.to_string());
        }
        Ok(url)
    }

    /// Fetches the subjects offered in a quarter
    pub async fn fetch_subjects(&self, quarter_code: &str) -> Result<Vec<Subject>> {
        let url = self.subject_list_url(quarter_code)?;
        let body = self.get_text(url).await?;
        Ok(parse_subject_list(&body)?)
    }

    /// Fetches the HTML of one schedule page
    pub async fn fetch_schedule_page(
        &self,
        quarter_code: &str,
        subject_code: &str,
        page: u32,
    ) -> Result<String> {
        let url = self.schedule_url(quarter_code, subject_code, page)?;
        self.get_text(url).await
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| HarvestError::Http {
                url: url.to_string(),
                source,
            })?;

        response.text().await.map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })
    }
}
