//! Harvest coordinator - drives fetching, grouping and classification
//!
//! For each subject the first schedule page is fetched to learn the page
//! count; the remaining pages are then fetched concurrently, bounded by a
//! semaphore shared across the whole harvest. Every page is grouped into
//! course blocks and classified on arrival, and the resulting records are
//! sent to the write queue.

use crate::crawler::fetcher::CatalogClient;
use crate::crawler::parser::parse_schedule_page;
use crate::schedule::{classify_block, group_blocks, CourseMeetingRecord, PageContext, RawRow};
use crate::storage::Subject;
use crate::{HarvestError, Result};
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Counters for a harvest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestTally {
    pub subjects: usize,
    pub pages: usize,
    pub failed_pages: usize,
    /// Records handed to the write queue
    pub records: usize,
    /// Course blocks the classifier refused
    pub rejected: usize,
}

impl AddAssign for HarvestTally {
    fn add_assign(&mut self, other: Self) {
        self.subjects += other.subjects;
        self.pages += other.pages;
        self.failed_pages += other.failed_pages;
        self.records += other.records;
        self.rejected += other.rejected;
    }
}

/// Fetches and classifies schedule pages
pub struct Harvester {
    client: Arc<CatalogClient>,
    permits: Arc<Semaphore>,
}

impl Harvester {
    /// Creates a harvester allowing `max_concurrent_pages` fetches in flight
    pub fn new(client: CatalogClient, max_concurrent_pages: usize) -> Self {
        Self {
            client: Arc::new(client),
            permits: Arc::new(Semaphore::new(max_concurrent_pages.max(1))),
        }
    }

    /// Harvests every given subject of a quarter
    ///
    /// A subject whose first page cannot be fetched is logged and counted as
    /// a failed page; the other subjects carry on.
    pub async fn harvest_quarter(
        &self,
        quarter_code: &str,
        subjects: &[Subject],
        out: &mpsc::Sender<CourseMeetingRecord>,
    ) -> Result<HarvestTally> {
        let mut tally = HarvestTally::default();

        for subject in subjects {
            let context = PageContext::new(quarter_code, subject.code.as_str());
            match self.harvest_subject(&context, out).await {
                Ok(subject_tally) => {
                    tracing::info!(
                        "{}: {} pages, {} records, {} rejected blocks",
                        subject.code,
                        subject_tally.pages,
                        subject_tally.records,
                        subject_tally.rejected
                    );
                    tally += subject_tally;
                }
                Err(HarvestError::Worker(message)) => return Err(HarvestError::Worker(message)),
                Err(e) => {
                    tracing::error!("Skipping subject {}: {}", subject.code, e);
                    tally.failed_pages += 1;
                }
            }
            tally.subjects += 1;
        }

        Ok(tally)
    }

    /// Harvests all pages of one subject
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestTally)` - Pages processed; failures past the first page are counted
    /// * `Err(HarvestError)` - The first page failed or the write queue closed
    pub async fn harvest_subject(
        &self,
        context: &PageContext,
        out: &mpsc::Sender<CourseMeetingRecord>,
    ) -> Result<HarvestTally> {
        let mut tally = HarvestTally::default();

        let first = self.fetch_page(context, 1).await?;
        let page = parse_schedule_page(&first);
        if page.page_count == 0 {
            tracing::debug!("{} {}: no listing", context.quarter_code, context.subject_code);
            return Ok(tally);
        }

        tally.pages += 1;
        tally += classify_page(context, page.rows, out).await?;

        let mut pending = JoinSet::new();
        for number in 2..=page.page_count {
            let client = Arc::clone(&self.client);
            let permits = Arc::clone(&self.permits);
            let context = context.clone();
            pending.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| HarvestError::Worker(e.to_string()))?;
                let html = client
                    .fetch_schedule_page(&context.quarter_code, &context.subject_code, number)
                    .await?;
                Ok::<_, HarvestError>((number, parse_schedule_page(&html).rows))
            });
        }

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok(Ok((number, rows))) => {
                    tracing::trace!("{} page {} fetched", context.subject_code, number);
                    tally.pages += 1;
                    tally += classify_page(context, rows, out).await?;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Failed page of {}: {}", context.subject_code, e);
                    tally.failed_pages += 1;
                }
                Err(e) => {
                    tracing::warn!("Page task of {} aborted: {}", context.subject_code, e);
                    tally.failed_pages += 1;
                }
            }
        }

        Ok(tally)
    }

    async fn fetch_page(&self, context: &PageContext, number: u32) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| HarvestError::Worker(e.to_string()))?;
        self.client
            .fetch_schedule_page(&context.quarter_code, &context.subject_code, number)
            .await
    }
}

/// Groups and classifies one page, forwarding valid records
async fn classify_page(
    context: &PageContext,
    rows: Vec<RawRow>,
    out: &mpsc::Sender<CourseMeetingRecord>,
) -> Result<HarvestTally> {
    let mut tally = HarvestTally::default();

    for block in group_blocks(rows) {
        match classify_block(context, &block) {
            Ok(record) => {
                out.send(record)
                    .await
                    .map_err(|_| HarvestError::Worker("write queue closed".to_string()))?;
                tally.records += 1;
            }
            Err(rejection) => {
                tracing::warn!(
                    "Rejected block in {} {}: {}",
                    context.subject_code,
                    block_label(&block.header),
                    rejection
                );
                tally.rejected += 1;
            }
        }
    }

    Ok(tally)
}

/// Course number of a header row, for log messages
fn block_label(header: &RawRow) -> &str {
    header.cell(1).map(|c| c.text.trim()).unwrap_or("?")
}
