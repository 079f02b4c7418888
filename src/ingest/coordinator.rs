//! Write coordinator - executes write plans with a fixed pool of workers
//!
//! Records are queued on a bounded channel and drained by `workers` tasks.
//! Each worker maps a record, then runs its plan on a blocking thread where
//! it holds one pooled connection for the duration of the transaction. A
//! failing record is rolled back and reported; its siblings carry on.

use crate::ingest::mapper::{map_record, MapError};
use crate::schedule::CourseMeetingRecord;
use crate::storage::{RecordStore, StoreError};
use crate::HarvestError;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Why a single record was not persisted
#[derive(Debug, Error)]
pub enum WriteFailure {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WriteFailure {
    /// Whether re-running the record could succeed without changing it
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Map(_) => false,
            Self::Store(e) => e.is_retryable(),
        }
    }
}

/// A record that was rolled back
#[derive(Debug)]
pub struct FailedRecord {
    pub label: String,
    pub reason: WriteFailure,
}

/// Per-record success/failure tally of a batch
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: usize,
    pub failed: Vec<FailedRecord>,
}

impl WriteReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Failures caused by the store being unreachable or busy
    pub fn retryable_count(&self) -> usize {
        self.failed
            .iter()
            .filter(|f| f.reason.is_retryable())
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: WriteReport) {
        self.written += other.written;
        self.failed.extend(other.failed);
    }
}

/// Entry point for writing classified records to a store
pub struct WriteCoordinator<S> {
    store: Arc<S>,
    workers: usize,
}

impl<S: RecordStore + 'static> WriteCoordinator<S> {
    /// Creates a coordinator running `workers` concurrent writers (at least one)
    pub fn new(store: Arc<S>, workers: usize) -> Self {
        Self {
            store,
            workers: workers.max(1),
        }
    }

    /// Resets the scrape-scoped tables and opens a session for writing
    ///
    /// Meeting rows are append-only, so a session is the only way to write
    /// records.
    pub async fn begin(&self) -> Result<ScrapeSession<S>, HarvestError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.reset())
            .await
            .map_err(|e| HarvestError::Worker(e.to_string()))??;

        Ok(ScrapeSession {
            store: Arc::clone(&self.store),
            workers: self.workers,
        })
    }
}

/// Write access granted after a reset
pub struct ScrapeSession<S> {
    store: Arc<S>,
    workers: usize,
}

impl<S: RecordStore + 'static> ScrapeSession<S> {
    /// Starts the worker pool and returns a handle for feeding it
    pub fn writer(&self) -> RecordWriter {
        let (tx, rx) = mpsc::channel::<CourseMeetingRecord>(self.workers * 4);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..self.workers)
            .map(|id| {
                let store = Arc::clone(&self.store);
                let rx = Arc::clone(&rx);
                tokio::spawn(run_worker(id, store, rx))
            })
            .collect();

        RecordWriter { tx, handles }
    }

    /// Writes a batch and waits for every record to finish
    pub async fn write(
        &self,
        records: Vec<CourseMeetingRecord>,
    ) -> Result<WriteReport, HarvestError> {
        let writer = self.writer();
        for record in records {
            writer.submit(record).await?;
        }
        writer.finish().await
    }
}

/// Feeds records to a running worker pool
pub struct RecordWriter {
    tx: mpsc::Sender<CourseMeetingRecord>,
    handles: Vec<JoinHandle<Result<WriteReport, HarvestError>>>,
}

impl RecordWriter {
    /// Queues a record, waiting while the queue is full
    pub async fn submit(&self, record: CourseMeetingRecord) -> Result<(), HarvestError> {
        self.tx
            .send(record)
            .await
            .map_err(|_| HarvestError::Worker("all write workers have stopped".to_string()))
    }

    /// A cloneable sender for producers running in other tasks
    pub fn sender(&self) -> mpsc::Sender<CourseMeetingRecord> {
        self.tx.clone()
    }

    /// Closes the queue and collects the tally once every worker is done
    ///
    /// Outstanding senders from [`RecordWriter::sender`] must be dropped
    /// first or this waits for them. Every worker is awaited even when one
    /// has failed; the first failure is returned.
    pub async fn finish(self) -> Result<WriteReport, HarvestError> {
        drop(self.tx);

        let mut report = WriteReport::default();
        let mut first_error = None;
        for handle in self.handles {
            let joined = handle
                .await
                .map_err(|e| HarvestError::Worker(e.to_string()))
                .and_then(|result| result);
            match joined {
                Ok(partial) => report.merge(partial),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            tracing::error!(
                "Write worker failed after {} records were written: {}",
                report.written,
                e
            );
            return Err(e);
        }

        tracing::info!(
            "Wrote {} records ({} failed, {} retryable)",
            report.written,
            report.failed_count(),
            report.retryable_count()
        );
        Ok(report)
    }
}

async fn run_worker<S: RecordStore + 'static>(
    id: usize,
    store: Arc<S>,
    queue: Arc<Mutex<mpsc::Receiver<CourseMeetingRecord>>>,
) -> Result<WriteReport, HarvestError> {
    let mut report = WriteReport::default();

    loop {
        let next = queue.lock().await.recv().await;
        let Some(record) = next else { break };

        let label = record.label();
        match write_record(&store, record).await? {
            Ok(()) => {
                tracing::debug!("Worker {} wrote {}", id, label);
                report.written += 1;
            }
            Err(reason) => {
                tracing::warn!("Rolled back {}: {}", label, reason);
                report.failed.push(FailedRecord { label, reason });
            }
        }
    }

    tracing::trace!("Worker {} drained the queue", id);
    Ok(report)
}

/// Outer error is fatal to the batch, inner error only to this record
async fn write_record<S: RecordStore + 'static>(
    store: &Arc<S>,
    record: CourseMeetingRecord,
) -> Result<Result<(), WriteFailure>, HarvestError> {
    let plan = match map_record(record) {
        Ok(plan) => plan,
        Err(e) => return Ok(Err(e.into())),
    };

    let store = Arc::clone(store);
    let outcome = tokio::task::spawn_blocking(move || store.apply(&plan))
        .await
        .map_err(|e| HarvestError::Worker(e.to_string()))?;

    Ok(outcome.map_err(WriteFailure::from))
}
