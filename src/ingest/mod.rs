//! Ingest module: from classified records to committed rows
//!
//! - [`mapper`] turns a record into an ordered write plan
//! - [`coordinator`] runs plans against the store with a worker pool

pub mod coordinator;
pub mod mapper;

pub use coordinator::{
    FailedRecord, RecordWriter, ScrapeSession, WriteCoordinator, WriteFailure, WriteReport,
};
pub use mapper::{map_record, MapError, MeetingTable, WriteOp, WritePlan, MEETING_COLUMNS};
