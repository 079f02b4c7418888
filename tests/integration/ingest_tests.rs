//! Integration tests for the classify-and-write pipeline
//!
//! Rows are built in memory, grouped, classified and written through the
//! write coordinator into an on-disk database shared by several workers.

use schedule_harvest::ingest::{WriteCoordinator, WriteFailure};
use schedule_harvest::schedule::{classify_block, group_blocks, PageContext, RawRow, RowOrigin};
use schedule_harvest::storage::{RecordStore, SqliteStore, StoreError, Subject};
use schedule_harvest::CourseMeetingRecord;
use std::sync::Arc;
use tempfile::TempDir;

const WORKERS: usize = 4;

fn header(number: &str, title: &str) -> RawRow {
    RawRow::from_texts(RowOrigin::Header, &["", number, title])
}

fn lecture(number: &str) -> RawRow {
    RawRow::from_texts(
        RowOrigin::NoEnrollmentTrack,
        &["", "", "LE", number, "TuTh", "11:00a-12:20p", "PCYNH", "109", "", ""],
    )
}

fn discussion(sec_id: &str, number: &str, seats: &str) -> RawRow {
    RawRow::from_texts(
        RowOrigin::SectionTrack,
        &[
            "", sec_id, "DI", number, "W", "4:00p-4:50p", "CENTR", "212", "Lee, Ana", seats, "35",
            "",
        ],
    )
}

fn final_exam(date: &str) -> RawRow {
    RawRow::from_texts(
        RowOrigin::NoEnrollmentTrack,
        &["", "", "FI", date, "S", "8:00a-10:59a", "TBA", "TBA", "", ""],
    )
}

/// One page worth of rows: 20 courses with a lecture, two sections and a final
fn page_rows() -> Vec<RawRow> {
    let mut rows = Vec::new();
    for n in 1..=20 {
        rows.push(header(&n.to_string(), &format!("Course {}", n)));
        rows.push(lecture("A00"));
        rows.push(discussion(&format!("{}01", 100 + n), "A01", "FULL"));
        rows.push(discussion(&format!("{}02", 100 + n), "A02", "7"));
        // Unparsable time: only this row is dropped
        rows.push(RawRow::from_texts(
            RowOrigin::SectionTrack,
            &["", "999", "DI", "A03", "W", "sometime", "CENTR", "212", "", "1", "35", ""],
        ));
        rows.push(final_exam("03/15/2021"));
    }
    // Header-only block at the end of the page
    rows.push(header("99", "Placeholder"));
    rows
}

fn classify_rows(context: &PageContext, rows: Vec<RawRow>) -> Vec<CourseMeetingRecord> {
    group_blocks(rows)
        .iter()
        .filter_map(|block| classify_block(context, block).ok())
        .collect()
}

fn open_store(dir: &TempDir) -> Arc<SqliteStore> {
    let store = SqliteStore::open(&dir.path().join("schedule.db"), WORKERS).unwrap();
    store.register_quarter("WI21", "Winter 2021").unwrap();
    store
        .register_subjects(&[Subject::new("CSE", "Computer Science & Engineering")])
        .unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn test_ingest_page() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let context = PageContext::new("WI21", "CSE");

    let records = classify_rows(&context, page_rows());
    assert_eq!(records.len(), 20);
    assert!(records.iter().all(|r| r.section_meetings.len() == 2));

    let coordinator = WriteCoordinator::new(Arc::clone(&store), WORKERS);
    let session = coordinator.begin().await.unwrap();
    let report = session.write(records).await.unwrap();

    assert_eq!(report.written, 20);
    assert!(report.is_clean());

    let counts = store.table_counts().unwrap();
    let count = |table: &str| counts.iter().find(|(t, _)| *t == table).unwrap().1;
    assert_eq!(count("course"), 20);
    assert_eq!(count("section_group"), 20);
    assert_eq!(count("section_meeting"), 40);
    assert_eq!(count("general_meeting"), 20);
    assert_eq!(count("dated_meeting"), 20);
    assert_eq!(store.pool().idle_count(), WORKERS);
}

#[tokio::test]
async fn test_reset_then_reingest_twice_is_duplication_free() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let context = PageContext::new("WI21", "CSE");
    let coordinator = WriteCoordinator::new(Arc::clone(&store), WORKERS);

    let session = coordinator.begin().await.unwrap();
    session
        .write(classify_rows(&context, page_rows()))
        .await
        .unwrap();
    let once = store.table_counts().unwrap();

    let session = coordinator.begin().await.unwrap();
    session
        .write(classify_rows(&context, page_rows()))
        .await
        .unwrap();
    session
        .write(classify_rows(&context, page_rows()))
        .await
        .unwrap();
    let twice = store.table_counts().unwrap();

    // Two writes in one session append twice; only a reset makes a rerun idempotent
    assert_ne!(once, twice);

    let session = coordinator.begin().await.unwrap();
    session
        .write(classify_rows(&context, page_rows()))
        .await
        .unwrap();
    assert_eq!(store.table_counts().unwrap(), once);
}

#[tokio::test]
async fn test_failed_records_are_isolated() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut records = classify_rows(&PageContext::new("WI21", "CSE"), page_rows());
    // Subject never registered: these roll back
    records.extend(classify_rows(
        &PageContext::new("WI21", "PHYS"),
        vec![header("2A", "Mechanics"), discussion("500", "A01", "3")],
    ));
    // Quarter never registered
    records.extend(classify_rows(
        &PageContext::new("FA99", "CSE"),
        vec![header("1", "Course 1"), discussion("501", "A01", "3")],
    ));
    assert_eq!(records.len(), 22);

    let coordinator = WriteCoordinator::new(Arc::clone(&store), WORKERS);
    let report = coordinator.begin().await.unwrap().write(records).await.unwrap();

    assert_eq!(report.written, 20);
    assert_eq!(report.failed_count(), 2);
    assert_eq!(report.retryable_count(), 0);
    assert!(report.failed.iter().any(|f| matches!(
        &f.reason,
        WriteFailure::Store(StoreError::UnknownSubject(code)) if code == "PHYS"
    )));
    assert!(report.failed.iter().any(|f| matches!(
        &f.reason,
        WriteFailure::Store(StoreError::UnknownQuarter(code)) if code == "FA99"
    )));

    let counts = store.table_counts().unwrap();
    let count = |table: &str| counts.iter().find(|(t, _)| *t == table).unwrap().1;
    assert_eq!(count("course"), 20);
    assert_eq!(count("course_offering"), 20);
}
