//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore
//! trait on top of the connection pool.

use crate::ingest::{MeetingTable, WriteOp, WritePlan};
use crate::schedule::MeetingRecord;
use crate::storage::pool::ConnectionPool;
use crate::storage::schema::{RESET_SQL, TABLES};
use crate::storage::traits::{RecordStore, StoreError, StoreResult, Subject};
use crate::storage::{RunRecord, RunStatus, RunTally};
use chrono::{NaiveTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;

/// Meeting rows bound into a single INSERT statement
const MAX_ROWS_PER_STATEMENT: usize = 64;

const UPSERT_QUARTER_SQL: &str = "
    INSERT INTO quarter (code, name) VALUES (?1, ?2)
    ON CONFLICT (code) DO UPDATE SET code = excluded.code
    RETURNING id";

const INSERT_SUBJECT_SQL: &str = "
    INSERT INTO subject (code, name) VALUES (?1, ?2)
    ON CONFLICT (code) DO NOTHING";

const UPSERT_COURSE_SQL: &str = "
    INSERT INTO course (subject_id, number, title)
    SELECT id, ?2, ?3 FROM subject WHERE code = ?1
    ON CONFLICT (subject_id, number) DO UPDATE SET subject_id = excluded.subject_id
    RETURNING id";

const UPSERT_OFFERING_SQL: &str = "
    INSERT INTO course_offering (course_id, quarter_id)
    SELECT ?1, id FROM quarter WHERE code = ?2
    ON CONFLICT (course_id, quarter_id) DO UPDATE SET course_id = excluded.course_id
    RETURNING id";

const UPSERT_SECTION_GROUP_SQL: &str = "
    INSERT INTO section_group (course_offering_id, code, instructor) VALUES (?1, ?2, ?3)
    ON CONFLICT (course_offering_id, code) DO UPDATE SET code = excluded.code
    RETURNING id";

/// SQLite storage backend
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    /// Opens the database at `path` with a pool of `connections` connections
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `connections` - Pool size, normally the number of write workers
    pub fn open(path: &Path, connections: usize) -> StoreResult<Self> {
        Ok(Self {
            pool: ConnectionPool::open(path, connections)?,
        })
    }

    /// Creates a single-connection in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        Ok(Self {
            pool: ConnectionPool::in_memory()?,
        })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    // ===== Run Management =====

    /// Records the start of a scrape run and returns its id
    pub fn start_run(&self, quarter_code: &str, config_hash: &str) -> StoreResult<i64> {
        let conn = self.pool.acquire();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO scrape_run (quarter_code, config_hash, started_at, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                quarter_code,
                config_hash,
                now,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Marks a run finished with its final tally
    pub fn finish_run(&self, run_id: i64, status: RunStatus, tally: &RunTally) -> StoreResult<()> {
        let conn = self.pool.acquire();
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE scrape_run SET status = ?1, finished_at = ?2, records_written = ?3,
             records_failed = ?4, blocks_rejected = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                tally.written as i64,
                tally.failed as i64,
                tally.rejected as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets the most recent run
    pub fn latest_run(&self) -> StoreResult<Option<RunRecord>> {
        let conn = self.pool.acquire();
        let run = conn
            .query_row(
                "SELECT id, quarter_code, config_hash, started_at, finished_at, status,
                 records_written, records_failed, blocks_rejected
                 FROM scrape_run ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        quarter_code: row.get(1)?,
                        config_hash: row.get(2)?,
                        started_at: row.get(3)?,
                        finished_at: row.get(4)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                            .unwrap_or(RunStatus::Failed),
                        tally: RunTally {
                            written: row.get::<_, i64>(6)? as usize,
                            failed: row.get::<_, i64>(7)? as usize,
                            rejected: row.get::<_, i64>(8)? as usize,
                        },
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    // ===== Statistics =====

    /// Row count of every catalog table, in dependency order
    pub fn table_counts(&self) -> StoreResult<Vec<(&'static str, u64)>> {
        let conn = self.pool.acquire();
        TABLES
            .iter()
            .map(|table| {
                let count: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })?;
                Ok((*table, count as u64))
            })
            .collect()
    }
}

impl RecordStore for SqliteStore {
    fn register_quarter(&self, code: &str, name: &str) -> StoreResult<i64> {
        let conn = self.pool.acquire();
        let mut stmt = conn.prepare_cached(UPSERT_QUARTER_SQL)?;
        let id = stmt.query_row(params![code, name], |row| row.get(0))?;
        Ok(id)
    }

    fn register_subjects(&self, subjects: &[Subject]) -> StoreResult<usize> {
        let mut conn = self.pool.acquire();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached(INSERT_SUBJECT_SQL)?;
            for subject in subjects {
                stmt.execute(params![subject.code, subject.name])?;
            }
        }
        tx.commit()?;
        Ok(subjects.len())
    }

    fn reset(&self) -> StoreResult<()> {
        let mut conn = self.pool.acquire();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(RESET_SQL)?;
        tx.commit()?;
        tracing::info!("Cleared offerings, section groups and meetings");
        Ok(())
    }

    fn apply(&self, plan: &WritePlan) -> StoreResult<()> {
        let mut conn = self.pool.acquire();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Dropping the transaction on error rolls it back
        execute_plan(&tx, plan)?;
        tx.commit()?;
        Ok(())
    }
}

/// Runs every operation of a plan, threading the generated keys through
fn execute_plan(conn: &Connection, plan: &WritePlan) -> StoreResult<()> {
    let mut course_id: Option<i64> = None;
    let mut offering_id: Option<i64> = None;
    let mut group_id: Option<i64> = None;

    for op in plan.ops() {
        match op {
            WriteOp::UpsertCourse {
                subject_code,
                number,
                title,
            } => {
                let mut stmt = conn.prepare_cached(UPSERT_COURSE_SQL)?;
                let id = stmt
                    .query_row(params![subject_code, number, title], |row| row.get(0))
                    .optional()?
                    .ok_or_else(|| StoreError::UnknownSubject(subject_code.clone()))?;
                course_id = Some(id);
            }

            WriteOp::UpsertOffering { quarter_code } => {
                let course = course_id
                    .ok_or(StoreError::MalformedPlan("offering before course"))?;
                let mut stmt = conn.prepare_cached(UPSERT_OFFERING_SQL)?;
                let id = stmt
                    .query_row(params![course, quarter_code], |row| row.get(0))
                    .optional()?
                    .ok_or_else(|| StoreError::UnknownQuarter(quarter_code.clone()))?;
                offering_id = Some(id);
            }

            WriteOp::UpsertSectionGroup { code, instructor } => {
                let offering = offering_id
                    .ok_or(StoreError::MalformedPlan("section group before offering"))?;
                let mut stmt = conn.prepare_cached(UPSERT_SECTION_GROUP_SQL)?;
                let id = stmt.query_row(params![offering, code, instructor], |row| row.get(0))?;
                group_id = Some(id);
            }

            WriteOp::AppendMeetings { table, meetings } => {
                let group = group_id
                    .ok_or(StoreError::MalformedPlan("meetings before section group"))?;
                append_meetings(conn, *table, group, meetings)?;
            }
        }
    }

    Ok(())
}

/// Inserts meetings with one multi-row statement per chunk
fn append_meetings(
    conn: &Connection,
    table: MeetingTable,
    section_group_id: i64,
    meetings: &[MeetingRecord],
) -> StoreResult<()> {
    for chunk in meetings.chunks(MAX_ROWS_PER_STATEMENT) {
        let sql = batch_insert_sql(table, chunk.len());
        let values: Vec<Value> = chunk
            .iter()
            .flat_map(|meeting| meeting_values(table, section_group_id, meeting))
            .collect();

        let mut stmt = conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(values.iter()))?;
    }
    Ok(())
}

/// Builds `INSERT INTO table (cols) VALUES (?, ..), (?, ..)` for `rows` rows
fn batch_insert_sql(table: MeetingTable, rows: usize) -> String {
    let columns = table.columns();
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        table.table_name(),
        columns.join(", "),
        vec![placeholders; rows].join(", ")
    )
}

/// Bind values for one meeting, in [`MeetingTable::columns`] order
fn meeting_values(table: MeetingTable, section_group_id: i64, meeting: &MeetingRecord) -> Vec<Value> {
    let mut values = vec![
        text(meeting.sec_id.as_deref()),
        Value::Text(meeting.meeting_type.code().to_string()),
        text(meeting.number()),
        text(meeting.date()),
        text(meeting.days.as_deref()),
        time(meeting.start_time),
        time(meeting.end_time),
        text(meeting.building.as_deref()),
        text(meeting.room.as_deref()),
        text(meeting.instructor.as_deref()),
        Value::Integer(section_group_id),
    ];

    match table {
        MeetingTable::Section => values.push(
            meeting
                .seats_available
                .map_or(Value::Null, |seats| Value::Integer(i64::from(seats))),
        ),
        MeetingTable::General => {
            values.push(Value::Integer(i64::from(meeting.essential.unwrap_or(false))))
        }
        MeetingTable::Dated => {}
    }

    values
}

fn text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

fn time(value: Option<NaiveTime>) -> Value {
    value.map_or(Value::Null, |t| Value::Text(t.format("%H:%M:%S").to_string()))
}
