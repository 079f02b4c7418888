//! Database schema definitions
//!
//! Master catalog tables (`quarter`, `subject`, `course`) accumulate across
//! scrape runs. Offerings, section groups and meetings are scoped to a scrape
//! run and are cleared by [`RESET_SQL`] before each full re-scrape.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS quarter (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subject (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS course (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id INTEGER NOT NULL REFERENCES subject(id),
    number TEXT NOT NULL,
    title TEXT NOT NULL,
    UNIQUE(subject_id, number)
);

CREATE TABLE IF NOT EXISTS course_offering (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    course_id INTEGER NOT NULL REFERENCES course(id),
    quarter_id INTEGER NOT NULL REFERENCES quarter(id),
    UNIQUE(course_id, quarter_id)
);

CREATE TABLE IF NOT EXISTS section_group (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    course_offering_id INTEGER NOT NULL REFERENCES course_offering(id),
    code TEXT NOT NULL,
    instructor TEXT,
    UNIQUE(course_offering_id, code)
);

CREATE TABLE IF NOT EXISTS section_meeting (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    section_group_id INTEGER NOT NULL REFERENCES section_group(id),
    sec_id TEXT,
    type TEXT NOT NULL,
    number TEXT,
    date TEXT,
    days TEXT,
    start_time TEXT,
    end_time TEXT,
    building TEXT,
    room TEXT,
    instructor TEXT,
    seats_available INTEGER
);

CREATE INDEX IF NOT EXISTS idx_section_meeting_group ON section_meeting(section_group_id);

CREATE TABLE IF NOT EXISTS general_meeting (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    section_group_id INTEGER NOT NULL REFERENCES section_group(id),
    sec_id TEXT,
    type TEXT NOT NULL,
    number TEXT,
    date TEXT,
    days TEXT,
    start_time TEXT,
    end_time TEXT,
    building TEXT,
    room TEXT,
    instructor TEXT,
    essential INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_general_meeting_group ON general_meeting(section_group_id);

CREATE TABLE IF NOT EXISTS dated_meeting (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    section_group_id INTEGER NOT NULL REFERENCES section_group(id),
    sec_id TEXT,
    type TEXT NOT NULL,
    number TEXT,
    date TEXT,
    days TEXT,
    start_time TEXT,
    end_time TEXT,
    building TEXT,
    room TEXT,
    instructor TEXT
);

CREATE INDEX IF NOT EXISTS idx_dated_meeting_group ON dated_meeting(section_group_id);

-- Scrape runs survive resets
CREATE TABLE IF NOT EXISTS scrape_run (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quarter_code TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    records_written INTEGER NOT NULL DEFAULT 0,
    records_failed INTEGER NOT NULL DEFAULT 0,
    blocks_rejected INTEGER NOT NULL DEFAULT 0
);
"#;

/// Clears every scrape-scoped table, children first
pub const RESET_SQL: &str = r#"
DELETE FROM section_meeting;
DELETE FROM general_meeting;
DELETE FROM dated_meeting;
DELETE FROM section_group;
DELETE FROM course_offering;
"#;

/// Tables in dependency order, used for statistics
pub const TABLES: [&str; 8] = [
    "quarter",
    "subject",
    "course",
    "course_offering",
    "section_group",
    "section_meeting",
    "general_meeting",
    "dated_meeting",
];

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
