//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the schedule catalog and run
//! the full fetch, classify and write cycle end-to-end.

use schedule_harvest::config::{CatalogConfig, Config, DatabaseConfig, QuarterConfig};
use schedule_harvest::crawler::run_harvest;
use schedule_harvest::output::load_statistics;
use schedule_harvest::storage::{RunStatus, SqliteStore};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCHEDULE_PATH: &str = "/scheduleOfClassesFacultyResult.htm";

const SUBJECTS_JSON: &str = r#"[
    {"code": "CSE", "value": "CSE - Computer Science & Engineering"},
    {"code": "MATH", "value": "MATH - Mathematics"}
]"#;

/// Two course blocks: one valid, one whose main meeting is cancelled
const CSE_PAGE_1: &str = r##"
<html><body>
<table><tr><td align="right">Page&nbsp;(1&nbsp;of&nbsp;2)</td></tr></table>
<table class="tbrdr">
  <tr><td class="crsheader"></td><td class="crsheader">3</td>
      <td class="crsheader"><a href="#"><span class="boldtxt">Fluency in Info Tech</span></a> ( 4 Units)</td></tr>
  <tr class="nonenrtxt">
    <td></td><td></td><td>LE</td><td>A00</td><td>MWF</td><td>1:00p-1:50p</td>
    <td>CENTR</td><td>101</td><td>Smith, Jane</td><td></td>
  </tr>
  <tr class="sectxt">
    <td></td><td>31483</td><td>DI</td><td>A01</td><td>Tu</td><td>5:00p-5:50p</td>
    <td>CENTR</td><td>115</td><td>Smith, Jane</td><td>FULL</td><td>30</td><td></td>
  </tr>
  <tr class="nonenrtxt">
    <td></td><td></td><td>FI</td><td>03/19/2021</td><td>F</td><td>11:30a-2:29p</td>
    <td>TBA</td><td>TBA</td><td></td><td></td>
  </tr>
  <tr><td class="crsheader"></td><td class="crsheader">8A</td>
      <td class="crsheader">Intro to Programming</td></tr>
  <tr class="sectxt">
    <td></td><td>31500</td><td>LE</td><td>A00</td><td colspan="7">Cancelled</td><td></td>
  </tr>
</table>
</body></html>
"##;

const CSE_PAGE_2: &str = r#"
<html><body>
<table><tr><td align="right">Page&nbsp;(2&nbsp;of&nbsp;2)</td></tr></table>
<table class="tbrdr">
  <tr><td class="crsheader"></td><td class="crsheader">11</td>
      <td class="crsheader">Intro to Programming and Computational Problem-Solving</td></tr>
  <tr class="sectxt">
    <td></td><td>40001</td><td>LE</td><td>A00</td><td>TuTh</td><td>9:30a-10:50a</td>
    <td>WLH</td><td>2001</td><td>Doe, John</td><td>12</td><td>100</td><td></td>
  </tr>
</table>
</body></html>
"#;

const EMPTY_PAGE: &str = "<html><body><p>No courses found</p></body></html>";

fn create_test_config(base_url: &str, db_path: &Path, subjects: Vec<String>) -> Config {
    Config {
        catalog: CatalogConfig {
            base_url: base_url.to_string(),
            max_concurrent_pages: 2,
            request_timeout_secs: 5,
            user_agent: "TestHarvester/1.0".to_string(),
        },
        database: DatabaseConfig {
            path: db_path.display().to_string(),
            workers: 2,
        },
        quarter: QuarterConfig {
            code: "WI21".to_string(),
            name: "Winter 2021".to_string(),
            subjects,
        },
    }
}

async fn mount_catalog(server: &MockServer, page_2: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/subject-list.json"))
        .and(query_param("selectedTerm", "WI21"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUBJECTS_JSON))
        .mount(server)
        .await;

    // Mounted before the first-page mock so it wins for page=2
    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .and(query_param("selectedSubjects", "CSE"))
        .and(query_param("page", "2"))
        .respond_with(page_2)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .and(query_param("selectedSubjects", "CSE"))
        .and(query_param("schedOption1", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CSE_PAGE_1))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .and(query_param("selectedSubjects", "MATH"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest() {
    let server = MockServer::start().await;
    mount_catalog(&server, ResponseTemplate::new(200).set_body_string(CSE_PAGE_2)).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("schedule.db");
    let config = create_test_config(&server.uri(), &db_path, vec![]);

    let outcome = run_harvest(&config, "hash").await.unwrap();

    assert_eq!(outcome.harvest.subjects, 2);
    assert_eq!(outcome.harvest.pages, 2);
    assert_eq!(outcome.harvest.failed_pages, 0);
    assert_eq!(outcome.harvest.records, 2);
    assert_eq!(outcome.harvest.rejected, 1);
    assert_eq!(outcome.writes.written, 2);
    assert!(outcome.writes.is_clean());

    let store = SqliteStore::open(&db_path, 1).unwrap();
    let stats = load_statistics(&store).unwrap();
    assert_eq!(stats.count("quarter"), 1);
    assert_eq!(stats.count("subject"), 2);
    assert_eq!(stats.count("course"), 2);
    assert_eq!(stats.count("course_offering"), 2);
    assert_eq!(stats.count("section_group"), 2);
    assert_eq!(stats.count("section_meeting"), 2);
    assert_eq!(stats.count("general_meeting"), 1);
    assert_eq!(stats.count("dated_meeting"), 1);

    let run = stats.latest_run.unwrap();
    assert_eq!(run.id, outcome.run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.tally.written, 2);
    assert_eq!(run.tally.rejected, 1);

    let conn = store.pool().acquire();
    let (seats, essential): (i64, i64) = conn
        .query_row(
            "SELECT s.seats_available, g.essential FROM section_meeting s
             JOIN general_meeting g ON g.section_group_id = s.section_group_id
             WHERE s.sec_id = '31483'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(seats, 0);
    assert_eq!(essential, 1);

    let title: String = conn
        .query_row("SELECT title FROM course WHERE number = '3'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(title, "Fluency in Info Tech");
}

#[tokio::test]
async fn test_rerun_does_not_duplicate() {
    let server = MockServer::start().await;
    mount_catalog(&server, ResponseTemplate::new(200).set_body_string(CSE_PAGE_2)).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("schedule.db");
    let config = create_test_config(&server.uri(), &db_path, vec![]);

    run_harvest(&config, "hash").await.unwrap();
    let first = {
        let store = SqliteStore::open(&db_path, 1).unwrap();
        store.table_counts().unwrap()
    };

    let second_run = run_harvest(&config, "hash").await.unwrap();
    let store = SqliteStore::open(&db_path, 1).unwrap();
    assert_eq!(store.table_counts().unwrap(), first);

    let runs: i64 = store
        .pool()
        .acquire()
        .query_row("SELECT COUNT(*) FROM scrape_run", [], |row| row.get(0))
        .unwrap();
    assert_eq!(runs, 2);
    assert_eq!(second_run.run_id, 2);
}

#[tokio::test]
async fn test_failed_page_is_not_fatal() {
    let server = MockServer::start().await;
    mount_catalog(&server, ResponseTemplate::new(500)).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("schedule.db");
    let config = create_test_config(&server.uri(), &db_path, vec!["CSE".to_string()]);

    let outcome = run_harvest(&config, "hash").await.unwrap();

    assert_eq!(outcome.harvest.subjects, 1);
    assert_eq!(outcome.harvest.pages, 1);
    assert_eq!(outcome.harvest.failed_pages, 1);
    assert_eq!(outcome.writes.written, 1);

    let store = SqliteStore::open(&db_path, 1).unwrap();
    let stats = load_statistics(&store).unwrap();
    assert_eq!(stats.count("section_group"), 1);
    assert_eq!(stats.count("subject"), 2);
}

#[tokio::test]
async fn test_unreachable_subject_list_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subject-list.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("schedule.db");
    let config = create_test_config(&server.uri(), &db_path, vec![]);

    assert!(run_harvest(&config, "hash").await.is_err());

    let store = SqliteStore::open(&db_path, 1).unwrap();
    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}
