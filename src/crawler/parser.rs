//! HTML and JSON parsing for catalog responses
//!
//! This module reduces a schedule page to:
//! - the ordered header and meeting rows, as [`RawRow`]s
//! - the total page count printed on the page
//!
//! and turns the subject-list JSON into [`Subject`]s.

use crate::schedule::{Cell, RawRow, RowOrigin};
use crate::storage::Subject;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::OnceLock;

/// Meeting rows need at least this many cells to be considered
const MIN_MEETING_CELLS: usize = 4;

const HEADER_CELL_CLASS: &str = "crsheader";
const SECTION_ROW_CLASS: &str = "sectxt";
const NO_ENROLLMENT_ROW_CLASS: &str = "nonenrtxt";

/// Rows and pagination extracted from one schedule page
#[derive(Debug, Clone, Default)]
pub struct SchedulePage {
    pub rows: Vec<RawRow>,

    /// Total pages for the subject; 0 when the page shows no listing
    pub page_count: u32,
}

/// Parses a schedule page
///
/// # Example
///
/// ```
/// use schedule_harvest::crawler::parse_schedule_page;
///
/// let html = r#"<table><tr><td align="right">Page (1 of 3)</td></tr></table>"#;
/// let page = parse_schedule_page(html);
/// assert_eq!(page.page_count, 3);
/// assert!(page.rows.is_empty());
/// ```
pub fn parse_schedule_page(html: &str) -> SchedulePage {
    let document = Html::parse_document(html);

    SchedulePage {
        rows: extract_rows(&document),
        page_count: extract_page_count(&document),
    }
}

/// Extracts header and meeting rows in document order
fn extract_rows(document: &Html) -> Vec<RawRow> {
    let (Ok(tr_selector), Ok(td_selector)) = (Selector::parse("tr"), Selector::parse("td"))
    else {
        return Vec::new();
    };

    document
        .select(&tr_selector)
        .filter_map(|tr| {
            let cells: Vec<ElementRef> = tr.select(&td_selector).collect();
            let origin = row_origin(&tr, &cells)?;
            Some(RawRow::new(origin, cells.into_iter().map(to_cell).collect()))
        })
        .collect()
}

/// Decides what a table row is, if it is anything of interest
fn row_origin(tr: &ElementRef, cells: &[ElementRef]) -> Option<RowOrigin> {
    let first_is_header = cells
        .first()
        .map(|td| td.value().classes().any(|class| class == HEADER_CELL_CLASS))
        .unwrap_or(false);
    if first_is_header {
        return Some(RowOrigin::Header);
    }

    if cells.len() < MIN_MEETING_CELLS {
        return None;
    }

    // The first class decides when both are present
    tr.value().classes().find_map(|class| match class {
        SECTION_ROW_CLASS => Some(RowOrigin::SectionTrack),
        NO_ENROLLMENT_ROW_CLASS => Some(RowOrigin::NoEnrollmentTrack),
        _ => None,
    })
}

fn to_cell(td: ElementRef) -> Cell {
    let text = td.text().collect::<String>();
    let link_text = Selector::parse("a")
        .ok()
        .and_then(|a| td.select(&a).next())
        .map(|a| a.text().collect::<String>());

    Cell { text, link_text }
}

fn page_count_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Page\s+\([0-9]+\s+of\s+([0-9]+)\)").expect("valid page count regex")
    })
}

/// Reads "Page (i of N)" from the right-aligned cells; the last match wins
fn extract_page_count(document: &Html) -> u32 {
    let Ok(selector) = Selector::parse("td[align='right']") else {
        return 0;
    };

    document
        .select(&selector)
        .filter_map(|td| {
            let text = td.text().collect::<String>();
            page_count_regex()
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        })
        .last()
        .unwrap_or(0)
}

/// One entry of the subject-list JSON
#[derive(Debug, Deserialize)]
struct SubjectEntry {
    code: String,
    /// "CODE - Name"
    value: String,
}

fn subject_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z]+\s+-(.*)").expect("valid subject name regex"))
}

/// Parses the subject-list JSON into subjects
///
/// An entry whose value does not follow "CODE - Name" keeps the whole value
/// as its name.
pub fn parse_subject_list(json: &str) -> Result<Vec<Subject>, serde_json::Error> {
    let entries: Vec<SubjectEntry> = serde_json::from_str(json)?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let name = subject_name_regex()
                .captures(&entry.value)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| entry.value.trim().to_string());
            Subject::new(entry.code.trim(), name)
        })
        .collect())
}
