//! Schedule-of-classes extraction and classification
//!
//! This module turns the flat row stream scraped from one catalog page into
//! classified course records:
//! - Field parsers for individual table cells (`fields`)
//! - Splitting a page's rows into per-course blocks (`grouper`)
//! - Classifying a block's rows into section, general and dated meetings
//!   (`classifier`)

pub mod classifier;
pub mod fields;
pub mod grouper;

pub use classifier::{classify, classify_block, Rejection};
pub use fields::{Field, MeetingType, ParseFailure};
pub use grouper::group_blocks;

use chrono::NaiveTime;

/// Provenance of a scraped table row, decided once when the row is extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowOrigin {
    /// Course header row (course number and title)
    Header,

    /// Meeting row from the enrollable section track
    SectionTrack,

    /// Meeting row from the no-enrollment track (lectures, exams, extra meetings)
    NoEnrollmentTrack,
}

/// The table track a meeting row was scraped from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingTrack {
    Section,
    NoEnrollment,
}

impl RowOrigin {
    /// The meeting track of this row; `None` for a header
    pub fn track(&self) -> Option<MeetingTrack> {
        match self {
            Self::Header => None,
            Self::SectionTrack => Some(MeetingTrack::Section),
            Self::NoEnrollmentTrack => Some(MeetingTrack::NoEnrollment),
        }
    }

    /// Whether this row carries meeting data (as opposed to starting a block)
    pub fn is_meeting(&self) -> bool {
        self.track().is_some()
    }
}

/// One table cell as scraped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    /// Full text content of the cell
    pub text: String,

    /// Text of the first link inside the cell, if there is one
    pub link_text: Option<String>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link_text: None,
        }
    }

    pub fn with_link(text: impl Into<String>, link_text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link_text: Some(link_text.into()),
        }
    }

    /// Link text when present, otherwise the full cell text
    pub fn display_text(&self) -> &str {
        self.link_text.as_deref().unwrap_or(&self.text)
    }
}

/// One table row as scraped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub origin: RowOrigin,
    pub cells: Vec<Cell>,
}

impl RawRow {
    pub fn new(origin: RowOrigin, cells: Vec<Cell>) -> Self {
        Self { origin, cells }
    }

    /// Convenience constructor from plain cell texts
    pub fn from_texts<S: AsRef<str>>(origin: RowOrigin, texts: &[S]) -> Self {
        Self {
            origin,
            cells: texts.iter().map(|t| Cell::new(t.as_ref())).collect(),
        }
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Whether the cancellation marker appears anywhere in the row
    pub fn is_cancelled(&self) -> bool {
        self.cells
            .iter()
            .any(|cell| cell.text.contains(CANCELLED_MARKER))
    }
}

/// Marker the catalog prints in a meeting row that will not take place
pub const CANCELLED_MARKER: &str = "Cancelled";

/// A header row and the meeting rows that follow it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseBlock {
    pub header: RawRow,
    pub rows: Vec<RawRow>,
}

/// Quarter and subject a page of rows was fetched for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub quarter_code: String,
    pub subject_code: String,
}

impl PageContext {
    pub fn new(quarter_code: impl Into<String>, subject_code: impl Into<String>) -> Self {
        Self {
            quarter_code: quarter_code.into(),
            subject_code: subject_code.into(),
        }
    }
}

/// A meeting is identified either by its section code or by a calendar date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Designation {
    /// Section code such as "A00" or "003"
    Number(String),

    /// Calendar date as printed (month/day/year)
    Date(String),
}

/// A single classified meeting
///
/// Absent fields are `None`, never empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRecord {
    pub sec_id: Option<String>,
    pub meeting_type: MeetingType,
    pub designation: Designation,
    pub days: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub building: Option<String>,
    pub room: Option<String>,
    pub instructor: Option<String>,
    pub seats_available: Option<u32>,
    /// Only meaningful for general meetings
    pub essential: Option<bool>,
}

impl MeetingRecord {
    pub fn number(&self) -> Option<&str> {
        match &self.designation {
            Designation::Number(n) => Some(n),
            Designation::Date(_) => None,
        }
    }

    pub fn date(&self) -> Option<&str> {
        match &self.designation {
            Designation::Date(d) => Some(d),
            Designation::Number(_) => None,
        }
    }

    /// Returns this meeting marked as essential or optional
    pub fn with_essential(self, essential: bool) -> Self {
        Self {
            essential: Some(essential),
            ..self
        }
    }
}

/// A course section group together with all of its classified meetings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseMeetingRecord {
    pub quarter_code: String,
    pub subject_code: String,
    pub course_number: String,
    pub title: String,
    pub section_group_code: String,
    pub instructor: Option<String>,
    pub section_meetings: Vec<MeetingRecord>,
    pub general_meetings: Vec<MeetingRecord>,
    pub dated_meetings: Vec<MeetingRecord>,
}

impl CourseMeetingRecord {
    /// Short human-readable key, e.g. "WI21 CSE 3 A00"
    pub fn label(&self) -> String {
        format!(
            "{} {} {} {}",
            self.quarter_code, self.subject_code, self.course_number, self.section_group_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_marker_anywhere_in_row() {
        let row = RawRow::from_texts(
            RowOrigin::SectionTrack,
            &["", "", "DI", "A01", "Cancelled"],
        );
        assert!(row.is_cancelled());

        let row = RawRow::from_texts(RowOrigin::SectionTrack, &["", "", "DI", "A01"]);
        assert!(!row.is_cancelled());
    }

    #[test]
    fn test_cell_prefers_link_text() {
        let cell = Cell::with_link("  Fluency in Info Tech ( 4 Units)", "Fluency in Info Tech");
        assert_eq!(cell.display_text(), "Fluency in Info Tech");
        assert_eq!(Cell::new("plain").display_text(), "plain");
    }

    #[test]
    fn test_designation_accessors() {
        let meeting = MeetingRecord {
            sec_id: None,
            meeting_type: MeetingType::Final,
            designation: Designation::Date("03/19/2021".to_string()),
            days: None,
            start_time: None,
            end_time: None,
            building: None,
            room: None,
            instructor: None,
            seats_available: None,
            essential: None,
        };
        assert_eq!(meeting.date(), Some("03/19/2021"));
        assert_eq!(meeting.number(), None);

        let meeting = meeting.with_essential(false);
        assert_eq!(meeting.essential, Some(false));
    }

    #[test]
    fn test_row_origin_track() {
        assert_eq!(RowOrigin::Header.track(), None);
        assert_eq!(RowOrigin::SectionTrack.track(), Some(MeetingTrack::Section));
        assert_eq!(
            RowOrigin::NoEnrollmentTrack.track(),
            Some(MeetingTrack::NoEnrollment)
        );
        assert!(!RowOrigin::Header.is_meeting());
    }
}
