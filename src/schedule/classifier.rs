//! Row classification for a single course block
//!
//! The first meeting row of a block is the main meeting: it fixes the
//! section group code and instructor, and a main meeting that is cancelled or
//! unparsable rejects the whole block. Every later row is parsed on its own
//! and skipped if it fails, then sorted into section, general or dated
//! meetings according to its track.

use crate::schedule::fields::{
    parse_date, parse_days, parse_meeting_type, parse_seats_available, parse_section_number,
    parse_time_range, Field, ParseFailure,
};
use crate::schedule::{
    Cell, CourseBlock, CourseMeetingRecord, Designation, MeetingRecord, MeetingTrack, PageContext,
    RawRow,
};
use thiserror::Error;

// Cell positions within a meeting row
const IND_SEC_ID: usize = 1;
const IND_MEETING_TYPE: usize = 2;
const IND_NUMBER_OR_DATE: usize = 3;
const IND_DAYS: usize = 4;
const IND_TIME: usize = 5;
const IND_BUILDING: usize = 6;
const IND_ROOM: usize = 7;
const IND_INSTRUCTOR: usize = 8;
const IND_SEATS_AVAILABLE: usize = 9;

// Cell positions within a header row
const IND_COURSE_NUMBER: usize = 1;
const IND_TITLE: usize = 2;

/// Cell count of a section-track row that carries a complete schedule
pub const SECTION_TRACK_CELLS: usize = 12;

/// Cell count of a no-enrollment-track row that carries a complete schedule
pub const NO_ENROLLMENT_TRACK_CELLS: usize = 10;

/// Why a course block produced no record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("block has no meeting rows")]
    HeaderOnly,

    #[error("header row has {0} cells, expected at least 3")]
    MissingHeaderCells(usize),

    #[error("main meeting is cancelled")]
    CancelledMainMeeting,

    #[error("main meeting is invalid: {0}")]
    InvalidMainMeeting(ParseFailure),

    #[error("main meeting is dated {0} and has no section code")]
    MainMeetingWithoutSection(String),

    #[error("main meeting row is not a meeting row")]
    MainMeetingNotAMeeting,

    #[error("no section meetings after classification")]
    NoSectionMeetings,
}

/// Why a single meeting row could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowFailure {
    #[error("meeting is cancelled")]
    Cancelled,

    #[error("row is a header, not a meeting")]
    NotAMeeting,

    #[error(transparent)]
    Field(#[from] ParseFailure),
}

/// Classifies one grouped block
pub fn classify_block(
    context: &PageContext,
    block: &CourseBlock,
) -> Result<CourseMeetingRecord, Rejection> {
    classify(context, &block.header.cells, &block.rows)
}

/// Builds a course record from a header and its ordered meeting rows
///
/// # Returns
///
/// * `Ok(CourseMeetingRecord)` - A record with at least one section meeting
/// * `Err(Rejection)` - The block carries nothing schedulable
pub fn classify(
    context: &PageContext,
    header_cells: &[Cell],
    rows: &[RawRow],
) -> Result<CourseMeetingRecord, Rejection> {
    if header_cells.len() <= IND_TITLE {
        return Err(Rejection::MissingHeaderCells(header_cells.len()));
    }
    let course_number = header_cells[IND_COURSE_NUMBER].text.trim().to_string();
    let title = header_cells[IND_TITLE].display_text().trim().to_string();

    let (first, rest) = rows.split_first().ok_or(Rejection::HeaderOnly)?;

    let main = parse_meeting(first).map_err(|failure| match failure {
        RowFailure::Cancelled => Rejection::CancelledMainMeeting,
        RowFailure::NotAMeeting => Rejection::MainMeetingNotAMeeting,
        RowFailure::Field(failure) => Rejection::InvalidMainMeeting(failure),
    })?;

    let section_group_code = match &main.designation {
        Designation::Number(number) => number.clone(),
        Designation::Date(date) => return Err(Rejection::MainMeetingWithoutSection(date.clone())),
    };
    let instructor = main.instructor.clone();

    let mut section_meetings = Vec::new();
    let mut general_meetings = Vec::new();
    let mut dated_meetings = Vec::new();

    if main.sec_id.is_some() {
        section_meetings.push(main);
    } else {
        general_meetings.push(main.with_essential(true));
    }

    for row in rest {
        let parsed = row
            .origin
            .track()
            .ok_or(RowFailure::NotAMeeting)
            .and_then(|track| Ok((track, parse_meeting(row)?)));
        let (track, meeting) = match parsed {
            Ok(parsed) => parsed,
            Err(failure) => {
                tracing::debug!(
                    "Skipping row of {} {} {}: {}",
                    context.subject_code,
                    course_number,
                    section_group_code,
                    failure
                );
                continue;
            }
        };

        match categorize(track, meeting, &section_group_code) {
            Categorized::Section(m) => section_meetings.push(m),
            Categorized::General(m) => general_meetings.push(m),
            Categorized::Dated(m) => dated_meetings.push(m),
        }
    }

    if section_meetings.is_empty() {
        return Err(Rejection::NoSectionMeetings);
    }

    Ok(CourseMeetingRecord {
        quarter_code: context.quarter_code.clone(),
        subject_code: context.subject_code.clone(),
        course_number,
        title,
        section_group_code,
        instructor,
        section_meetings,
        general_meetings,
        dated_meetings,
    })
}

enum Categorized {
    Section(MeetingRecord),
    General(MeetingRecord),
    Dated(MeetingRecord),
}

/// Sorts a non-main meeting by the track it was scraped from
fn categorize(track: MeetingTrack, meeting: MeetingRecord, section_group_code: &str) -> Categorized {
    match track {
        MeetingTrack::Section => {
            if meeting.sec_id.is_some() {
                Categorized::Section(meeting)
            } else {
                Categorized::General(meeting.with_essential(false))
            }
        }
        MeetingTrack::NoEnrollment => {
            if meeting.date().is_some() {
                Categorized::Dated(meeting)
            } else if meeting.number() == Some(section_group_code) {
                Categorized::General(meeting.with_essential(true))
            } else {
                // Rarely reached; kept non-essential until the catalog says otherwise
                Categorized::General(meeting.with_essential(false))
            }
        }
    }
}

/// Parses a meeting row into an unclassified meeting
///
/// Days, times and location are only read when the row has the complete
/// layout for its track; instructor and seats only for complete section-track
/// rows, and seats only when the row has an enrollment id.
pub fn parse_meeting(row: &RawRow) -> Result<MeetingRecord, RowFailure> {
    if row.is_cancelled() {
        return Err(RowFailure::Cancelled);
    }

    let track = row.origin.track().ok_or(RowFailure::NotAMeeting)?;
    let (complete_schedule, complete_section) = match track {
        MeetingTrack::Section => {
            let complete = row.cells.len() == SECTION_TRACK_CELLS;
            (complete, complete)
        }
        MeetingTrack::NoEnrollment => (row.cells.len() == NO_ENROLLMENT_TRACK_CELLS, false),
    };

    let meeting_type = parse_meeting_type(cell_text(row, IND_MEETING_TYPE))?;
    let designation = parse_designation(cell_text(row, IND_NUMBER_OR_DATE))?;

    let sec_id = match track {
        MeetingTrack::Section => non_empty(cell_text(row, IND_SEC_ID)),
        MeetingTrack::NoEnrollment => None,
    };

    let mut days = None;
    let mut start_time = None;
    let mut end_time = None;
    let mut building = None;
    let mut room = None;
    if complete_schedule {
        days = Some(parse_days(cell_text(row, IND_DAYS))?);
        building = non_empty(cell_text(row, IND_BUILDING));
        room = non_empty(cell_text(row, IND_ROOM));
        let (start, end) = parse_time_range(cell_text(row, IND_TIME))?;
        start_time = Some(start);
        end_time = Some(end);
    }

    let mut instructor = None;
    let mut seats_available = None;
    if complete_section {
        instructor = non_empty(cell_text(row, IND_INSTRUCTOR));
        if sec_id.is_some() {
            seats_available = Some(parse_seats_available(cell_text(
                row,
                IND_SEATS_AVAILABLE,
            ))?);
        }
    }

    Ok(MeetingRecord {
        sec_id,
        meeting_type,
        designation,
        days,
        start_time,
        end_time,
        building,
        room,
        instructor,
        seats_available,
        essential: None,
    })
}

/// A section code if the cell holds one, otherwise a date
fn parse_designation(text: &str) -> Result<Designation, ParseFailure> {
    if let Ok(number) = parse_section_number(text) {
        return Ok(Designation::Number(number));
    }
    parse_date(text)
        .map(Designation::Date)
        .map_err(|_| ParseFailure::new(Field::Date, text.trim()))
}

fn cell_text(row: &RawRow, index: usize) -> &str {
    row.cell(index).map(|c| c.text.as_str()).unwrap_or("")
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
