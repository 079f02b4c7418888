//! Parsers for individual schedule table cells
//!
//! Every parser trims its input and returns either a typed value or a
//! [`ParseFailure`] naming the field and the offending text. None of them
//! panic; callers decide whether a failure is fatal to the row.

use chrono::NaiveTime;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// The cell grammar a parse failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Days,
    MeetingType,
    SectionNumber,
    TimeRange,
    SeatsAvailable,
    Date,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::MeetingType => "meeting type",
            Self::SectionNumber => "section number",
            Self::TimeRange => "time range",
            Self::SeatsAvailable => "seats available",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cell did not match the grammar of its field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse {field} from '{text}'")]
pub struct ParseFailure {
    pub field: Field,
    pub text: String,
}

impl ParseFailure {
    pub fn new(field: Field, text: impl Into<String>) -> Self {
        Self {
            field,
            text: text.into(),
        }
    }
}

/// Result type for field parsing
pub type FieldResult<T> = Result<T, ParseFailure>;

/// Meeting type codes used by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeetingType {
    Activity,
    Clinical,
    Conference,
    Discussion,
    Final,
    Film,
    Fieldwork,
    IndependentStudy,
    Internship,
    Lab,
    Lecture,
    Midterm,
    MakeUp,
    Other,
    ProblemSession,
    Practicum,
    Review,
    Seminar,
    Studio,
    Tutorial,
}

impl MeetingType {
    pub const ALL: [MeetingType; 20] = [
        Self::Activity,
        Self::Clinical,
        Self::Conference,
        Self::Discussion,
        Self::Final,
        Self::Film,
        Self::Fieldwork,
        Self::IndependentStudy,
        Self::Internship,
        Self::Lab,
        Self::Lecture,
        Self::Midterm,
        Self::MakeUp,
        Self::Other,
        Self::ProblemSession,
        Self::Practicum,
        Self::Review,
        Self::Seminar,
        Self::Studio,
        Self::Tutorial,
    ];

    /// Two-letter catalog code, also the stored representation
    pub fn code(&self) -> &'static str {
        match self {
            Self::Activity => "AC",
            Self::Clinical => "CL",
            Self::Conference => "CO",
            Self::Discussion => "DI",
            Self::Final => "FI",
            Self::Film => "FM",
            Self::Fieldwork => "FW",
            Self::IndependentStudy => "IN",
            Self::Internship => "IT",
            Self::Lab => "LA",
            Self::Lecture => "LE",
            Self::Midterm => "MI",
            Self::MakeUp => "MU",
            Self::Other => "OT",
            Self::ProblemSession => "PB",
            Self::Practicum => "PR",
            Self::Review => "RE",
            Self::Seminar => "SE",
            Self::Studio => "ST",
            Self::Tutorial => "TU",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }
}

impl fmt::Display for MeetingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn days_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:M|Tu|W|Th|F|S)+").expect("valid days regex"))
}

fn meeting_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"AC|CL|CO|DI|FI|FM|FW|IN|IT|LA|LE|MI|MU|OT|PB|PR|RE|SE|ST|TU")
            .expect("valid meeting type regex")
    })
}

fn section_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[A-Z][0-9]{2}|[0-9]{3})$").expect("valid section number regex")
    })
}

fn time_range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]+):([0-9]{2})([ap])-([0-9]+):([0-9]{2})([ap])$")
            .expect("valid time range regex")
    })
}

fn seats_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+$").expect("valid seats regex"))
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+/[0-9]+/[0-9]+$").expect("valid date regex"))
}

/// Parses meeting days such as "MWF" or "TuTh"
///
/// The first run of day tokens found anywhere in the text is returned, so
/// surrounding noise is tolerated.
pub fn parse_days(text: &str) -> FieldResult<String> {
    let text = text.trim();
    days_regex()
        .find(text)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ParseFailure::new(Field::Days, text))
}

/// Parses a two-letter meeting type code
pub fn parse_meeting_type(text: &str) -> FieldResult<MeetingType> {
    let text = text.trim();
    meeting_type_regex()
        .find(text)
        .and_then(|m| MeetingType::from_code(m.as_str()))
        .ok_or_else(|| ParseFailure::new(Field::MeetingType, text))
}

/// Parses a section code: a capital letter and two digits, or three digits
pub fn parse_section_number(text: &str) -> FieldResult<String> {
    let text = text.trim();
    if section_number_regex().is_match(text) {
        Ok(text.to_string())
    } else {
        Err(ParseFailure::new(Field::SectionNumber, text))
    }
}

/// Parses a range such as "1:00p-1:50p" into 24-hour start and end times
pub fn parse_time_range(text: &str) -> FieldResult<(NaiveTime, NaiveTime)> {
    let text = text.trim();
    let failure = || ParseFailure::new(Field::TimeRange, text);
    let caps = time_range_regex().captures(text).ok_or_else(failure)?;

    let start = to_time(&caps[1], &caps[2], &caps[3]).ok_or_else(failure)?;
    let end = to_time(&caps[4], &caps[5], &caps[6]).ok_or_else(failure)?;

    Ok((start, end))
}

/// Converts one half of a time range to a time of day
///
/// "p" adds twelve hours unless the hour is 12; "12" with "a" is midnight.
fn to_time(hour: &str, minute: &str, period: &str) -> Option<NaiveTime> {
    let mut hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;

    if period == "p" && hour != 12 {
        hour = hour.checked_add(12)?;
    } else if period == "a" && hour == 12 {
        hour = 0;
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Parses the seats-available cell; any cell containing "FULL" means zero
pub fn parse_seats_available(text: &str) -> FieldResult<u32> {
    let text = text.trim();
    if seats_regex().is_match(text) {
        text.parse()
            .map_err(|_| ParseFailure::new(Field::SeatsAvailable, text))
    } else if text.contains("FULL") {
        Ok(0)
    } else {
        Err(ParseFailure::new(Field::SeatsAvailable, text))
    }
}

/// Parses a month/day/year date; the parts themselves are not validated
pub fn parse_date(text: &str) -> FieldResult<String> {
    let text = text.trim();
    if date_regex().is_match(text) {
        Ok(text.to_string())
    } else {
        Err(ParseFailure::new(Field::Date, text))
    }
}
