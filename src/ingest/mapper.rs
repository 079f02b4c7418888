//! Maps a classified course record onto relational writes
//!
//! The plan is an ordered list of operations: upsert the course, its offering
//! for the quarter and the section group, then append each meeting category
//! as one batch. Keys produced by earlier steps feed the later ones when the
//! plan is executed.

use crate::schedule::{CourseMeetingRecord, MeetingRecord};
use thiserror::Error;

/// Errors raised while mapping a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("{0}: record has no section meetings")]
    NoSectionMeetings(String),
}

/// The three meeting tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeetingTable {
    Section,
    General,
    Dated,
}

/// Columns shared by every meeting table
pub const MEETING_COLUMNS: [&str; 11] = [
    "sec_id",
    "type",
    "number",
    "date",
    "days",
    "start_time",
    "end_time",
    "building",
    "room",
    "instructor",
    "section_group_id",
];

impl MeetingTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Section => "section_meeting",
            Self::General => "general_meeting",
            Self::Dated => "dated_meeting",
        }
    }

    /// Column only present in this table
    pub fn extra_column(&self) -> Option<&'static str> {
        match self {
            Self::Section => Some("seats_available"),
            Self::General => Some("essential"),
            Self::Dated => None,
        }
    }

    /// Every column written for one meeting, in bind order
    pub fn columns(&self) -> Vec<&'static str> {
        MEETING_COLUMNS
            .iter()
            .copied()
            .chain(self.extra_column())
            .collect()
    }
}

/// One step of a write plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Create the course if absent; an existing title is kept
    UpsertCourse {
        subject_code: String,
        number: String,
        title: String,
    },

    /// Create the course's offering in the quarter if absent
    UpsertOffering { quarter_code: String },

    /// Create the section group under the offering if absent
    UpsertSectionGroup {
        code: String,
        instructor: Option<String>,
    },

    /// Append meetings to one table, tagged with the section group
    AppendMeetings {
        table: MeetingTable,
        meetings: Vec<MeetingRecord>,
    },
}

/// Ordered writes for one course record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    label: String,
    ops: Vec<WriteOp>,
}

impl WritePlan {
    /// Human-readable key of the record this plan came from
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of meeting rows the plan appends
    pub fn meeting_rows(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                WriteOp::AppendMeetings { meetings, .. } => meetings.len(),
                _ => 0,
            })
            .sum()
    }
}

/// Converts a record into its write plan
///
/// Records without a section meeting are refused so they never reach the
/// store.
pub fn map_record(record: CourseMeetingRecord) -> Result<WritePlan, MapError> {
    let label = record.label();
    if record.section_meetings.is_empty() {
        return Err(MapError::NoSectionMeetings(label));
    }

    let mut ops = vec![
        WriteOp::UpsertCourse {
            subject_code: record.subject_code,
            number: record.course_number,
            title: record.title,
        },
        WriteOp::UpsertOffering {
            quarter_code: record.quarter_code,
        },
        WriteOp::UpsertSectionGroup {
            code: record.section_group_code,
            instructor: record.instructor,
        },
    ];

    for (table, meetings) in [
        (MeetingTable::Section, record.section_meetings),
        (MeetingTable::General, record.general_meetings),
        (MeetingTable::Dated, record.dated_meetings),
    ] {
        if !meetings.is_empty() {
            ops.push(WriteOp::AppendMeetings { table, meetings });
        }
    }

    Ok(WritePlan { label, ops })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Designation, MeetingType};

    fn meeting(kind: MeetingType, designation: Designation) -> MeetingRecord {
        MeetingRecord {
            sec_id: None,
            meeting_type: kind,
            designation,
            days: None,
            start_time: None,
            end_time: None,
            building: None,
            room: None,
            instructor: None,
            seats_available: None,
            essential: None,
        }
    }

    fn record() -> CourseMeetingRecord {
        CourseMeetingRecord {
            quarter_code: "WI21".to_string(),
            subject_code: "CSE".to_string(),
            course_number: "3".to_string(),
            title: "Fluency in Info Tech".to_string(),
            section_group_code: "A00".to_string(),
            instructor: Some("Smith, Jane".to_string()),
            section_meetings: vec![meeting(
                MeetingType::Discussion,
                Designation::Number("A01".to_string()),
            )],
            general_meetings: vec![meeting(
                MeetingType::Lecture,
                Designation::Number("A00".to_string()),
            )
            .with_essential(true)],
            dated_meetings: vec![],
        }
    }

    #[test]
    fn test_plan_order() {
        let plan = map_record(record()).unwrap();

        assert_eq!(plan.label(), "WI21 CSE 3 A00");
        assert_eq!(plan.ops().len(), 5);
        assert_eq!(
            plan.ops()[0],
            WriteOp::UpsertCourse {
                subject_code: "CSE".to_string(),
                number: "3".to_string(),
                title: "Fluency in Info Tech".to_string(),
            }
        );
        assert_eq!(
            plan.ops()[1],
            WriteOp::UpsertOffering {
                quarter_code: "WI21".to_string()
            }
        );
        assert!(matches!(
            &plan.ops()[2],
            WriteOp::UpsertSectionGroup { code, instructor }
                if code == "A00" && instructor.as_deref() == Some("Smith, Jane")
        ));
        assert!(matches!(
            &plan.ops()[3],
            WriteOp::AppendMeetings { table: MeetingTable::Section, meetings } if meetings.len() == 1
        ));
        assert!(matches!(
            &plan.ops()[4],
            WriteOp::AppendMeetings { table: MeetingTable::General, .. }
        ));
        assert_eq!(plan.meeting_rows(), 2);
    }

    #[test]
    fn test_record_without_sections_is_refused() {
        let mut record = record();
        record.section_meetings.clear();

        assert_eq!(
            map_record(record),
            Err(MapError::NoSectionMeetings("WI21 CSE 3 A00".to_string()))
        );
    }

    #[test]
    fn test_meeting_table_columns() {
        assert_eq!(MeetingTable::Section.columns().len(), 12);
        assert_eq!(MeetingTable::Section.columns()[11], "seats_available");
        assert_eq!(MeetingTable::General.columns()[11], "essential");
        assert_eq!(MeetingTable::Dated.columns().len(), 11);
    }
}
