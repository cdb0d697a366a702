use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::amount::Amount;
use super::group::Group;
use super::student::Student;
use super::teacher::Teacher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionType {
    Group,
    Private,
}

impl SessionType {
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Group => "Group",
            SessionType::Private => "Private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [
        SessionStatus::Scheduled,
        SessionStatus::InProgress,
        SessionStatus::Completed,
        SessionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "SCHEDULED",
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "Scheduled",
            SessionStatus::InProgress => "In progress",
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
        }
    }

    /// Whether attendance may still be taken for a session in this state
    pub fn is_open(&self) -> bool {
        matches!(self, SessionStatus::Scheduled | SessionStatus::InProgress)
    }
}

/// A scheduled class meeting (backend "session")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSession {
    pub id: i64,
    #[serde(default)]
    pub schedule: Option<i64>,
    pub teacher: i64,
    #[serde(default)]
    pub student: Option<i64>,
    #[serde(default)]
    pub group: Option<i64>,
    pub date: NaiveDate,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default)]
    pub payment: Amount,
    pub status: SessionStatus,
}

impl ClassSession {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }

    pub fn time_range_label(&self) -> String {
        format!(
            "{}–{}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }

    pub fn type_label(&self) -> &'static str {
        self.session_type.label()
    }

    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusChange {
    pub status: SessionStatus,
}

/// Body for creating a (possibly recurring) schedule
#[derive(Debug, Clone, Serialize)]
pub struct SchedulePayload {
    pub teacher_id: i64,
    #[serde(rename = "type")]
    pub schedule_type: ScheduleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    pub day: u8,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    pub is_recurring: bool,
    pub payment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Group,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleValidationError {
    #[error("A group schedule needs a group")]
    MissingGroup,

    #[error("A private schedule needs a student")]
    MissingStudent,

    #[error("A schedule cannot have both a student and a group")]
    BothTargets,

    #[error("Day must be between 0 (Monday) and 6 (Sunday)")]
    InvalidDay,

    #[error("End time must be after start time")]
    EndBeforeStart,

    #[error("Payment must be a non-negative amount")]
    InvalidPayment,
}

impl SchedulePayload {
    /// Local form validation; the backend re-validates everything.
    pub fn validate(&self) -> Result<(), ScheduleValidationError> {
        if self.student_id.is_some() && self.group_id.is_some() {
            return Err(ScheduleValidationError::BothTargets);
        }
        match self.schedule_type {
            ScheduleKind::Group if self.group_id.is_none() => {
                return Err(ScheduleValidationError::MissingGroup)
            }
            ScheduleKind::Private if self.student_id.is_none() => {
                return Err(ScheduleValidationError::MissingStudent)
            }
            _ => {}
        }
        if self.day > 6 {
            return Err(ScheduleValidationError::InvalidDay);
        }
        if self.start_time >= self.end_time {
            return Err(ScheduleValidationError::EndBeforeStart);
        }
        match self.payment.trim().parse::<f64>() {
            Ok(p) if p >= 0.0 && p.is_finite() => Ok(()),
            _ => Err(ScheduleValidationError::InvalidPayment),
        }
    }
}

/// Recurring definition the backend materialises sessions from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    #[serde(default)]
    pub teacher: Option<Teacher>,
    #[serde(default)]
    pub student: Option<Student>,
    #[serde(default)]
    pub group: Option<Group>,
    #[serde(default)]
    pub days: Vec<u8>,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub payment: Amount,
}

impl Schedule {
    pub fn target_label(&self) -> String {
        match (&self.group, &self.student) {
            (Some(group), _) => format!("Group: {}", group.name),
            (None, Some(student)) => format!("Private: {}", student.name),
            (None, None) => "-".to_string(),
        }
    }

    pub fn teacher_name(&self) -> &str {
        self.teacher.as_ref().map(|t| t.name.as_str()).unwrap_or("-")
    }

    pub fn days_label(&self) -> String {
        let names: Vec<&str> = self
            .days
            .iter()
            .filter_map(|d| WEEKDAYS.get(*d as usize).copied())
            .collect();
        if names.is_empty() {
            "-".to_string()
        } else {
            names.join(", ")
        }
    }

    pub fn time_range_label(&self) -> String {
        format!(
            "{}–{}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Wall-clock times as the backend writes them ("09:00:00", sometimes "09:00")
pub mod clock {
    use super::*;

    pub fn parse(value: &str) -> Option<NaiveTime> {
        let value = value.trim();
        NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .ok()
    }

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time: {}", raw)))
    }
}
