use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::amount::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 3] = [
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::Late,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Late => "Late",
        }
    }

    /// Case-insensitive; older backend data uses upper case.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        AttendanceStatus::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown attendance status: {}", raw)))
    }
}

/// One attendance log entry.
///
/// `student` and `session` are backend ids. The display fields are filled in
/// by the backend when it denormalises the record for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student: i64,
    #[serde(default)]
    pub session: Option<i64>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub scanned_at: Option<DateTime<Utc>>,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub lessons_remaining: Option<i64>,
}

fn default_valid() -> bool {
    true
}

impl AttendanceRecord {
    pub fn display_name(&self) -> String {
        match &self.student_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("Student #{}", self.student),
        }
    }

    /// Calendar day of the record: explicit date, else the scan day
    pub fn day(&self) -> Option<NaiveDate> {
        self.date
            .or_else(|| self.scanned_at.map(|at| at.date_naive()))
    }

    pub fn day_label(&self) -> String {
        self.day()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn notes_label(&self) -> &str {
        self.notes.as_deref().unwrap_or("")
    }

    pub fn lessons_label(&self) -> String {
        self.lessons_remaining
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub status: AttendanceStatus,
}

/// Body for recording a scan inside a class session
#[derive(Debug, Clone, Serialize)]
pub struct AttendancePayload {
    pub student: i64,
    pub session: i64,
    pub status: AttendanceStatus,
}

/// Body of the per-student scan endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ScanPayload {
    pub qr_code: String,
}

/// Response of a status change: the saved record plus the backend's counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceUpdate {
    pub attendance: AttendanceRecord,
    #[serde(alias = "lessonsRemaining")]
    pub lessons_remaining: i64,
    #[serde(default, alias = "subscriptionBalance")]
    pub subscription_balance: Amount,
}

/// The attendance create endpoint answers either with counters or with the
/// bare record, depending on backend version.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttendanceSubmission {
    Update(AttendanceUpdate),
    Record(AttendanceRecord),
}

impl AttendanceSubmission {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            AttendanceSubmission::Update(update) => &update.attendance,
            AttendanceSubmission::Record(record) => record,
        }
    }

    pub fn lessons_remaining(&self) -> Option<i64> {
        match self {
            AttendanceSubmission::Update(update) => Some(update.lessons_remaining),
            AttendanceSubmission::Record(record) => record.lessons_remaining,
        }
    }
}
