use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::teacher::Teacher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Active,
    Inactive,
    Full,
    Archived,
}

impl GroupStatus {
    pub const ALL: [GroupStatus; 4] = [
        GroupStatus::Active,
        GroupStatus::Inactive,
        GroupStatus::Full,
        GroupStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Active => "active",
            GroupStatus::Inactive => "inactive",
            GroupStatus::Full => "full",
            GroupStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value.trim())
    }
}

impl Default for GroupStatus {
    fn default() -> Self {
        GroupStatus::Active
    }
}

pub const LANGUAGES: [&str; 10] = [
    "English",
    "Spanish",
    "French",
    "German",
    "Italian",
    "Portuguese",
    "Russian",
    "Chinese",
    "Japanese",
    "Korean",
];

pub const LEVELS: [&str; 6] = [
    "Beginner",
    "Elementary",
    "Intermediate",
    "Upper Intermediate",
    "Advanced",
    "Proficient",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub teacher: Option<Teacher>,
    pub max_capacity: u32,
    #[serde(default)]
    pub status: GroupStatus,
    #[serde(default)]
    pub current_capacity: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Member student ids
    #[serde(default)]
    pub students: Vec<i64>,
}

impl Group {
    pub fn matches_search(&self, query: &str) -> bool {
        super::matches_any(
            query,
            [
                self.name.as_str(),
                self.language.as_str(),
                self.level.as_str(),
                self.teacher_name(),
            ],
        )
    }

    pub fn teacher_name(&self) -> &str {
        self.teacher.as_ref().map(|t| t.name.as_str()).unwrap_or("Unassigned")
    }

    pub fn capacity_label(&self) -> String {
        format!(
            "{}/{}",
            self.current_capacity.unwrap_or(self.students.len() as u32),
            self.max_capacity
        )
    }

    pub fn has_member(&self, student_id: i64) -> bool {
        self.students.contains(&student_id)
    }
}

/// Body for creating or updating a group
#[derive(Debug, Clone, Serialize)]
pub struct GroupPayload {
    pub name: String,
    pub description: String,
    pub language: String,
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<i64>,
    pub max_capacity: u32,
    pub status: GroupStatus,
}

/// Body for the add/remove member actions
#[derive(Debug, Clone, Serialize)]
pub struct GroupMemberPayload {
    pub student_id: i64,
}

/// Message-only response of the member actions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupMemberReceipt {
    #[serde(default)]
    pub message: Option<String>,
}
