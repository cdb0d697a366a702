// Models module - records mirrored from the school backend

pub mod amount;
pub mod attendance;
pub mod auth;
pub mod group;
pub mod parent;
pub mod plan;
pub mod session;
pub mod student;
pub mod teacher;

pub use amount::Amount;
pub use attendance::{AttendanceRecord, AttendanceStatus, AttendanceUpdate};
pub use auth::{AuthTokens, CurrentUser, UserAccount, UserRole};
pub use group::{Group, GroupStatus};
pub use parent::Parent;
pub use plan::{Plan, StudentSubscription};
pub use session::{ClassSession, Schedule, SessionStatus, SessionType};
pub use student::Student;
pub use teacher::Teacher;

/// Case-insensitive substring search over a record's text fields. A blank
/// query matches everything.
pub fn matches_any<'a>(query: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || fields
            .into_iter()
            .any(|field| field.to_lowercase().contains(&query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_any() {
        assert!(matches_any("  ", ["Ana"]));
        assert!(matches_any("LOP", ["Ana Lopez", "ana@school.test"]));
        assert!(!matches_any("garcia", ["Ana Lopez", "ana@school.test"]));
    }
}
