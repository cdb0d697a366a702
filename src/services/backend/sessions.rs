use chrono::NaiveDate;

use super::{ApiError, ApiSession};
use crate::models::session::{ClassSession, Schedule, SchedulePayload, SessionStatus, SessionStatusChange};

const SESSIONS: &str = "students/sessions/";
const SCHEDULES: &str = "students/schedules/";

/// Class sessions on one calendar day
#[tracing::instrument(skip(api))]
pub async fn list_sessions_on(api: &ApiSession, date: NaiveDate) -> Result<Vec<ClassSession>, ApiError> {
    api.list(SESSIONS, &[("date", date.format("%Y-%m-%d").to_string())])
        .await
}

#[tracing::instrument(skip(api))]
pub async fn get_session(api: &ApiSession, id: i64) -> Result<ClassSession, ApiError> {
    api.get(&format!("{}{}/", SESSIONS, id), &[]).await
}

/// Moves a session to another state (started, completed, cancelled)
#[tracing::instrument(skip(api), fields(status = status.as_str()))]
pub async fn update_session_status(
    api: &ApiSession,
    id: i64,
    status: SessionStatus,
) -> Result<ClassSession, ApiError> {
    api.patch(&format!("{}{}/", SESSIONS, id), &SessionStatusChange { status })
        .await
}

#[tracing::instrument(skip(api))]
pub async fn delete_session(api: &ApiSession, id: i64) -> Result<(), ApiError> {
    api.delete(&format!("{}{}/", SESSIONS, id)).await
}

#[tracing::instrument(skip(api))]
pub async fn list_schedules(api: &ApiSession) -> Result<Vec<Schedule>, ApiError> {
    api.list(SCHEDULES, &[]).await
}

/// Creates a schedule; the backend materialises its sessions
#[tracing::instrument(skip(api, payload), fields(teacher_id = payload.teacher_id, day = payload.day))]
pub async fn create_schedule(api: &ApiSession, payload: &SchedulePayload) -> Result<Schedule, ApiError> {
    api.post(SCHEDULES, payload).await
}

#[tracing::instrument(skip(api))]
pub async fn delete_schedule(api: &ApiSession, id: i64) -> Result<(), ApiError> {
    api.delete(&format!("{}{}/", SCHEDULES, id)).await
}
