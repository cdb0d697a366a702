use super::{ApiError, ApiSession};
use crate::models::attendance::{
    AttendancePayload, AttendanceRecord, AttendanceStatus, AttendanceSubmission, AttendanceUpdate,
    StatusChange,
};

const ATTENDANCE: &str = "students/attendance/";

#[tracing::instrument(skip(api))]
pub async fn list_attendance(api: &ApiSession) -> Result<Vec<AttendanceRecord>, ApiError> {
    api.list(ATTENDANCE, &[]).await
}

/// Changes a record's status. The backend adjusts the student's lessons and
/// balance and reports the resulting counters.
#[tracing::instrument(skip(api), fields(status = %status))]
pub async fn change_status(
    api: &ApiSession,
    record_id: i64,
    status: AttendanceStatus,
) -> Result<AttendanceUpdate, ApiError> {
    api.patch(
        &format!("{}{}/", ATTENDANCE, record_id),
        &StatusChange { status },
    )
    .await
}

/// Records a student as present in a class session
#[tracing::instrument(skip(api))]
pub async fn submit_scan(
    api: &ApiSession,
    session_id: i64,
    student_id: i64,
) -> Result<AttendanceSubmission, ApiError> {
    api.post(
        ATTENDANCE,
        &AttendancePayload {
            student: student_id,
            session: session_id,
            status: AttendanceStatus::Present,
        },
    )
    .await
}
