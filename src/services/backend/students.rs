use super::{ApiError, ApiSession};
use crate::models::attendance::ScanPayload;
use crate::models::student::{LessonReceipt, QrRefreshReceipt, Student, StudentPayload};

const STUDENTS: &str = "students/students/";

fn detail(id: i64) -> String {
    format!("{}{}/", STUDENTS, id)
}

#[tracing::instrument(skip(api))]
pub async fn list_students(api: &ApiSession) -> Result<Vec<Student>, ApiError> {
    api.list(STUDENTS, &[]).await
}

#[tracing::instrument(skip(api))]
pub async fn get_student(api: &ApiSession, id: i64) -> Result<Student, ApiError> {
    api.get(&detail(id), &[]).await
}

#[tracing::instrument(skip(api, payload), fields(email = %payload.email))]
pub async fn create_student(api: &ApiSession, payload: &StudentPayload) -> Result<Student, ApiError> {
    api.post(STUDENTS, payload).await
}

#[tracing::instrument(skip(api, payload))]
pub async fn update_student(
    api: &ApiSession,
    id: i64,
    payload: &StudentPayload,
) -> Result<Student, ApiError> {
    api.patch(&detail(id), payload).await
}

#[tracing::instrument(skip(api))]
pub async fn delete_student(api: &ApiSession, id: i64) -> Result<(), ApiError> {
    api.delete(&detail(id)).await
}

/// Deducts one lesson without a class session (quick scan)
#[tracing::instrument(skip(api))]
pub async fn reduce_lesson(api: &ApiSession, id: i64) -> Result<LessonReceipt, ApiError> {
    api.post(&format!("{}reduce_lesson/", detail(id)), &serde_json::json!({}))
        .await
}

/// Marks today's attendance through the per-student scan endpoint
#[tracing::instrument(skip(api))]
pub async fn scan_student(
    api: &ApiSession,
    student_id: i64,
    qr_code: &str,
) -> Result<LessonReceipt, ApiError> {
    api.post(
        &format!("students/attendance/scan/{}/", student_id),
        &ScanPayload {
            qr_code: qr_code.to_string(),
        },
    )
    .await
}

#[tracing::instrument(skip(api))]
pub async fn refresh_qr(api: &ApiSession, id: i64) -> Result<QrRefreshReceipt, ApiError> {
    api.post(&format!("{}refresh-qr/", detail(id)), &serde_json::json!({}))
        .await
}
