use super::{ApiError, ApiSession};
use crate::models::teacher::{Teacher, TeacherPayload};

const TEACHERS: &str = "students/teachers/";

fn detail(id: i64) -> String {
    format!("{}{}/", TEACHERS, id)
}

#[tracing::instrument(skip(api))]
pub async fn list_teachers(api: &ApiSession) -> Result<Vec<Teacher>, ApiError> {
    api.list(TEACHERS, &[]).await
}

#[tracing::instrument(skip(api))]
pub async fn get_teacher(api: &ApiSession, id: i64) -> Result<Teacher, ApiError> {
    api.get(&detail(id), &[]).await
}

#[tracing::instrument(skip(api, payload), fields(email = %payload.email))]
pub async fn create_teacher(api: &ApiSession, payload: &TeacherPayload) -> Result<Teacher, ApiError> {
    api.post(TEACHERS, payload).await
}

#[tracing::instrument(skip(api, payload))]
pub async fn update_teacher(
    api: &ApiSession,
    id: i64,
    payload: &TeacherPayload,
) -> Result<Teacher, ApiError> {
    api.patch(&detail(id), payload).await
}

#[tracing::instrument(skip(api))]
pub async fn delete_teacher(api: &ApiSession, id: i64) -> Result<(), ApiError> {
    api.delete(&detail(id)).await
}
