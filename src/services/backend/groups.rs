use super::{ApiError, ApiSession};
use crate::models::group::{Group, GroupMemberPayload, GroupMemberReceipt, GroupPayload};

const GROUPS: &str = "students/groups/";

fn detail(id: i64) -> String {
    format!("{}{}/", GROUPS, id)
}

#[tracing::instrument(skip(api))]
pub async fn list_groups(api: &ApiSession) -> Result<Vec<Group>, ApiError> {
    api.list(GROUPS, &[]).await
}

#[tracing::instrument(skip(api))]
pub async fn get_group(api: &ApiSession, id: i64) -> Result<Group, ApiError> {
    api.get(&detail(id), &[]).await
}

#[tracing::instrument(skip(api, payload), fields(name = %payload.name))]
pub async fn create_group(api: &ApiSession, payload: &GroupPayload) -> Result<Group, ApiError> {
    api.post(GROUPS, payload).await
}

#[tracing::instrument(skip(api, payload))]
pub async fn update_group(
    api: &ApiSession,
    id: i64,
    payload: &GroupPayload,
) -> Result<Group, ApiError> {
    api.patch(&detail(id), payload).await
}

#[tracing::instrument(skip(api))]
pub async fn delete_group(api: &ApiSession, id: i64) -> Result<(), ApiError> {
    api.delete(&detail(id)).await
}

#[tracing::instrument(skip(api))]
pub async fn add_student(
    api: &ApiSession,
    group_id: i64,
    student_id: i64,
) -> Result<GroupMemberReceipt, ApiError> {
    let receipt: Option<GroupMemberReceipt> = api
        .post(
            &format!("{}add_student/", detail(group_id)),
            &GroupMemberPayload { student_id },
        )
        .await?;
    Ok(receipt.unwrap_or_default())
}

#[tracing::instrument(skip(api))]
pub async fn remove_student(
    api: &ApiSession,
    group_id: i64,
    student_id: i64,
) -> Result<GroupMemberReceipt, ApiError> {
    let receipt: Option<GroupMemberReceipt> = api
        .post(
            &format!("{}remove_student/", detail(group_id)),
            &GroupMemberPayload { student_id },
        )
        .await?;
    Ok(receipt.unwrap_or_default())
}
