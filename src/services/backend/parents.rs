use super::{ApiError, ApiSession};
use crate::models::parent::{Parent, ParentPayload, ParentStudentLink, ParentStudentLinkPayload};

const PARENTS: &str = "parents/parents/";
const LINKS: &str = "parents/parent-student-links/";

fn detail(id: i64) -> String {
    format!("{}{}/", PARENTS, id)
}

#[tracing::instrument(skip(api))]
pub async fn list_parents(api: &ApiSession) -> Result<Vec<Parent>, ApiError> {
    api.list(PARENTS, &[]).await
}

#[tracing::instrument(skip(api))]
pub async fn get_parent(api: &ApiSession, id: i64) -> Result<Parent, ApiError> {
    api.get(&detail(id), &[]).await
}

#[tracing::instrument(skip(api, payload), fields(email = %payload.email))]
pub async fn create_parent(api: &ApiSession, payload: &ParentPayload) -> Result<Parent, ApiError> {
    api.post(PARENTS, payload).await
}

#[tracing::instrument(skip(api, payload))]
pub async fn update_parent(
    api: &ApiSession,
    id: i64,
    payload: &ParentPayload,
) -> Result<Parent, ApiError> {
    api.patch(&detail(id), payload).await
}

#[tracing::instrument(skip(api))]
pub async fn delete_parent(api: &ApiSession, id: i64) -> Result<(), ApiError> {
    api.delete(&detail(id)).await
}

#[tracing::instrument(skip(api))]
pub async fn list_links(api: &ApiSession) -> Result<Vec<ParentStudentLink>, ApiError> {
    api.list(LINKS, &[]).await
}

#[tracing::instrument(skip(api))]
pub async fn link_child(
    api: &ApiSession,
    parent: i64,
    student: i64,
) -> Result<ParentStudentLink, ApiError> {
    api.post(LINKS, &ParentStudentLinkPayload { parent, student })
        .await
}

/// Removes the link between a parent and one of their children.
///
/// The backend addresses links by their own id, so the link is looked up first.
#[tracing::instrument(skip(api))]
pub async fn unlink_child(api: &ApiSession, parent: i64, student: i64) -> Result<(), ApiError> {
    let links = list_links(api).await?;
    let link = links
        .into_iter()
        .find(|l| l.parent == parent && l.student == student)
        .ok_or_else(|| ApiError::Backend {
            status: reqwest::StatusCode::NOT_FOUND,
            message: "Link not found".to_string(),
        })?;

    api.delete(&format!("{}{}/", LINKS, link.id)).await
}
