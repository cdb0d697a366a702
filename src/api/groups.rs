use askama::Template;
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::api::forms::{non_blank, parse_opt, SearchQuery};
use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::AppState;
use crate::error::{recoverable, AppError};
use crate::models::group::{GroupPayload, LANGUAGES, LEVELS};
use crate::models::{Group, GroupStatus, Student, Teacher};
use crate::services::backend;
use crate::services::feedback::Toast;

#[derive(Template)]
#[template(path = "groups/list.html")]
struct GroupListTemplate {
    layout: Layout,
    groups: Vec<Group>,
    search: String,
    total: usize,
}

async fn list_groups(
    page: PageContext,
    Query(query): Query<SearchQuery>,
) -> Result<GroupListTemplate, AppError> {
    let groups = backend::groups::list_groups(&page.api).await?;
    let total = groups.len();
    let search = query.text();
    let groups = groups
        .into_iter()
        .filter(|g| g.matches_search(&search))
        .collect();

    Ok(GroupListTemplate {
        layout: page.layout(Nav::Groups).await?,
        groups,
        search,
        total,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub level: String,
    pub teacher: Option<String>,
    pub max_capacity: Option<String>,
    pub status: Option<String>,
}

impl GroupForm {
    fn from_group(group: &Group) -> Self {
        Self {
            name: group.name.clone(),
            description: group.description.clone(),
            language: group.language.clone(),
            level: group.level.clone(),
            teacher: group.teacher.as_ref().map(|t| t.id.to_string()),
            max_capacity: Some(group.max_capacity.to_string()),
            status: Some(group.status.as_str().to_string()),
        }
    }

    fn payload(&self) -> Result<GroupPayload, String> {
        if self.name.trim().is_empty() {
            return Err("Group name is required".to_string());
        }
        let max_capacity = parse_opt::<u32>(&self.max_capacity)
            .filter(|c| *c > 0)
            .ok_or_else(|| "Maximum capacity must be a positive number".to_string())?;
        Ok(GroupPayload {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            language: self.language.trim().to_string(),
            level: self.level.trim().to_string(),
            teacher: parse_opt(&self.teacher),
            max_capacity,
            status: non_blank(&self.status)
                .and_then(|s| GroupStatus::parse(&s))
                .unwrap_or_default(),
        })
    }

    fn teacher_id(&self) -> Option<i64> {
        parse_opt(&self.teacher)
    }

    fn status_value(&self) -> String {
        non_blank(&self.status).unwrap_or_else(|| GroupStatus::default().as_str().to_string())
    }

    fn capacity_value(&self) -> String {
        non_blank(&self.max_capacity).unwrap_or_default()
    }
}

#[derive(Template)]
#[template(path = "groups/form.html")]
struct GroupFormTemplate {
    layout: Layout,
    heading: &'static str,
    action: String,
    form: GroupForm,
    teachers: Vec<Teacher>,
    languages: [&'static str; 10],
    levels: [&'static str; 6],
    statuses: [GroupStatus; 4],
}

impl GroupFormTemplate {
    fn is_teacher(&self, teacher: &Teacher) -> bool {
        self.form.teacher_id() == Some(teacher.id)
    }

    fn is_status(&self, status: &GroupStatus) -> bool {
        self.form.status_value() == status.as_str()
    }

    fn is_language(&self, language: &str) -> bool {
        self.form.language.trim() == language
    }

    fn is_level(&self, level: &str) -> bool {
        self.form.level.trim() == level
    }
}

fn form_page(
    layout: Layout,
    group_id: Option<i64>,
    form: GroupForm,
    teachers: Vec<Teacher>,
) -> GroupFormTemplate {
    GroupFormTemplate {
        layout,
        heading: if group_id.is_some() { "Edit group" } else { "New group" },
        action: group_id
            .map(|id| format!("/groups/{}", id))
            .unwrap_or_else(|| "/groups".to_string()),
        form,
        teachers,
        languages: LANGUAGES,
        levels: LEVELS,
        statuses: GroupStatus::ALL,
    }
}

async fn new_group(page: PageContext) -> Result<GroupFormTemplate, AppError> {
    let teachers = backend::teachers::list_teachers(&page.api).await?;
    let form = GroupForm {
        max_capacity: Some("10".to_string()),
        ..Default::default()
    };
    Ok(form_page(page.layout(Nav::Groups).await?, None, form, teachers))
}

async fn edit_group(page: PageContext, Path(id): Path<i64>) -> Result<GroupFormTemplate, AppError> {
    let (group, teachers) = tokio::try_join!(
        backend::groups::get_group(&page.api, id),
        backend::teachers::list_teachers(&page.api),
    )?;
    Ok(form_page(
        page.layout(Nav::Groups).await?,
        Some(id),
        GroupForm::from_group(&group),
        teachers,
    ))
}

async fn save_group(page: PageContext, group_id: Option<i64>, form: GroupForm) -> Result<Response, AppError> {
    let payload = match form.payload() {
        Ok(payload) => payload,
        Err(message) => {
            let teachers = backend::teachers::list_teachers(&page.api).await?;
            let layout = page.layout_with(Nav::Groups, Toast::error("Invalid group", message));
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                form_page(layout, group_id, form, teachers),
            )
                .into_response());
        }
    };

    let result = match group_id {
        Some(id) => backend::groups::update_group(&page.api, id, &payload).await,
        None => backend::groups::create_group(&page.api, &payload).await,
    };

    match result {
        Ok(group) => {
            tracing::info!(group_id = group.id, created = group_id.is_none(), "Group saved");
            page.flash_redirect(
                Toast::success("Group saved", format!("{} was saved", group.name)),
                &format!("/groups/{}", group.id),
            )
            .await
        }
        Err(e) => {
            let e = recoverable(e)?;
            tracing::info!(error = %e, "Group rejected by backend");
            let teachers = backend::teachers::list_teachers(&page.api).await?;
            let title = if group_id.is_some() {
                "Failed to update group"
            } else {
                "Failed to create group"
            };
            let layout = page.layout_with(Nav::Groups, Toast::from_api_error(title, &e));
            Ok((StatusCode::UNPROCESSABLE_ENTITY, form_page(layout, group_id, form, teachers)).into_response())
        }
    }
}

async fn create_group(page: PageContext, Form(form): Form<GroupForm>) -> Result<Response, AppError> {
    save_group(page, None, form).await
}

async fn update_group(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<GroupForm>,
) -> Result<Response, AppError> {
    save_group(page, Some(id), form).await
}

async fn delete_group(page: PageContext, Path(id): Path<i64>) -> Result<Response, AppError> {
    let toast = match backend::groups::delete_group(&page.api, id).await {
        Ok(()) => Toast::success("Group deleted", "The group was removed"),
        Err(e) => Toast::from_api_error("Failed to delete group", &recoverable(e)?),
    };
    page.flash_redirect(toast, "/groups").await
}

#[derive(Template)]
#[template(path = "groups/show.html")]
struct GroupDetailTemplate {
    layout: Layout,
    group: Group,
    members: Vec<Student>,
    candidates: Vec<Student>,
    search: String,
}

async fn show_group(
    page: PageContext,
    Path(id): Path<i64>,
    Query(query): Query<SearchQuery>,
) -> Result<GroupDetailTemplate, AppError> {
    let (group, students) = tokio::try_join!(
        backend::groups::get_group(&page.api, id),
        backend::students::list_students(&page.api),
    )?;

    // The search narrows both lists, as on the members dialog
    let search = query.text();
    let (members, candidates): (Vec<Student>, Vec<Student>) = students
        .into_iter()
        .filter(|s| s.matches_search(&search))
        .partition(|s| group.has_member(s.id));

    Ok(GroupDetailTemplate {
        layout: page.layout(Nav::Groups).await?,
        group,
        members,
        candidates,
        search,
    })
}

#[derive(Debug, Deserialize)]
pub struct MemberForm {
    pub student_id: i64,
}

async fn add_member(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<MemberForm>,
) -> Result<Response, AppError> {
    let toast = match backend::groups::add_student(&page.api, id, form.student_id).await {
        Ok(receipt) => Toast::success(
            "Student added",
            receipt
                .message
                .unwrap_or_else(|| "The student joined the group".to_string()),
        ),
        Err(e) => Toast::from_api_error("Failed to add student", &recoverable(e)?),
    };
    page.flash_redirect(toast, &format!("/groups/{}", id)).await
}

async fn remove_member(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<MemberForm>,
) -> Result<Response, AppError> {
    let toast = match backend::groups::remove_student(&page.api, id, form.student_id).await {
        Ok(receipt) => Toast::success(
            "Student removed",
            receipt
                .message
                .unwrap_or_else(|| "The student left the group".to_string()),
        ),
        Err(e) => Toast::from_api_error("Failed to remove student", &recoverable(e)?),
    };
    page.flash_redirect(toast, &format!("/groups/{}", id)).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/new", get(new_group))
        .route("/groups/:id", get(show_group).post(update_group))
        .route("/groups/:id/edit", get(edit_group))
        .route("/groups/:id/delete", post(delete_group))
        .route("/groups/:id/members", post(add_member))
        .route("/groups/:id/members/remove", post(remove_member))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_validation() {
        let form = GroupForm {
            name: "Morning B1".to_string(),
            max_capacity: Some("0".to_string()),
            ..Default::default()
        };
        assert!(form.payload().is_err());

        let form = GroupForm {
            name: "Morning B1".to_string(),
            max_capacity: Some("12".to_string()),
            teacher: Some("".to_string()),
            status: Some("full".to_string()),
            ..Default::default()
        };
        let payload = form.payload().unwrap();
        assert_eq!(payload.teacher, None);
        assert_eq!(payload.status, GroupStatus::Full);
        assert_eq!(payload.max_capacity, 12);
    }
}
