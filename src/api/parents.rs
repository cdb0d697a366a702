use askama::Template;
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::api::forms::{non_blank, SearchQuery};
use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::AppState;
use crate::error::{recoverable, AppError};
use crate::models::parent::ParentPayload;
use crate::models::{Parent, Student};
use crate::services::backend;
use crate::services::feedback::Toast;

#[derive(Template)]
#[template(path = "parents/list.html")]
struct ParentListTemplate {
    layout: Layout,
    parents: Vec<Parent>,
    search: String,
    total: usize,
}

async fn list_parents(
    page: PageContext,
    Query(query): Query<SearchQuery>,
) -> Result<ParentListTemplate, AppError> {
    let parents = backend::parents::list_parents(&page.api).await?;
    let total = parents.len();
    let search = query.text();
    let parents = parents
        .into_iter()
        .filter(|p| p.matches_search(&search))
        .collect();

    Ok(ParentListTemplate {
        layout: page.layout(Nav::Parents).await?,
        parents,
        search,
        total,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    pub password: Option<String>,
}

impl ParentForm {
    fn payload(&self) -> Result<ParentPayload, String> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err("Name and email are required".to_string());
        }
        Ok(ParentPayload {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            password: non_blank(&self.password),
        })
    }
}

#[derive(Template)]
#[template(path = "parents/form.html")]
struct ParentFormTemplate {
    layout: Layout,
    heading: &'static str,
    action: String,
    form: ParentForm,
    is_new: bool,
}

fn form_page(layout: Layout, parent_id: Option<i64>, form: ParentForm) -> ParentFormTemplate {
    ParentFormTemplate {
        layout,
        heading: if parent_id.is_some() { "Edit parent" } else { "New parent" },
        action: parent_id
            .map(|id| format!("/parents/{}", id))
            .unwrap_or_else(|| "/parents".to_string()),
        form,
        is_new: parent_id.is_none(),
    }
}

async fn new_parent(page: PageContext) -> Result<ParentFormTemplate, AppError> {
    Ok(form_page(page.layout(Nav::Parents).await?, None, ParentForm::default()))
}

async fn edit_parent(page: PageContext, Path(id): Path<i64>) -> Result<ParentFormTemplate, AppError> {
    let parent = backend::parents::get_parent(&page.api, id).await?;
    let form = ParentForm {
        name: parent.name,
        email: parent.email,
        phone_number: parent.phone_number,
        password: None,
    };
    Ok(form_page(page.layout(Nav::Parents).await?, Some(id), form))
}

async fn save_parent(page: PageContext, parent_id: Option<i64>, form: ParentForm) -> Result<Response, AppError> {
    let payload = match form.payload() {
        Ok(payload) => payload,
        Err(message) => {
            let layout = page.layout_with(Nav::Parents, Toast::error("Missing fields", message));
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                form_page(layout, parent_id, form),
            )
                .into_response());
        }
    };

    let result = match parent_id {
        Some(id) => backend::parents::update_parent(&page.api, id, &payload).await,
        None => backend::parents::create_parent(&page.api, &payload).await,
    };

    match result {
        Ok(parent) => {
            page.flash_redirect(
                Toast::success("Parent saved", format!("{} was saved", parent.name)),
                &format!("/parents/{}", parent.id),
            )
            .await
        }
        Err(e) => {
            let e = recoverable(e)?;
            let layout = page.layout_with(Nav::Parents, Toast::from_api_error("Failed to save parent", &e));
            Ok((StatusCode::UNPROCESSABLE_ENTITY, form_page(layout, parent_id, form)).into_response())
        }
    }
}

async fn create_parent(page: PageContext, Form(form): Form<ParentForm>) -> Result<Response, AppError> {
    save_parent(page, None, form).await
}

async fn update_parent(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<ParentForm>,
) -> Result<Response, AppError> {
    save_parent(page, Some(id), form).await
}

async fn delete_parent(page: PageContext, Path(id): Path<i64>) -> Result<Response, AppError> {
    let toast = match backend::parents::delete_parent(&page.api, id).await {
        Ok(()) => Toast::success("Parent deleted", "The parent was removed"),
        Err(e) => Toast::from_api_error("Failed to delete parent", &recoverable(e)?),
    };
    page.flash_redirect(toast, "/parents").await
}

#[derive(Template)]
#[template(path = "parents/show.html")]
struct ParentDetailTemplate {
    layout: Layout,
    parent: Parent,
    candidates: Vec<Student>,
}

async fn show_parent(page: PageContext, Path(id): Path<i64>) -> Result<ParentDetailTemplate, AppError> {
    let (parent, students) = tokio::try_join!(
        backend::parents::get_parent(&page.api, id),
        backend::students::list_students(&page.api),
    )?;

    let candidates = students
        .into_iter()
        .filter(|s| !parent.children.iter().any(|c| c.id == s.id))
        .collect();

    Ok(ParentDetailTemplate {
        layout: page.layout(Nav::Parents).await?,
        parent,
        candidates,
    })
}

#[derive(Debug, Deserialize)]
pub struct ChildForm {
    pub student_id: i64,
}

async fn link_child(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<ChildForm>,
) -> Result<Response, AppError> {
    let toast = match backend::parents::link_child(&page.api, id, form.student_id).await {
        Ok(_) => Toast::success("Child linked", "The student was linked to this parent"),
        Err(e) => Toast::from_api_error("Failed to link child", &recoverable(e)?),
    };
    page.flash_redirect(toast, &format!("/parents/{}", id)).await
}

async fn unlink_child(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<ChildForm>,
) -> Result<Response, AppError> {
    let toast = match backend::parents::unlink_child(&page.api, id, form.student_id).await {
        Ok(()) => Toast::success("Child unlinked", "The student is no longer linked to this parent"),
        Err(e) => Toast::from_api_error("Failed to unlink child", &recoverable(e)?),
    };
    page.flash_redirect(toast, &format!("/parents/{}", id)).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/parents", get(list_parents).post(create_parent))
        .route("/parents/new", get(new_parent))
        .route("/parents/:id", get(show_parent).post(update_parent))
        .route("/parents/:id/edit", get(edit_parent))
        .route("/parents/:id/delete", post(delete_parent))
        .route("/parents/:id/children", post(link_child))
        .route("/parents/:id/children/remove", post(unlink_child))
}
