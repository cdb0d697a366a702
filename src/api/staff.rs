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
use crate::models::teacher::{split_specializations, TeacherPayload};
use crate::models::Teacher;
use crate::services::backend;
use crate::services::feedback::Toast;

#[derive(Template)]
#[template(path = "staff/list.html")]
struct StaffListTemplate {
    layout: Layout,
    teachers: Vec<Teacher>,
    search: String,
    total: usize,
}

async fn list_staff(
    page: PageContext,
    Query(query): Query<SearchQuery>,
) -> Result<StaffListTemplate, AppError> {
    let teachers = backend::teachers::list_teachers(&page.api).await?;
    let total = teachers.len();
    let search = query.text();
    let teachers = teachers
        .into_iter()
        .filter(|t| t.matches_search(&search))
        .collect();

    Ok(StaffListTemplate {
        layout: page.layout(Nav::Staff).await?,
        teachers,
        search,
        total,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeacherForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    /// Comma-separated
    #[serde(default)]
    pub specializations: String,
    pub password: Option<String>,
}

impl TeacherForm {
    fn payload(&self) -> Result<TeacherPayload, String> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err("Name and email are required".to_string());
        }
        Ok(TeacherPayload {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            specializations: split_specializations(&self.specializations),
            password: non_blank(&self.password),
        })
    }
}

#[derive(Template)]
#[template(path = "staff/form.html")]
struct TeacherFormTemplate {
    layout: Layout,
    heading: &'static str,
    action: String,
    form: TeacherForm,
    is_new: bool,
}

fn form_page(layout: Layout, teacher_id: Option<i64>, form: TeacherForm) -> TeacherFormTemplate {
    TeacherFormTemplate {
        layout,
        heading: if teacher_id.is_some() { "Edit teacher" } else { "New teacher" },
        action: teacher_id
            .map(|id| format!("/staff/{}", id))
            .unwrap_or_else(|| "/staff".to_string()),
        form,
        is_new: teacher_id.is_none(),
    }
}

async fn new_teacher(page: PageContext) -> Result<TeacherFormTemplate, AppError> {
    Ok(form_page(page.layout(Nav::Staff).await?, None, TeacherForm::default()))
}

async fn edit_teacher(
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<TeacherFormTemplate, AppError> {
    let teacher = backend::teachers::get_teacher(&page.api, id).await?;
    let form = TeacherForm {
        name: teacher.name,
        email: teacher.email,
        phone_number: teacher.phone_number,
        specializations: teacher.specializations.join(", "),
        password: None,
    };
    Ok(form_page(page.layout(Nav::Staff).await?, Some(id), form))
}

/// Create and update share everything but the backend call
async fn save_teacher(
    page: PageContext,
    teacher_id: Option<i64>,
    form: TeacherForm,
) -> Result<Response, AppError> {
    let payload = match form.payload() {
        Ok(payload) => payload,
        Err(message) => {
            let layout = page.layout_with(Nav::Staff, Toast::error("Missing fields", message));
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                form_page(layout, teacher_id, form),
            )
                .into_response());
        }
    };

    let result = match teacher_id {
        Some(id) => backend::teachers::update_teacher(&page.api, id, &payload).await,
        None => backend::teachers::create_teacher(&page.api, &payload).await,
    };

    match result {
        Ok(teacher) => {
            tracing::info!(teacher_id = teacher.id, created = teacher_id.is_none(), "Teacher saved");
            page.flash_redirect(
                Toast::success("Teacher saved", format!("{} was saved", teacher.name)),
                "/staff",
            )
            .await
        }
        Err(e) => {
            let e = recoverable(e)?;
            let layout = page.layout_with(Nav::Staff, Toast::from_api_error("Failed to save teacher", &e));
            Ok((StatusCode::UNPROCESSABLE_ENTITY, form_page(layout, teacher_id, form)).into_response())
        }
    }
}

async fn create_teacher(page: PageContext, Form(form): Form<TeacherForm>) -> Result<Response, AppError> {
    save_teacher(page, None, form).await
}

async fn update_teacher(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<TeacherForm>,
) -> Result<Response, AppError> {
    save_teacher(page, Some(id), form).await
}

async fn delete_teacher(page: PageContext, Path(id): Path<i64>) -> Result<Response, AppError> {
    let toast = match backend::teachers::delete_teacher(&page.api, id).await {
        Ok(()) => Toast::success("Teacher deleted", "The teacher was removed"),
        Err(e) => Toast::from_api_error("Failed to delete teacher", &recoverable(e)?),
    };
    page.flash_redirect(toast, "/staff").await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/staff", get(list_staff).post(create_teacher))
        .route("/staff/new", get(new_teacher))
        .route("/staff/:id", post(update_teacher))
        .route("/staff/:id/edit", get(edit_teacher))
        .route("/staff/:id/delete", post(delete_teacher))
}
