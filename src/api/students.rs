use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::api::forms::{non_blank, SearchQuery};
use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::AppState;
use crate::error::{recoverable, AppError};
use crate::models::group::LEVELS;
use crate::models::plan::{StudentSubscription, SubscriptionPayload};
use crate::models::student::StudentPayload;
use crate::models::{Plan, Student};
use crate::services::attendance;
use crate::services::backend;
use crate::services::feedback::{scan_failure_toast, Toast};
use crate::services::qr_generator;

#[derive(Template)]
#[template(path = "students/list.html")]
struct StudentListTemplate {
    layout: Layout,
    students: Vec<Student>,
    search: String,
    total: usize,
}

async fn list_students(
    page: PageContext,
    Query(query): Query<SearchQuery>,
) -> Result<StudentListTemplate, AppError> {
    let students = backend::students::list_students(&page.api).await?;
    let total = students.len();
    let search = query.text();

    let students = students
        .into_iter()
        .filter(|s| s.matches_search(&search))
        .collect();

    Ok(StudentListTemplate {
        layout: page.layout(Nav::Students).await?,
        students,
        search,
        total,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub level: String,
    pub password: Option<String>,
}

impl StudentForm {
    fn from_student(student: &Student) -> Self {
        Self {
            name: student.name.clone(),
            email: student.email.clone(),
            phone_number: student.phone_number.clone(),
            level: student.level.clone(),
            password: None,
        }
    }

    fn payload(&self) -> Result<StudentPayload, String> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err("Name and email are required".to_string());
        }
        Ok(StudentPayload {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            level: self.level.trim().to_string(),
            password: non_blank(&self.password),
        })
    }
}

#[derive(Template)]
#[template(path = "students/form.html")]
struct StudentFormTemplate {
    layout: Layout,
    heading: String,
    action: String,
    form: StudentForm,
    is_new: bool,
    levels: [&'static str; 6],
}

impl StudentFormTemplate {
    fn is_level(&self, level: &str) -> bool {
        self.form.level.trim() == level
    }

    fn render_with(
        layout: Layout,
        student_id: Option<i64>,
        form: StudentForm,
    ) -> Self {
        let (heading, action) = match student_id {
            Some(id) => ("Edit student".to_string(), format!("/students/{}", id)),
            None => ("New student".to_string(), "/students".to_string()),
        };
        Self {
            layout,
            heading,
            action,
            form,
            is_new: student_id.is_none(),
            levels: LEVELS,
        }
    }
}

async fn new_student(page: PageContext) -> Result<StudentFormTemplate, AppError> {
    Ok(StudentFormTemplate::render_with(
        page.layout(Nav::Students).await?,
        None,
        StudentForm::default(),
    ))
}

async fn create_student(
    page: PageContext,
    Form(form): Form<StudentForm>,
) -> Result<Response, AppError> {
    let payload = match form.payload() {
        Ok(payload) => payload,
        Err(message) => {
            let layout = page.layout_with(Nav::Students, Toast::error("Missing fields", message));
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                StudentFormTemplate::render_with(layout, None, form),
            )
                .into_response());
        }
    };

    match backend::students::create_student(&page.api, &payload).await {
        Ok(student) => {
            tracing::info!(student_id = student.id, "Student created");
            page.flash_redirect(
                Toast::success("Student created", format!("{} was added", student.name)),
                &format!("/students/{}", student.id),
            )
            .await
        }
        Err(e) => {
            let e = recoverable(e)?;
            let layout =
                page.layout_with(Nav::Students, Toast::from_api_error("Failed to create student", &e));
            Ok((StatusCode::UNPROCESSABLE_ENTITY, StudentFormTemplate::render_with(layout, None, form)).into_response())
        }
    }
}

#[derive(Template)]
#[template(path = "students/show.html")]
struct StudentDetailTemplate {
    layout: Layout,
    student: Student,
    qr_svg: String,
    subscriptions: Vec<SubscriptionRow>,
    plans: Vec<Plan>,
    today: String,
}

pub struct SubscriptionRow {
    pub plan_name: String,
    pub start_date: String,
    pub end_date: String,
}

pub fn subscription_rows(subscriptions: Vec<StudentSubscription>, plans: &[Plan]) -> Vec<SubscriptionRow> {
    subscriptions
        .into_iter()
        .map(|sub| SubscriptionRow {
            plan_name: plans
                .iter()
                .find(|p| p.id == sub.subscription_plan)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("Plan #{}", sub.subscription_plan)),
            start_date: sub.start_date.format("%Y-%m-%d").to_string(),
            end_date: sub
                .end_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

async fn show_student(
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<StudentDetailTemplate, AppError> {
    let (student, subscriptions, plans) = tokio::try_join!(
        backend::students::get_student(&page.api, id),
        backend::plans::list_subscriptions(&page.api, id),
        backend::plans::list_plans(&page.api),
    )?;

    let qr_svg = qr_generator::student_qr_svg(&student)?;

    Ok(StudentDetailTemplate {
        layout: page.layout(Nav::Students).await?,
        subscriptions: subscription_rows(subscriptions, &plans),
        student,
        qr_svg,
        plans,
        today: Local::now().date_naive().format("%Y-%m-%d").to_string(),
    })
}

async fn edit_student(
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<StudentFormTemplate, AppError> {
    let student = backend::students::get_student(&page.api, id).await?;
    Ok(StudentFormTemplate::render_with(
        page.layout(Nav::Students).await?,
        Some(id),
        StudentForm::from_student(&student),
    ))
}

async fn update_student(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<StudentForm>,
) -> Result<Response, AppError> {
    let payload = match form.payload() {
        Ok(payload) => payload,
        Err(message) => {
            let layout = page.layout_with(Nav::Students, Toast::error("Missing fields", message));
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                StudentFormTemplate::render_with(layout, Some(id), form),
            )
                .into_response());
        }
    };

    match backend::students::update_student(&page.api, id, &payload).await {
        Ok(student) => {
            page.flash_redirect(
                Toast::success("Student updated", format!("{} was saved", student.name)),
                &format!("/students/{}", id),
            )
            .await
        }
        Err(e) => {
            let e = recoverable(e)?;
            let layout =
                page.layout_with(Nav::Students, Toast::from_api_error("Failed to update student", &e));
            Ok((StatusCode::UNPROCESSABLE_ENTITY, StudentFormTemplate::render_with(layout, Some(id), form)).into_response())
        }
    }
}

async fn delete_student(page: PageContext, Path(id): Path<i64>) -> Result<Response, AppError> {
    let toast = match backend::students::delete_student(&page.api, id).await {
        Ok(()) => {
            tracing::info!(student_id = id, "Student deleted");
            Toast::success("Student deleted", "The student was removed")
        }
        Err(e) => Toast::from_api_error("Failed to delete student", &recoverable(e)?),
    };
    page.flash_redirect(toast, "/students").await
}

async fn qr_svg(page: PageContext, Path(id): Path<i64>) -> Result<Response, AppError> {
    let student = backend::students::get_student(&page.api, id).await?;
    let svg = qr_generator::student_qr_svg(&student)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn qr_png(page: PageContext, Path(id): Path<i64>) -> Result<Response, AppError> {
    let student = backend::students::get_student(&page.api, id).await?;
    let png = qr_generator::student_qr_png(&student)?;
    let disposition = format!("attachment; filename=\"student-{}-qr.png\"", student.id);
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        png,
    )
        .into_response())
}

/// Standalone page sized for printing a student's attendance card
#[derive(Template)]
#[template(path = "students/qr_card.html")]
struct QrCardTemplate {
    student: Student,
    image_uri: String,
}

async fn qr_card(page: PageContext, Path(id): Path<i64>) -> Result<QrCardTemplate, AppError> {
    let student = backend::students::get_student(&page.api, id).await?;
    let image_uri = qr_generator::png_data_uri(&student.qr_payload())?;
    Ok(QrCardTemplate { student, image_uri })
}

async fn refresh_qr(page: PageContext, Path(id): Path<i64>) -> Result<Response, AppError> {
    let toast = match backend::students::refresh_qr(&page.api, id).await {
        Ok(receipt) if receipt.success => Toast::success(
            "QR code refreshed",
            receipt
                .message
                .unwrap_or_else(|| "A new QR code was issued".to_string()),
        ),
        Ok(receipt) => Toast::error(
            "Failed to refresh QR code",
            receipt
                .message
                .unwrap_or_else(|| "The QR code was not changed".to_string()),
        ),
        Err(e) => Toast::from_api_error("Failed to refresh QR code", &recoverable(e)?),
    };
    page.flash_redirect(toast, &format!("/students/{}", id)).await
}

async fn check_in(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let student = backend::students::get_student(&page.api, id).await?;

    let toast = match attendance::check_in(&page.api, &state.lesson_bus, id, &student.qr_payload())
        .await
    {
        Ok(outcome) => outcome.toast(),
        Err(e) => scan_failure_toast(&recoverable(e)?),
    };
    page.flash_redirect(toast, &format!("/students/{}", id)).await
}

#[derive(Debug, Deserialize)]
pub struct AssignPlanForm {
    pub plan_id: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn parse_day(value: &Option<String>) -> Option<NaiveDate> {
    non_blank(value).and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
}

async fn assign_plan(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<AssignPlanForm>,
) -> Result<Response, AppError> {
    let back = format!("/students/{}", id);
    let start_date = parse_day(&form.start_date).unwrap_or_else(|| Local::now().date_naive());
    let end_date = parse_day(&form.end_date);

    if end_date.is_some_and(|end| end < start_date) {
        return page
            .flash_redirect(
                Toast::error("Invalid dates", "End date must not be before the start date"),
                &back,
            )
            .await;
    }

    let payload = SubscriptionPayload {
        student: id,
        subscription_plan: form.plan_id,
        start_date,
        end_date,
    };

    let toast = match backend::plans::create_subscription(&page.api, &payload).await {
        Ok(subscription) => {
            tracing::info!(
                student_id = id,
                subscription_id = subscription.id,
                "Plan assigned"
            );
            Toast::success("Plan assigned", "The subscription was added to the student")
        }
        Err(e) => Toast::from_api_error("Failed to assign plan", &recoverable(e)?),
    };
    page.flash_redirect(toast, &back).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route("/students/new", get(new_student))
        .route("/students/:id", get(show_student).post(update_student))
        .route("/students/:id/edit", get(edit_student))
        .route("/students/:id/delete", post(delete_student))
        .route("/students/:id/qr.svg", get(qr_svg))
        .route("/students/:id/qr.png", get(qr_png))
        .route("/students/:id/qr-card", get(qr_card))
        .route("/students/:id/refresh-qr", post(refresh_qr))
        .route("/students/:id/check-in", post(check_in))
        .route("/students/:id/subscriptions", post(assign_plan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_requires_name_and_email() {
        let form = StudentForm {
            name: "  ".to_string(),
            email: "a@b.test".to_string(),
            ..Default::default()
        };
        assert!(form.payload().is_err());
    }

    #[test]
    fn test_blank_password_is_not_sent() {
        let form = StudentForm {
            name: "Ana".to_string(),
            email: "ana@school.test".to_string(),
            password: Some(String::new()),
            ..Default::default()
        };
        let payload = form.payload().unwrap();
        assert_eq!(payload.password, None);
        assert_eq!(payload.name, "Ana");
    }

    #[test]
    fn test_subscription_rows_name_plans() {
        let plans = vec![Plan {
            id: 2,
            name: "10 lessons".to_string(),
            description: String::new(),
            number_of_lessons: 10,
            price: crate::models::Amount::new("100.00"),
        }];
        let subs = vec![StudentSubscription {
            id: 1,
            student: 4,
            subscription_plan: 2,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
        }];
        let rows = subscription_rows(subs, &plans);
        assert_eq!(rows[0].plan_name, "10 lessons");
        assert_eq!(rows[0].end_date, "-");
    }
}
