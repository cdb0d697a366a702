use askama::Template;
use axum::{
    extract::{Path, Query},
    response::Response,
    routing::{get, post},
    Form, Router,
};
use chrono::{Days, Local, NaiveDate};
use serde::Deserialize;

use crate::api::forms::{checkbox, local_path, non_blank, parse_opt};
use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::AppState;
use crate::error::{recoverable, AppError};
use crate::models::session::{clock, ScheduleKind, SchedulePayload, SessionStatus, WEEKDAYS};
use crate::models::{ClassSession, Group, Schedule, Student, Teacher};
use crate::services::backend;
use crate::services::feedback::Toast;

#[derive(Debug, Default, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

fn day_href(date: NaiveDate) -> String {
    format!("/academic?date={}", date.format("%Y-%m-%d"))
}

/// A session row with its names resolved for display
pub struct SessionRow {
    pub session: ClassSession,
    pub teacher_name: String,
    pub target_name: String,
}

fn session_rows(
    sessions: Vec<ClassSession>,
    teachers: &[Teacher],
    groups: &[Group],
    students: &[Student],
) -> Vec<SessionRow> {
    let mut rows: Vec<SessionRow> = sessions
        .into_iter()
        .map(|session| {
            let teacher_name = teachers
                .iter()
                .find(|t| t.id == session.teacher)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| format!("Teacher #{}", session.teacher));
            let target_name = match (session.group, session.student) {
                (Some(id), _) => groups
                    .iter()
                    .find(|g| g.id == id)
                    .map(|g| g.name.clone())
                    .unwrap_or_else(|| format!("Group #{}", id)),
                (None, Some(id)) => students
                    .iter()
                    .find(|s| s.id == id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| format!("Student #{}", id)),
                (None, None) => "-".to_string(),
            };
            SessionRow {
                session,
                teacher_name,
                target_name,
            }
        })
        .collect();
    rows.sort_by_key(|row| (row.session.start_time, row.session.id));
    rows
}

#[derive(Template)]
#[template(path = "planning.html")]
struct PlanningTemplate {
    layout: Layout,
    date_value: String,
    date_label: String,
    previous_href: String,
    next_href: String,
    today_href: String,
    sessions: Vec<SessionRow>,
    schedules: Vec<Schedule>,
    teachers: Vec<Teacher>,
    groups: Vec<Group>,
    students: Vec<Student>,
    weekdays: [&'static str; 7],
    default_day: usize,
    session_statuses: [SessionStatus; 4],
}

impl PlanningTemplate {
    fn is_default_day(&self, index: &usize) -> bool {
        *index == self.default_day
    }
}

async fn planning_page(
    page: PageContext,
    Query(query): Query<DayQuery>,
) -> Result<PlanningTemplate, AppError> {
    let today = Local::now().date_naive();
    let date = non_blank(&query.date)
        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
        .unwrap_or(today);

    let (sessions, schedules, teachers, groups, students) = tokio::try_join!(
        backend::sessions::list_sessions_on(&page.api, date),
        backend::sessions::list_schedules(&page.api),
        backend::teachers::list_teachers(&page.api),
        backend::groups::list_groups(&page.api),
        backend::students::list_students(&page.api),
    )?;

    let sessions = session_rows(sessions, &teachers, &groups, &students);

    Ok(PlanningTemplate {
        layout: page.layout(Nav::Planning).await?,
        date_value: date.format("%Y-%m-%d").to_string(),
        date_label: date.format("%A %-d %B %Y").to_string(),
        previous_href: day_href(date.checked_sub_days(Days::new(1)).unwrap_or(date)),
        next_href: day_href(date.checked_add_days(Days::new(1)).unwrap_or(date)),
        today_href: day_href(today),
        sessions,
        schedules,
        teachers,
        groups,
        students,
        weekdays: WEEKDAYS,
        default_day: chrono::Datelike::weekday(&date).num_days_from_monday() as usize,
        session_statuses: SessionStatus::ALL,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleForm {
    pub teacher_id: Option<String>,
    pub schedule_type: Option<String>,
    pub student_id: Option<String>,
    pub group_id: Option<String>,
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_recurring: Option<String>,
    pub payment: Option<String>,
    pub return_to: Option<String>,
}

impl ScheduleForm {
    /// Builds and validates the backend payload
    pub fn payload(&self) -> Result<SchedulePayload, String> {
        let teacher_id = parse_opt(&self.teacher_id).ok_or("Choose a teacher")?;
        let schedule_type = match non_blank(&self.schedule_type).as_deref() {
            Some("group") => ScheduleKind::Group,
            Some("private") => ScheduleKind::Private,
            _ => return Err("Choose a schedule type".to_string()),
        };
        let day = parse_opt::<u8>(&self.day).ok_or("Choose a day of the week")?;
        let start_time = non_blank(&self.start_time)
            .and_then(|t| clock::parse(&t))
            .ok_or("Enter a valid start time")?;
        let end_time = non_blank(&self.end_time)
            .and_then(|t| clock::parse(&t))
            .ok_or("Enter a valid end time")?;

        let payload = SchedulePayload {
            teacher_id,
            schedule_type,
            student_id: parse_opt(&self.student_id),
            group_id: parse_opt(&self.group_id),
            day,
            start_time,
            end_time,
            is_recurring: checkbox(&self.is_recurring),
            payment: non_blank(&self.payment).unwrap_or_else(|| "0".to_string()),
        };
        payload.validate().map_err(|e| e.to_string())?;
        Ok(payload)
    }
}

async fn create_schedule(page: PageContext, Form(form): Form<ScheduleForm>) -> Result<Response, AppError> {
    let back = local_path(form.return_to.as_deref(), "/academic");

    let payload = match form.payload() {
        Ok(payload) => payload,
        Err(message) => {
            return page
                .flash_redirect(Toast::error("Invalid schedule", message), &back)
                .await;
        }
    };

    let toast = match backend::sessions::create_schedule(&page.api, &payload).await {
        Ok(schedule) => {
            tracing::info!(schedule_id = schedule.id, teacher_id = payload.teacher_id, "Schedule created");
            Toast::success(
                "Schedule created",
                format!(
                    "{} {}",
                    WEEKDAYS.get(payload.day as usize).copied().unwrap_or_default(),
                    schedule.time_range_label()
                ),
            )
        }
        Err(e) => Toast::from_api_error("Failed to create schedule", &recoverable(e)?),
    };
    page.flash_redirect(toast, &back).await
}

#[derive(Debug, Default, Deserialize)]
pub struct ReturnForm {
    pub return_to: Option<String>,
}

async fn delete_schedule(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<ReturnForm>,
) -> Result<Response, AppError> {
    let back = local_path(form.return_to.as_deref(), "/academic");
    let toast = match backend::sessions::delete_schedule(&page.api, id).await {
        Ok(()) => Toast::success("Schedule deleted", "The schedule was removed"),
        Err(e) => Toast::from_api_error("Failed to delete schedule", &recoverable(e)?),
    };
    page.flash_redirect(toast, &back).await
}

async fn delete_session(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<ReturnForm>,
) -> Result<Response, AppError> {
    let back = local_path(form.return_to.as_deref(), "/academic");
    let toast = match backend::sessions::delete_session(&page.api, id).await {
        Ok(()) => {
            tracing::info!(session_id = id, "Session deleted");
            Toast::success("Session deleted", "The session was removed")
        }
        Err(e) => Toast::from_api_error("Failed to delete session", &recoverable(e)?),
    };
    page.flash_redirect(toast, &back).await
}

#[derive(Debug, Deserialize)]
pub struct SessionStatusForm {
    pub status: String,
    pub return_to: Option<String>,
}

async fn change_session_status(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<SessionStatusForm>,
) -> Result<Response, AppError> {
    let back = local_path(form.return_to.as_deref(), "/academic");
    let Some(status) = SessionStatus::parse(&form.status) else {
        return page
            .flash_redirect(
                Toast::error("Invalid status", format!("\"{}\" is not a session status", form.status)),
                &back,
            )
            .await;
    };

    let toast = match backend::sessions::update_session_status(&page.api, id, status).await {
        Ok(session) => {
            tracing::info!(session_id = id, status = session.status.as_str(), "Session status changed");
            Toast::success(
                "Session updated",
                format!("{} is now {}", session.time_range_label(), session.status_label().to_lowercase()),
            )
        }
        Err(e) => Toast::from_api_error("Failed to update session", &recoverable(e)?),
    };
    page.flash_redirect(toast, &back).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/academic", get(planning_page))
        .route("/academic/schedules", post(create_schedule))
        .route("/academic/schedules/:id/delete", post(delete_schedule))
        .route("/academic/sessions/:id/status", post(change_session_status))
        .route("/academic/sessions/:id/delete", post(delete_session))
}
