use askama::Template;
use axum::{routing::get, Router};
use chrono::Local;

use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::AppState;
use crate::error::AppError;
use crate::models::{ClassSession, Student, UserRole};
use crate::services::backend;
use crate::services::session_selector;

/// Students at or below this many lessons are listed as running low
const LOW_LESSONS_THRESHOLD: i64 = 3;

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    layout: Layout,
    student_count: usize,
    teacher_count: usize,
    group_count: usize,
    today_label: String,
    sessions: Vec<ClassSession>,
    active_session: Option<ClassSession>,
    next_session: Option<ClassSession>,
    low_lessons: Vec<Student>,
    show_directory: bool,
}

async fn dashboard(page: PageContext) -> Result<DashboardTemplate, AppError> {
    let now = Local::now().naive_local();
    let today = now.date();
    let is_admin = page.user.role == UserRole::Admin;

    let sessions = backend::sessions::list_sessions_on(&page.api, today).await?;
    let active_session = session_selector::select_active(&sessions, now).cloned();
    let next_session = session_selector::upcoming(&sessions, now).first().map(|s| (*s).clone());

    let (students, teacher_count, group_count) = if is_admin {
        let (students, teachers, groups) = tokio::try_join!(
            backend::students::list_students(&page.api),
            backend::teachers::list_teachers(&page.api),
            backend::groups::list_groups(&page.api),
        )?;
        (students, teachers.len(), groups.len())
    } else {
        (Vec::new(), 0, 0)
    };

    let mut low_lessons: Vec<Student> = students
        .iter()
        .filter(|s| s.lessons_remaining <= LOW_LESSONS_THRESHOLD)
        .cloned()
        .collect();
    low_lessons.sort_by_key(|s| s.lessons_remaining);

    tracing::debug!(
        sessions = sessions.len(),
        active_session = ?active_session.as_ref().map(|s| s.id),
        next_session = ?next_session.as_ref().map(|s| s.id),
        "Dashboard loaded"
    );

    Ok(DashboardTemplate {
        layout: page.layout(Nav::Dashboard).await?,
        student_count: students.len(),
        teacher_count,
        group_count,
        today_label: today.format("%A %-d %B %Y").to_string(),
        sessions,
        active_session,
        next_session,
        low_lessons,
        show_directory: is_admin,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}
