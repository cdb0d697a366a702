// Attendance scanner page. The browser decodes QR codes (camera or
// keyboard-wedge reader) and posts the decoded text here.

use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::api::forms::parse_opt;
use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::AppState;
use crate::error::AppError;
use crate::models::ClassSession;
use crate::services::attendance::{self, ScanFlowError};
use crate::services::backend;
use crate::services::feedback::Toast;
use crate::services::scanner::ScannerState;
use crate::services::session_selector;

const SCANNER_PATH: &str = "/attendance/scan";

/// Registry key of this browser's scanner
pub fn scanner_key(session: &Session) -> Result<String, AppError> {
    session
        .id()
        .map(|id| id.to_string())
        .ok_or(AppError::Api(backend::ApiError::SessionExpired))
}

#[derive(Template)]
#[template(path = "attendance/scanner.html")]
struct ScannerTemplate {
    layout: Layout,
    today_label: String,
    sessions: Vec<ClassSession>,
    suggested_session: Option<i64>,
    scanner: ScannerState,
    current_session: Option<ClassSession>,
}

impl ScannerTemplate {
    fn is_suggested(&self, session_id: &i64) -> bool {
        self.suggested_session == Some(*session_id)
    }
}

async fn scanner_page(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<ScannerTemplate, AppError> {
    let now = Local::now().naive_local();
    let sessions = backend::sessions::list_sessions_on(&page.api, now.date()).await?;
    let scanner = state.scanners.snapshot(&scanner_key(&page.session)?).await;

    let suggested_session = scanner
        .session_id
        .filter(|_| scanner.active)
        .or_else(|| session_selector::select_active(&sessions, now).map(|s| s.id));

    let current_session = scanner
        .session_id
        .and_then(|id| sessions.iter().find(|s| s.id == id).cloned());

    let open_sessions = sessions
        .into_iter()
        .filter(|s| s.status.is_open())
        .collect();

    Ok(ScannerTemplate {
        layout: page.layout(Nav::Scanner).await?,
        today_label: now.date().format("%A %-d %B %Y").to_string(),
        sessions: open_sessions,
        suggested_session,
        scanner,
        current_session,
    })
}

#[derive(Debug, Deserialize)]
pub struct StartForm {
    /// Empty selects quick scan (no class session)
    pub session_id: Option<String>,
}

async fn start_scanner(
    State(state): State<AppState>,
    page: PageContext,
    Form(form): Form<StartForm>,
) -> Result<Response, AppError> {
    let session_id: Option<i64> = parse_opt(&form.session_id);

    if let Some(id) = session_id {
        let class_session = backend::sessions::get_session(&page.api, id).await?;
        if !class_session.status.is_open() {
            return page
                .flash_redirect(
                    Toast::error(
                        "Session not active",
                        format!("That session is {}", class_session.status_label().to_lowercase()),
                    ),
                    SCANNER_PATH,
                )
                .await;
        }
    }

    state
        .scanners
        .update(&scanner_key(&page.session)?, |scanner| scanner.start(session_id))
        .await;
    tracing::info!(user_id = page.user.user_id, session_id = ?session_id, "Scanner started");

    let description = match session_id {
        Some(id) => format!("Recording attendance for session #{}", id),
        None => "Quick scan: each code uses one lesson".to_string(),
    };
    page.flash_redirect(Toast::info("Scanner started", description), SCANNER_PATH)
        .await
}

#[derive(Debug, Deserialize)]
pub struct ScanForm {
    pub payload: String,
}

/// Result of one scan as reported to the browser
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub accepted: bool,
    pub student_id: Option<i64>,
    pub lessons_remaining: Option<i64>,
    pub toast: Toast,
}

async fn process_scan(
    state: &AppState,
    page: &PageContext,
    payload: &str,
) -> Result<ScanResponse, AppError> {
    let key = scanner_key(&page.session)?;
    let result =
        attendance::submit_scan(&page.api, &state.lesson_bus, &state.scanners, &key, payload).await;

    match result {
        Ok(outcome) => Ok(ScanResponse {
            accepted: true,
            student_id: Some(outcome.student_id),
            lessons_remaining: outcome.lessons_remaining,
            toast: outcome.toast(),
        }),
        Err(ScanFlowError::Backend(e @ backend::ApiError::SessionExpired)) => Err(e.into()),
        Err(e) => Ok(ScanResponse {
            accepted: false,
            student_id: None,
            lessons_remaining: None,
            toast: e.toast(),
        }),
    }
}

async fn submit_form(
    State(state): State<AppState>,
    page: PageContext,
    Form(form): Form<ScanForm>,
) -> Result<Response, AppError> {
    let response = process_scan(&state, &page, &form.payload).await?;
    page.flash_redirect(response.toast, SCANNER_PATH).await
}

async fn submit_json(
    State(state): State<AppState>,
    page: PageContext,
    Json(form): Json<ScanForm>,
) -> Result<Json<ScanResponse>, AppError> {
    Ok(Json(process_scan(&state, &page, &form.payload).await?))
}

async fn reset_scanner(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<Response, AppError> {
    state
        .scanners
        .update(&scanner_key(&page.session)?, |scanner| scanner.reset())
        .await;
    page.flash_redirect(
        Toast::info("Scanner reset", "Every code can be scanned again"),
        SCANNER_PATH,
    )
    .await
}

async fn stop_scanner(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<Response, AppError> {
    state
        .scanners
        .update(&scanner_key(&page.session)?, |scanner| scanner.stop())
        .await;
    tracing::info!(user_id = page.user.user_id, "Scanner stopped");
    Ok(Redirect::to(SCANNER_PATH).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(SCANNER_PATH, get(scanner_page))
        .route("/attendance/scan/start", post(start_scanner))
        .route("/attendance/scan/submit", post(submit_form))
        .route("/attendance/scan/submit.json", post(submit_json))
        .route("/attendance/scan/reset", post(reset_scanner))
        .route("/attendance/scan/stop", post(stop_scanner))
}
