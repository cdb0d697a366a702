use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::services::backend::ApiError;
use crate::services::export::ExportError;
use crate::services::qr_generator::QrRenderError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("QR rendering failed: {0}")]
    Qr(#[from] QrRenderError),
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    status: u16,
    title: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title, message) = match &self {
            AppError::Api(ApiError::SessionExpired) => {
                return Redirect::to("/login").into_response();
            }
            AppError::Api(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, "Not found", e.user_message())
            }
            AppError::Api(e) => (
                StatusCode::BAD_GATEWAY,
                "School server error",
                e.user_message(),
            ),
            AppError::Session(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session error",
                "Your browser session could not be read. Please sign in again.".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "Invalid request", msg.clone()),
            AppError::Export(_) | AppError::Qr(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                self.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = ?self, "Request rejected");
        }

        let page = ErrorTemplate {
            status: status.as_u16(),
            title: title.to_string(),
            message: message.clone(),
        };

        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, message).into_response(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Hands a backend error back for in-page reporting, unless it ended the
/// session, in which case it becomes the request's error.
pub fn recoverable(error: ApiError) -> Result<ApiError> {
    match error {
        ApiError::SessionExpired => Err(AppError::Api(ApiError::SessionExpired)),
        other => Ok(other),
    }
}
