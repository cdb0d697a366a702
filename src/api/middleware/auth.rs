use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::session::{AppState, SESSION_KEY_RETURN_URL, SESSION_KEY_TOKENS, SESSION_KEY_USER};
use crate::api::layout::push_flash;
use crate::models::{AuthTokens, CurrentUser, UserRole};
use crate::services::backend::ApiSession;
use crate::services::feedback::Toast;

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    SessionError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::SessionError(msg) => {
                tracing::error!(error = %msg, "Session store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Session error occurred.").into_response()
            }
        }
    }
}

impl From<tower_sessions::session::Error> for AuthError {
    fn from(e: tower_sessions::session::Error) -> Self {
        AuthError::SessionError(e.to_string())
    }
}

/// Paths worth returning to after signing in
fn is_page_path(path: &str) -> bool {
    crate::api::forms::is_local_path(path) && !path.starts_with("/events")
}

/// Middleware that requires a signed-in user.
///
/// Inserts [`ApiSession`] and [`CurrentUser`] as request extensions. After
/// the handler runs, refreshed tokens are written back to the session; an
/// expired backend session signs the user out.
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user: Option<CurrentUser> = session.get(SESSION_KEY_USER).await?;
    let tokens: Option<AuthTokens> = session.get(SESSION_KEY_TOKENS).await?;

    let (Some(user), Some(tokens)) = (user, tokens) else {
        let wanted = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        if request.method() == axum::http::Method::GET && is_page_path(&wanted) {
            session.insert(SESSION_KEY_RETURN_URL, wanted).await?;
        }
        return Ok(Redirect::to("/login").into_response());
    };

    if !user.role.can_sign_in() {
        tracing::warn!(user_id = user.user_id, role = %user.role, "Role without sign-in access");
        session.flush().await?;
        return Ok(Redirect::to("/login").into_response());
    }

    let api = ApiSession::new(state.api.clone(), Some(tokens));
    request.extensions_mut().insert(api.clone());
    request.extensions_mut().insert(user.clone());

    let response = next.run(request).await;

    if api.is_expired() {
        tracing::info!(user_id = user.user_id, "Backend session expired, signing out");
        if let Some(id) = session.id() {
            state.scanners.forget(&id.to_string()).await;
        }
        session.flush().await?;
        push_flash(
            &session,
            Toast::info("Signed out", "Your session has expired. Please sign in again."),
        )
        .await
        .map_err(|e| AuthError::SessionError(e.to_string()))?;
        return Ok(Redirect::to("/login").into_response());
    }

    if api.was_refreshed() {
        if let Some(tokens) = api.tokens() {
            tracing::debug!(user_id = user.user_id, "Persisting refreshed access token");
            session.insert(SESSION_KEY_TOKENS, tokens).await?;
        }
    }

    Ok(response)
}

async fn require_role(
    session: Session,
    request: Request,
    next: Next,
    allowed: fn(&UserRole) -> bool,
    denied_message: &str,
) -> Result<Response, AuthError> {
    let role = request.extensions().get::<CurrentUser>().map(|u| u.role);

    match role {
        Some(role) if allowed(&role) => Ok(next.run(request).await),
        Some(role) => {
            push_flash(&session, Toast::error("Not allowed", denied_message))
                .await
                .map_err(|e| AuthError::SessionError(e.to_string()))?;
            Ok(Redirect::to(role.home_path()).into_response())
        }
        None => Ok(Redirect::to("/login").into_response()),
    }
}

/// Middleware that limits a router to school staff. Other roles are sent
/// to their home page with a notice.
pub async fn require_staff(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    require_role(
        session,
        request,
        next,
        UserRole::is_staff,
        "That page is only available to school staff",
    )
    .await
}

/// Middleware that limits a router to administrators
pub async fn require_admin(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    require_role(
        session,
        request,
        next,
        |role| *role == UserRole::Admin,
        "That page is only available to administrators",
    )
    .await
}
