use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use secrecy::ExposeSecret;
use tower_sessions::Session;

use crate::api::layout::take_flash;
use crate::api::middleware::session::{
    AppState, SESSION_KEY_RETURN_URL, SESSION_KEY_TOKENS, SESSION_KEY_USER,
};
use crate::error::AppError;
use crate::models::auth::{AuthTokens, CurrentUser, LoginCredentials};
use crate::services::backend::{self, ApiError};
use crate::services::feedback::Toast;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    email: String,
    error: Option<String>,
    toast: Option<Toast>,
}

impl LoginTemplate {
    /// Re-rendered form after a failure; the password is never echoed back
    fn failed(email: &str, error: impl Into<String>) -> Self {
        Self {
            email: email.trim().to_string(),
            error: Some(error.into()),
            toast: None,
        }
    }
}

async fn login_page(session: Session) -> Result<Response, AppError> {
    let user: Option<CurrentUser> = session.get(SESSION_KEY_USER).await?;
    if let Some(user) = user {
        if user.role.can_sign_in() {
            return Ok(Redirect::to(user.role.home_path()).into_response());
        }
    }

    Ok(LoginTemplate {
        email: String::new(),
        error: None,
        toast: take_flash(&session).await?,
    }
    .into_response())
}

async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginCredentials>,
) -> Result<Response, AppError> {
    if form.email.trim().is_empty() || form.password.expose_secret().is_empty() {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            LoginTemplate::failed(&form.email, "Email and password are required"),
        )
            .into_response());
    }

    let login = match backend::auth::login(&state.api, &form.email, &form.password).await {
        Ok(login) => login,
        Err(ApiError::Backend { status, message }) => {
            tracing::info!(status = %status, "Login rejected");
            let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::UNAUTHORIZED);
            return Ok((status, LoginTemplate::failed(&form.email, message)).into_response());
        }
        Err(e) => {
            tracing::error!(error = %e, "Login request failed");
            return Ok((
                StatusCode::BAD_GATEWAY,
                LoginTemplate::failed(&form.email, e.user_message()),
            )
                .into_response());
        }
    };

    if !login.role.can_sign_in() {
        tracing::info!(user_id = login.user_id, role = %login.role, "Login refused for role");
        return Ok((
            StatusCode::FORBIDDEN,
            LoginTemplate::failed(
                &form.email,
                format!(
                    "{} accounts cannot sign in here",
                    login.role.label()
                ),
            ),
        )
            .into_response());
    }

    let return_url: Option<String> = session.remove(SESSION_KEY_RETURN_URL).await?;

    session.cycle_id().await?;
    session
        .insert(
            SESSION_KEY_TOKENS,
            AuthTokens {
                access: login.access.clone(),
                refresh: login.refresh.clone(),
            },
        )
        .await?;
    let user = CurrentUser::from(&login);
    session.insert(SESSION_KEY_USER, &user).await?;

    let target = return_url.unwrap_or_else(|| user.role.home_path().to_string());
    Ok(Redirect::to(&target).into_response())
}

async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect, AppError> {
    if let Some(id) = session.id() {
        state.scanners.forget(&id.to_string()).await;
    }
    session.flush().await?;
    tracing::info!("User signed out");
    Ok(Redirect::to("/login"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout).post(logout))
}
