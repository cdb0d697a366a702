use askama::Template;
use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::AppState;
use crate::error::{recoverable, AppError};
use crate::models::auth::NewUser;
use crate::models::{UserAccount, UserRole};
use crate::services::backend;
use crate::services::feedback::Toast;

#[derive(Template)]
#[template(path = "settings.html")]
struct SettingsTemplate {
    layout: Layout,
    users: Vec<UserAccount>,
    roles: [UserRole; 4],
    current_user_id: i64,
    new_email: String,
    new_role: UserRole,
}

impl SettingsTemplate {
    fn is_new_role(&self, role: &UserRole) -> bool {
        *role == self.new_role
    }
}

async fn render_settings(
    page: &PageContext,
    layout: Layout,
    new_email: String,
    new_role: UserRole,
) -> Result<SettingsTemplate, AppError> {
    let mut users = backend::users::list_users(&page.api).await?;
    users.sort_by(|a, b| a.email.to_lowercase().cmp(&b.email.to_lowercase()));

    Ok(SettingsTemplate {
        layout,
        current_user_id: page.user.user_id,
        users,
        roles: UserRole::ALL,
        new_email,
        new_role,
    })
}

async fn settings_page(page: PageContext) -> Result<SettingsTemplate, AppError> {
    let layout = page.layout(Nav::Settings).await?;
    render_settings(&page, layout, String::new(), UserRole::Student).await
}

#[derive(Debug, Deserialize)]
pub struct NewUserForm {
    #[serde(default)]
    pub email: String,
    pub password: Secret<String>,
    pub password_confirmation: Secret<String>,
    #[serde(default)]
    pub role: String,
}

impl NewUserForm {
    fn role(&self) -> Option<UserRole> {
        UserRole::parse(&self.role)
    }

    fn new_user(&self) -> Result<NewUser, String> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err("Enter a valid email address".to_string());
        }
        if self.password.expose_secret().is_empty() {
            return Err("Password is required".to_string());
        }
        if self.password.expose_secret() != self.password_confirmation.expose_secret() {
            return Err("Passwords do not match".to_string());
        }
        let role = self.role().ok_or("Choose a role")?;

        Ok(NewUser {
            email: email.to_string(),
            password: Secret::new(self.password.expose_secret().clone()),
            role,
        })
    }
}

async fn create_user(page: PageContext, Form(form): Form<NewUserForm>) -> Result<Response, AppError> {
    let email = form.email.trim().to_string();
    let role = form.role().unwrap_or(UserRole::Student);

    let user = match form.new_user() {
        Ok(user) => user,
        Err(message) => {
            let layout = page.layout_with(Nav::Settings, Toast::error("Invalid account", message));
            let settings = render_settings(&page, layout, email, role).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, settings).into_response());
        }
    };

    match backend::users::create_user(&page.api, &user).await {
        Ok(account) => {
            tracing::info!(user_id = account.id, role = %account.role, created_by = page.user.user_id, "User created");
            page.flash_redirect(
                Toast::success(
                    "User created",
                    format!("{} can now sign in as {}", account.email, account.role.label()),
                ),
                "/settings",
            )
            .await
        }
        Err(e) => {
            let e = recoverable(e)?;
            tracing::info!(error = %e, "User rejected by backend");
            let layout = page.layout_with(Nav::Settings, Toast::from_api_error("Failed to create user", &e));
            let settings = render_settings(&page, layout, email, role).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, settings).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

async fn change_role(
    page: PageContext,
    Path(user_id): Path<i64>,
    Form(form): Form<RoleForm>,
) -> Result<Response, AppError> {
    let Some(role) = UserRole::parse(&form.role) else {
        return page
            .flash_redirect(
                Toast::error("Invalid role", format!("\"{}\" is not a role", form.role)),
                "/settings",
            )
            .await;
    };

    if user_id == page.user.user_id && role != UserRole::Admin {
        return page
            .flash_redirect(
                Toast::error("Not allowed", "You cannot remove your own administrator role"),
                "/settings",
            )
            .await;
    }

    let toast = match backend::users::change_role(&page.api, user_id, role).await {
        Ok(()) => {
            tracing::info!(user_id, role = %role, changed_by = page.user.user_id, "Role changed");
            Toast::success("Role updated", format!("The account is now {}", role.label()))
        }
        Err(e) => Toast::from_api_error("Failed to change role", &recoverable(e)?),
    };
    page.flash_redirect(toast, "/settings").await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(settings_page))
        .route("/settings/users", post(create_user))
        .route("/settings/users/:id/role", post(change_role))
}
