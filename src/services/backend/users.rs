use secrecy::ExposeSecret;
use serde::Serialize;

use super::{ApiError, ApiSession};
use crate::models::auth::{NewUser, UserAccount, UserRole};

const USERS: &str = "accounts/users/";

#[derive(Debug, Serialize)]
struct RoleChange {
    user_id: i64,
    role: UserRole,
}

#[derive(Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    password: &'a str,
    role: UserRole,
}

#[tracing::instrument(skip(api))]
pub async fn list_users(api: &ApiSession) -> Result<Vec<UserAccount>, ApiError> {
    api.list(USERS, &[]).await
}

#[tracing::instrument(skip(api), fields(role = %role))]
pub async fn change_role(api: &ApiSession, user_id: i64, role: UserRole) -> Result<(), ApiError> {
    let _: serde_json::Value = api
        .post(&format!("{}change_role/", USERS), &RoleChange { user_id, role })
        .await?;
    Ok(())
}

#[tracing::instrument(skip(api, user), fields(email = %user.email, role = %user.role))]
pub async fn create_user(api: &ApiSession, user: &NewUser) -> Result<UserAccount, ApiError> {
    api.post(
        USERS,
        &CreateUserRequest {
            email: &user.email,
            password: user.password.expose_secret(),
            role: user.role,
        },
    )
    .await
}
