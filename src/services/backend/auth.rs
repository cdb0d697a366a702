use reqwest::Method;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

use super::{error_from_response, ApiClient, ApiError};
use crate::models::auth::LoginResponse;

const TOKEN_PATH: &str = "token/";

#[derive(Serialize)]
struct TokenRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Exchanges email and password for a token pair.
///
/// Runs without a session, so a 401 here means bad credentials and is
/// reported with the backend's message rather than triggering a refresh.
#[tracing::instrument(skip(client, password))]
pub async fn login(
    client: &ApiClient,
    email: &str,
    password: &Secret<String>,
) -> Result<LoginResponse, ApiError> {
    let response = client
        .anonymous(Method::POST, TOKEN_PATH)
        .json(&TokenRequest {
            email: email.trim(),
            password: password.expose_secret(),
        })
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let login: LoginResponse = response
        .json()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;

    tracing::info!(user_id = login.user_id, role = %login.role, "User signed in");

    Ok(login)
}
