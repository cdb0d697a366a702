// Every request carries the bearer token. A 401 triggers exactly one refresh
// through `/token/refresh/` before the request is retried.

pub mod attendance;
pub mod auth;
pub mod groups;
pub mod parents;
pub mod plans;
pub mod sessions;
pub mod students;
pub mod teachers;
pub mod users;

use std::sync::{Arc, Mutex};

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::AuthTokens;

const REFRESH_PATH: &str = "token/refresh/";
const RAW_BODY_LIMIT: usize = 300;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{message}")]
    Backend { status: StatusCode, message: String },

    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    #[error("Unexpected response from the server: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Text suitable for a toast
    pub fn user_message(&self) -> String {
        match self {
            ApiError::HttpError(e) if e.is_timeout() => {
                "The school server did not answer in time".to_string()
            }
            ApiError::HttpError(_) => "Could not reach the school server".to_string(),
            ApiError::Backend { message, .. } => message.clone(),
            ApiError::SessionExpired => self.to_string(),
            ApiError::InvalidResponse(_) => "The school server sent an unexpected response".to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            ApiError::HttpError(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Shared HTTP handle bound to the backend base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Request without credentials (login and token refresh)
    pub(crate) fn anonymous(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("Accept", "application/json")
    }

    /// Reachability probe used by the health endpoint. Any HTTP answer,
    /// including 401, counts as reachable.
    #[tracing::instrument(skip(self))]
    pub async fn ping(&self) -> bool {
        match self
            .anonymous(Method::GET, "")
            .timeout(std::time::Duration::from_secs(3))
            .send()
            .await
        {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                tracing::warn!(error = %e, "Backend unreachable");
                false
            }
        }
    }
}

#[derive(Debug, Default)]
struct TokenState {
    tokens: Option<AuthTokens>,
    refreshed: bool,
    expired: bool,
}

/// Authenticated view of the backend for one browser session.
///
/// Clones share token state, so a refresh performed by one request handler
/// is visible to the middleware that persists tokens afterwards.
#[derive(Debug, Clone)]
pub struct ApiSession {
    client: ApiClient,
    state: Arc<Mutex<TokenState>>,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// DRF list endpoints answer with a bare array or, when pagination is on,
/// with `{"count": .., "results": [..]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Plain(items) => items,
            Listing::Paged { results } => results,
        }
    }
}

impl ApiSession {
    pub fn new(client: ApiClient, tokens: Option<AuthTokens>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(TokenState {
                tokens,
                ..TokenState::default()
            })),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Current tokens, including any obtained by a refresh
    pub fn tokens(&self) -> Option<AuthTokens> {
        self.lock().tokens.clone()
    }

    /// Whether a refresh replaced the tokens the session started with
    pub fn was_refreshed(&self) -> bool {
        self.lock().refreshed
    }

    /// Whether the refresh attempt failed and the user must sign in again
    pub fn is_expired(&self) -> bool {
        self.lock().expired
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn access_token(&self) -> Option<String> {
        self.lock().tokens.as_ref().map(|t| t.access.clone())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, query, None::<&()>).await?;
        decode(response).await
    }

    /// GET a collection endpoint, accepting paginated or bare bodies
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let listing: Listing<T> = self.get(path, query).await?;
        Ok(listing.into_vec())
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, &[], Some(body)).await?;
        decode(response).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::PATCH, path, &[], Some(body)).await?;
        decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, &[], None::<&()>).await?;
        Ok(())
    }

    /// Sends a request, refreshing the access token once on 401.
    ///
    /// Non-success responses are turned into [`ApiError::Backend`] carrying
    /// the backend's own message.
    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let response = self.attempt(method.clone(), path, query, body).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!(path = %path, "Access token rejected, refreshing");
            self.refresh().await?;
            self.attempt(method, path, query, body).await?
        } else {
            response
        };

        if response.status().is_success() {
            return Ok(response);
        }

        Err(error_from_response(response).await)
    }

    async fn attempt<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.client.anonymous(method, path);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.access_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Any failure marks the session expired.
    #[tracing::instrument(skip(self))]
    async fn refresh(&self) -> Result<(), ApiError> {
        let stored = self.lock().tokens.as_ref().and_then(|t| t.refresh.clone());
        let Some(refresh_token) = stored else {
            tracing::info!("No refresh token available, session expired");
            self.lock().expired = true;
            return Err(ApiError::SessionExpired);
        };

        let outcome = self
            .client
            .anonymous(Method::POST, REFRESH_PATH)
            .json(&RefreshRequest {
                refresh: &refresh_token,
            })
            .send()
            .await;

        let refreshed = match outcome {
            Ok(response) if response.status().is_success() => {
                response.json::<RefreshResponse>().await.ok()
            }
            Ok(response) => {
                tracing::info!(status = %response.status(), "Token refresh rejected");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh request failed");
                None
            }
        };

        let mut state = self.lock();
        match refreshed {
            Some(body) => {
                state.tokens = Some(AuthTokens {
                    access: body.access,
                    refresh: body.refresh.or(Some(refresh_token)),
                });
                state.refreshed = true;
                Ok(())
            }
            None => {
                state.tokens = None;
                state.expired = true;
                Err(ApiError::SessionExpired)
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    // 204 and other empty bodies decode as JSON null so `Option`/unit targets work
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

pub(crate) async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, body = %body, "Backend request failed");
    ApiError::Backend {
        status,
        message: extract_message(status, &body),
    }
}

/// Reduces a backend error body to one human-readable sentence.
///
/// Looks at the conventional keys first, then the first field error of a
/// validation response, then the raw body, then the status line.
pub fn extract_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<JsonValue>(body) {
        if let Some(message) = message_from_json(&json) {
            return message;
        }
    }

    let raw = body.trim();
    if !raw.is_empty() && !raw.starts_with('<') {
        return raw.chars().take(RAW_BODY_LIMIT).collect();
    }

    format!("HTTP {}", status.as_u16())
}

fn message_from_json(json: &JsonValue) -> Option<String> {
    match json {
        JsonValue::String(s) => non_empty(s),
        JsonValue::Array(items) => items.iter().find_map(message_from_json),
        JsonValue::Object(map) => {
            for key in ["message", "error", "detail", "non_field_errors"] {
                if let Some(message) = map.get(key).and_then(message_from_json) {
                    return Some(message);
                }
            }
            map.iter()
                .filter(|(key, _)| key.as_str() != "success")
                .find_map(|(_, value)| match value {
                    JsonValue::String(_) | JsonValue::Array(_) => message_from_json(value),
                    _ => None,
                })
        }
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_prefers_known_keys() {
        assert_eq!(
            extract_message(StatusCode::BAD_REQUEST, r#"{"success": false, "message": "Invalid QR code"}"#),
            "Invalid QR code"
        );
        assert_eq!(
            extract_message(StatusCode::UNAUTHORIZED, r#"{"detail": "No active account found with the given credentials"}"#),
            "No active account found with the given credentials"
        );
        assert_eq!(
            extract_message(StatusCode::BAD_REQUEST, r#"{"non_field_errors": ["Session is not active"]}"#),
            "Session is not active"
        );
    }

    #[test]
    fn test_extract_message_uses_first_field_error_verbatim() {
        assert_eq!(
            extract_message(
                StatusCode::BAD_REQUEST,
                r#"{"name": ["group with this name already exists."]}"#
            ),
            "group with this name already exists."
        );
    }

    #[test]
    fn test_extract_message_fallbacks() {
        assert_eq!(extract_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(extract_message(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>"), "HTTP 500");
        assert_eq!(extract_message(StatusCode::NOT_FOUND, ""), "HTTP 404");
        assert_eq!(extract_message(StatusCode::BAD_REQUEST, "{}"), "HTTP 400");
    }

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:8000/api/");
        assert_eq!(
            client.url("/students/students/"),
            "http://localhost:8000/api/students/students/"
        );
        assert_eq!(client.url("token/"), "http://localhost:8000/api/token/");
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let plain: Listing<i64> = serde_json::from_str("[1, 2]").unwrap();
        let paged: Listing<i64> =
            serde_json::from_str(r#"{"count": 2, "next": null, "results": [3, 4]}"#).unwrap();
        assert_eq!(plain.into_vec(), vec![1, 2]);
        assert_eq!(paged.into_vec(), vec![3, 4]);
    }
}
