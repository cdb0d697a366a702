use axum::extract::FromRef;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::services::backend::ApiClient;
use crate::services::lesson_bus::LessonBus;
use crate::services::scanner::ScannerRegistry;

/// Session keys used in the application
pub const SESSION_KEY_TOKENS: &str = "auth_tokens";
pub const SESSION_KEY_USER: &str = "current_user";
pub const SESSION_KEY_FLASH: &str = "flash_toast";
pub const SESSION_KEY_LAST_UPDATE: &str = "last_attendance_update";
pub const SESSION_KEY_RETURN_URL: &str = "return_url";

/// Creates a session layer for Axum
pub fn create_session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    let session_store = MemoryStore::default();

    SessionManagerLayer::new(session_store)
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)))
}

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub config: Config,
    pub lesson_bus: LessonBus,
    pub scanners: ScannerRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            api: ApiClient::new(&config.api_base_url),
            config,
            lesson_bus: LessonBus::new(),
            scanners: ScannerRegistry::new(),
        }
    }
}

impl FromRef<AppState> for ApiClient {
    fn from_ref(state: &AppState) -> ApiClient {
        state.api.clone()
    }
}

impl FromRef<AppState> for LessonBus {
    fn from_ref(state: &AppState) -> LessonBus {
        state.lesson_bus.clone()
    }
}
