// API module - HTTP endpoints

pub mod attendance;
pub mod auth;
pub mod dashboard;
pub mod events;
pub mod forms;
pub mod groups;
pub mod health;
pub mod layout;
pub mod middleware;
pub mod parents;
pub mod planning;
pub mod plans;
pub mod portal;
pub mod scanner;
pub mod settings;
pub mod staff;
pub mod students;

use axum::{middleware::from_fn, middleware::from_fn_with_state, routing::get_service, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use middleware::auth::{require_admin, require_auth, require_staff};
use middleware::session::{create_session_layer, AppState};

/// Builds the complete application.
///
/// Login and health are public. Students only reach their portal; the
/// dashboard pages need school staff, and the directory pages need an
/// administrator.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(&state.config);

    let admin_routes = Router::new()
        .merge(students::router())
        .merge(staff::router())
        .merge(parents::router())
        .merge(groups::router())
        .merge(plans::router())
        .merge(settings::router())
        .route_layer(from_fn(require_admin));

    let staff_routes = Router::new()
        .merge(dashboard::router())
        .merge(attendance::router())
        .merge(scanner::router())
        .merge(planning::router())
        .merge(events::router())
        .merge(admin_routes)
        .route_layer(from_fn(require_staff));

    let protected_routes = Router::new()
        .merge(portal::router())
        .merge(staff_routes)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let static_routes = Router::new().nest_service(
        "/static",
        get_service(ServeDir::new(&state.config.static_dir)),
    );

    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(protected_routes)
        .merge(static_routes)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
