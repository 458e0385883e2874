use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use console_core::middleware::{metrics_middleware, request_id_middleware};
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::ServerSettings;
use crate::handlers::{
    api,
    app::{dashboard_handler, fallback_handler, health_check, unauthorized_page},
    auth::{login_handler, login_page, logout_handler},
    metrics::metrics,
    profile::{change_password_handler, profile_page},
    records::{employees_page, projects_page, roles_page, users_page},
};
use crate::middleware::{
    console_context_middleware, require_authenticated, require_permission, PermissionGate,
};
use crate::models::Action;
use crate::AppState;

pub fn build_router(state: AppState, server: &ServerSettings) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(server.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            server.session_inactivity_hours,
        )));

    let public = Router::new()
        .route("/login", get(login_page).post(login_handler))
        .route("/logout", get(logout_handler))
        .route("/unauthorized", get(unauthorized_page));

    // Routes under the authenticated layout. Each module route carries its own
    // permission gate; the authentication gate wraps them all.
    let protected = Router::new()
        .route("/", get(dashboard_handler))
        .route("/profile", get(profile_page))
        .route(
            "/profile/password",
            axum::routing::post(change_password_handler),
        )
        .route(
            "/users",
            get(users_page).layer(from_fn_with_state(
                PermissionGate::new("users", Action::View),
                require_permission,
            )),
        )
        .route(
            "/employees",
            get(employees_page).layer(from_fn_with_state(
                PermissionGate::new("employees", Action::View),
                require_permission,
            )),
        )
        .route(
            "/projects",
            get(projects_page).layer(from_fn_with_state(
                PermissionGate::new("projects", Action::View),
                require_permission,
            )),
        )
        .route(
            "/roles",
            get(roles_page).layer(from_fn_with_state(
                PermissionGate::new("roles", Action::View),
                require_permission,
            )),
        )
        .merge(api::routes())
        .route_layer(from_fn(require_authenticated));

    let console = public
        .merge(protected)
        .fallback(fallback_handler)
        .layer(from_fn_with_state(state.clone(), console_context_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .merge(console)
        .layer(session_layer)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
