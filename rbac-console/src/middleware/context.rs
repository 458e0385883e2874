use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use console_core::middleware::RequestId;
use std::sync::Arc;
use tower_sessions::Session;

use crate::services::ConsoleContext;
use crate::AppState;

/// Rebuild the browser's console state for this request: restore the auth
/// session from the stored token and user id, load its permissions, and
/// hand the context to the guards and handlers below.
pub async fn console_context_middleware(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone());

    let context = ConsoleContext::new(
        state.http.clone(),
        &state.backend_url,
        state.tokens.clone(),
        Arc::new(session),
        request_id,
    );
    context.restore().await;

    request.extensions_mut().insert(context);
    next.run(request).await
}
