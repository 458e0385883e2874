//! Route gates. The authentication gate sends anonymous visitors to the login
//! view; the permission gate sends signed-in users lacking a grant to the
//! unauthorized view. A permission gate always applies the authentication
//! gate first.

use askama::Template;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use console_core::error::{AppError, LOGIN_PATH, UNAUTHORIZED_PATH};

use crate::models::Action;
use crate::services::metrics::record_denial;
use crate::services::{AuthSession, ConsoleContext, PermissionRegistry, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Session or permissions still resolving; render an interim view rather
    /// than redirecting early.
    Loading,
    RedirectToLogin,
    RedirectToUnauthorized,
}

#[derive(Template)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {}

impl GateDecision {
    /// The response for a blocked request, `None` when allowed through.
    pub fn rejection(self) -> Option<Response> {
        match self {
            GateDecision::Allow => None,
            GateDecision::Loading => Some(LoadingTemplate {}.into_response()),
            GateDecision::RedirectToLogin => Some(Redirect::to(LOGIN_PATH).into_response()),
            GateDecision::RedirectToUnauthorized => {
                Some(Redirect::to(UNAUTHORIZED_PATH).into_response())
            }
        }
    }
}

/// Gate evaluation over injected session and permission state.
#[derive(Clone)]
pub struct RouteGuard {
    session: AuthSession,
    permissions: PermissionRegistry,
}

impl RouteGuard {
    pub fn new(session: AuthSession, permissions: PermissionRegistry) -> Self {
        Self {
            session,
            permissions,
        }
    }

    pub fn authentication_gate(&self) -> GateDecision {
        match self.session.status() {
            SessionStatus::Authenticated => GateDecision::Allow,
            SessionStatus::Authenticating => GateDecision::Loading,
            SessionStatus::Anonymous => GateDecision::RedirectToLogin,
        }
    }

    pub fn permission_gate(&self, module: &str, action: Action) -> GateDecision {
        match self.authentication_gate() {
            GateDecision::Allow => {}
            other => return other,
        }

        if self.permissions.is_loading() {
            GateDecision::Loading
        } else if self.permissions.check(module, action) {
            GateDecision::Allow
        } else {
            GateDecision::RedirectToUnauthorized
        }
    }
}

impl ConsoleContext {
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.session.clone(), self.permissions.clone())
    }
}

/// Module and action a route requires.
#[derive(Debug, Clone, Copy)]
pub struct PermissionGate {
    pub module: &'static str,
    pub action: Action,
}

impl PermissionGate {
    pub const fn new(module: &'static str, action: Action) -> Self {
        Self { module, action }
    }
}

pub async fn require_authenticated(
    Extension(context): Extension<ConsoleContext>,
    request: Request,
    next: Next,
) -> Response {
    match context.guard().authentication_gate().rejection() {
        None => next.run(request).await,
        Some(response) => response,
    }
}

pub async fn require_permission(
    State(gate): State<PermissionGate>,
    Extension(context): Extension<ConsoleContext>,
    request: Request,
    next: Next,
) -> Response {
    let decision = context.guard().permission_gate(gate.module, gate.action);
    if decision == GateDecision::RedirectToUnauthorized {
        tracing::info!(module = gate.module, action = %gate.action, "Permission denied");
        record_denial(gate.module, gate.action.as_str());
        return AppError::Forbidden {
            module: gate.module.to_string(),
            action: gate.action.to_string(),
        }
        .into_response();
    }

    match decision.rejection() {
        None => next.run(request).await,
        Some(response) => response,
    }
}
