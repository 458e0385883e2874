use askama::Template;
use axum::{
    response::{IntoResponse, Redirect},
    Extension,
};

use super::view::{
    load_warning, module_summaries, nav_items, viewer, ModuleSummary, NavItem, Viewer,
};
use crate::services::ConsoleContext;

pub async fn health_check() -> impl IntoResponse {
    "OK"
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub viewer: Option<Viewer>,
    pub nav: Vec<NavItem>,
    pub modules: Vec<ModuleSummary>,
    pub current_page: &'static str,
    pub warning: Option<String>,
}

pub async fn dashboard_handler(Extension(context): Extension<ConsoleContext>) -> impl IntoResponse {
    DashboardTemplate {
        viewer: viewer(&context),
        nav: nav_items(&context.permissions),
        modules: module_summaries(&context.permissions),
        current_page: "dashboard",
        warning: load_warning(&context.permissions),
    }
}

#[derive(Template)]
#[template(path = "unauthorized.html")]
pub struct UnauthorizedTemplate {
    pub signed_in: bool,
}

pub async fn unauthorized_page(Extension(context): Extension<ConsoleContext>) -> impl IntoResponse {
    UnauthorizedTemplate {
        signed_in: context.session.state().is_authenticated(),
    }
}

pub async fn fallback_handler() -> impl IntoResponse {
    Redirect::to("/")
}
