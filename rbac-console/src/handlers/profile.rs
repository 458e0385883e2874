use askama::Template;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Form,
};
use console_core::error::AppError;
use serde::Deserialize;

use super::view::{load_warning, nav_items, viewer, NavItem, Viewer};
use crate::models::User;
use crate::services::ConsoleContext;
use crate::utils::password::{hash_password, verify_password, Password};

pub const PASSWORDS_DO_NOT_MATCH: &str = "New passwords do not match";
pub const CURRENT_PASSWORD_INCORRECT: &str = "Current password is incorrect";
pub const PASSWORD_UPDATED: &str = "Password updated successfully";

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub viewer: Option<Viewer>,
    pub nav: Vec<NavItem>,
    pub current_page: &'static str,
    pub warning: Option<String>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

fn render(context: &ConsoleContext, error: Option<&str>, notice: Option<&str>) -> ProfileTemplate {
    ProfileTemplate {
        viewer: viewer(context),
        nav: nav_items(&context.permissions),
        current_page: "profile",
        warning: load_warning(&context.permissions),
        error: error.map(str::to_string),
        notice: notice.map(str::to_string),
    }
}

pub async fn profile_page(Extension(context): Extension<ConsoleContext>) -> impl IntoResponse {
    render(&context, None, None)
}

pub async fn change_password_handler(
    Extension(context): Extension<ConsoleContext>,
    Form(payload): Form<PasswordChangeRequest>,
) -> Result<Response, AppError> {
    if payload.new_password != payload.confirm_password {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            render(&context, Some(PASSWORDS_DO_NOT_MATCH), None),
        )
            .into_response());
    }

    let Some(user) = context.session.current_user() else {
        return Err(AppError::SessionExpired);
    };

    if !verify_password(&Password::new(payload.current_password), &user.password_hash) {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            render(&context, Some(CURRENT_PASSWORD_INCORRECT), None),
        )
            .into_response());
    }

    let password_hash = hash_password(&Password::new(payload.new_password))?;
    let id = user.id.to_string();
    let updated = User {
        password_hash,
        ..user
    };

    if let Err(e) = context
        .api
        .update::<_, User>("users", &id, &updated)
        .await
    {
        tracing::error!(user_id = %id, "Failed to update password: {}", e);
        return Err(context.backend_error(e).await);
    }

    tracing::info!(user_id = %id, "Password changed");
    Ok(render(&context, None, Some(PASSWORD_UPDATED)).into_response())
}
