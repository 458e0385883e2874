use askama::Template;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;

use crate::services::metrics::record_login;
use crate::services::{AuthError, ConsoleContext};
use crate::utils::password::Password;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login_page(Extension(context): Extension<ConsoleContext>) -> Response {
    let state = context.session.state();
    if state.is_authenticated() {
        return Redirect::to("/").into_response();
    }

    // Bootstrap errors from the redirecting request arrive as a flash.
    let flashed = context.take_flash().await;
    LoginTemplate {
        error: state.error.or(flashed),
        email: String::new(),
    }
    .into_response()
}

pub async fn login_handler(
    Extension(context): Extension<ConsoleContext>,
    Form(payload): Form<LoginRequest>,
) -> Response {
    let password = Password::new(payload.password);

    match context.session.login(payload.email.trim(), &password).await {
        Ok(user) => {
            record_login("success");
            context.take_flash().await;
            if let Err(e) = context.permissions.sync(context.session.identity()).await {
                tracing::warn!(user_id = %user.id, "Permissions not loaded after login: {}", e);
            }
            Redirect::to("/").into_response()
        }
        Err(e) => {
            let outcome = match e {
                AuthError::InvalidCredentials => "invalid_credentials",
                _ => "error",
            };
            record_login(outcome);

            (
                StatusCode::UNPROCESSABLE_ENTITY,
                LoginTemplate {
                    error: context.session.state().error,
                    email: payload.email,
                },
            )
                .into_response()
        }
    }
}

pub async fn logout_handler(Extension(context): Extension<ConsoleContext>) -> impl IntoResponse {
    context.session.logout().await;
    context.permissions.reset();
    Redirect::to("/login")
}
