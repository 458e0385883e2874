use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Path of the login view; every session rejection lands here.
pub const LOGIN_PATH: &str = "/login";

/// Path of the view shown when a permission gate denies access.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The stored token expired or the backend rejected it. Rendered as a
    /// redirect to the login view.
    #[error("Session expired")]
    SessionExpired,

    /// Authenticated, but the role lacks the grant. Rendered as a redirect to
    /// the unauthorized view.
    #[error("Forbidden: {module}:{action}")]
    Forbidden { module: String, action: String },

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, error_message, details) = match self {
            AppError::SessionExpired => return Redirect::to(LOGIN_PATH).into_response(),
            AppError::Forbidden { module, action } => {
                tracing::debug!(%module, %action, "Permission gate denied request");
                return Redirect::to(UNAUTHORIZED_PATH).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::BadGateway(msg) => (
                StatusCode::BAD_GATEWAY,
                "Backend request failed".to_string(),
                Some(msg),
            ),
            AppError::InternalError(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}
