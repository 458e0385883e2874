use axum::{extract::Path, http::StatusCode, Extension, Json};
use console_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{delete_record, list_records};
use crate::models::{User, UserView};
use crate::services::ConsoleContext;
use crate::utils::password::{hash_password, Password};

const RESOURCE: &str = "users";

/// Create/update payload. The plaintext password is hashed here and never
/// forwarded; on update an empty password keeps the stored hash.
#[derive(Deserialize)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    pub role: String,
}

impl UserForm {
    /// The submitted password, if one was actually entered.
    fn new_password(&self) -> Option<Password> {
        self.password
            .clone()
            .map(Password::new)
            .filter(|password| !password.is_empty())
    }
}

#[derive(Serialize)]
struct NewUser<'a> {
    name: &'a str,
    email: &'a str,
    password: String,
    role: &'a str,
}

pub async fn list_users(
    Extension(context): Extension<ConsoleContext>,
) -> Result<Json<Vec<UserView>>, AppError> {
    let users: Vec<User> = list_records(&context, RESOURCE).await?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

pub async fn create_user(
    Extension(context): Extension<ConsoleContext>,
    Json(form): Json<UserForm>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let Some(password) = form.new_password() else {
        return Err(AppError::BadRequest("Password is required".to_string()));
    };

    let body = NewUser {
        name: &form.name,
        email: &form.email,
        password: hash_password(&password)?,
        role: &form.role,
    };

    let created: User = match context.api.create(RESOURCE, &body).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Failed to create user: {}", e);
            return Err(context.backend_error(e).await);
        }
    };

    tracing::info!(user_id = %created.id, role = %created.role, "User created");
    Ok((StatusCode::CREATED, Json(UserView::from(&created))))
}

pub async fn update_user(
    Extension(context): Extension<ConsoleContext>,
    Path(id): Path<String>,
    Json(form): Json<UserForm>,
) -> Result<Json<UserView>, AppError> {
    let existing: User = match context.api.get(RESOURCE, &id).await {
        Ok(user) => user,
        Err(e) => return Err(context.backend_error(e).await),
    };

    let password_hash = match form.new_password() {
        Some(password) => hash_password(&password)?,
        None => existing.password_hash,
    };

    let user = User {
        id: existing.id,
        name: form.name,
        email: form.email,
        password_hash,
        role: form.role,
    };

    let updated: User = match context.api.update(RESOURCE, &id, &user).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(user_id = %id, "Failed to update user: {}", e);
            return Err(context.backend_error(e).await);
        }
    };

    Ok(Json(UserView::from(&updated)))
}

pub async fn delete_user(
    Extension(context): Extension<ConsoleContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    delete_record(&context, RESOURCE, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
