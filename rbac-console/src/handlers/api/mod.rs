//! JSON endpoints behind the list screens. Every method carries the
//! permission gate for its module and action.

pub mod employees;
pub mod projects;
pub mod roles;
pub mod users;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use console_core::error::AppError;
use serde::{de::DeserializeOwned, Serialize};

use crate::middleware::{require_permission, PermissionGate};
use crate::models::Action;
use crate::services::ConsoleContext;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/users",
            get(users::list_users)
                .layer(from_fn_with_state(
                    PermissionGate::new("users", Action::View),
                    require_permission,
                ))
                .merge(post(users::create_user).layer(from_fn_with_state(
                    PermissionGate::new("users", Action::Add),
                    require_permission,
                ))),
        )
        .route(
            "/api/users/:id",
            put(users::update_user)
                .layer(from_fn_with_state(
                    PermissionGate::new("users", Action::Edit),
                    require_permission,
                ))
                .merge(delete(users::delete_user).layer(from_fn_with_state(
                    PermissionGate::new("users", Action::Delete),
                    require_permission,
                ))),
        )
        .route(
            "/api/employees",
            get(employees::list_employees)
                .layer(from_fn_with_state(
                    PermissionGate::new("employees", Action::View),
                    require_permission,
                ))
                .merge(post(employees::create_employee).layer(from_fn_with_state(
                    PermissionGate::new("employees", Action::Add),
                    require_permission,
                ))),
        )
        .route(
            "/api/employees/:id",
            put(employees::update_employee)
                .layer(from_fn_with_state(
                    PermissionGate::new("employees", Action::Edit),
                    require_permission,
                ))
                .merge(delete(employees::delete_employee).layer(from_fn_with_state(
                    PermissionGate::new("employees", Action::Delete),
                    require_permission,
                ))),
        )
        .route(
            "/api/projects",
            get(projects::list_projects)
                .layer(from_fn_with_state(
                    PermissionGate::new("projects", Action::View),
                    require_permission,
                ))
                .merge(post(projects::create_project).layer(from_fn_with_state(
                    PermissionGate::new("projects", Action::Add),
                    require_permission,
                ))),
        )
        .route(
            "/api/projects/:id",
            put(projects::update_project)
                .layer(from_fn_with_state(
                    PermissionGate::new("projects", Action::Edit),
                    require_permission,
                ))
                .merge(delete(projects::delete_project).layer(from_fn_with_state(
                    PermissionGate::new("projects", Action::Delete),
                    require_permission,
                ))),
        )
        .route(
            "/api/roles",
            get(roles::list_roles).layer(from_fn_with_state(
                PermissionGate::new("roles", Action::View),
                require_permission,
            )),
        )
        .route(
            "/api/roles/:id",
            put(roles::update_role).layer(from_fn_with_state(
                PermissionGate::new("roles", Action::Edit),
                require_permission,
            )),
        )
}

async fn list_records<T: DeserializeOwned>(
    context: &ConsoleContext,
    resource: &str,
) -> Result<Vec<T>, AppError> {
    match context.api.list(resource, &[]).await {
        Ok(records) => Ok(records),
        Err(e) => {
            tracing::error!(%resource, "Failed to list records: {}", e);
            Err(context.backend_error(e).await)
        }
    }
}

async fn create_record<T>(context: &ConsoleContext, resource: &str, record: &T) -> Result<T, AppError>
where
    T: Serialize + DeserializeOwned + Sync,
{
    match context.api.create(resource, record).await {
        Ok(created) => {
            tracing::info!(%resource, "Record created");
            Ok(created)
        }
        Err(e) => {
            tracing::error!(%resource, "Failed to create record: {}", e);
            Err(context.backend_error(e).await)
        }
    }
}

async fn update_record<T>(
    context: &ConsoleContext,
    resource: &str,
    id: &str,
    record: &T,
) -> Result<T, AppError>
where
    T: Serialize + DeserializeOwned + Sync,
{
    match context.api.update(resource, id, record).await {
        Ok(updated) => {
            tracing::info!(%resource, %id, "Record updated");
            Ok(updated)
        }
        Err(e) => {
            tracing::error!(%resource, %id, "Failed to update record: {}", e);
            Err(context.backend_error(e).await)
        }
    }
}

async fn delete_record(context: &ConsoleContext, resource: &str, id: &str) -> Result<(), AppError> {
    match context.api.delete(resource, id).await {
        Ok(()) => {
            tracing::info!(%resource, %id, "Record deleted");
            Ok(())
        }
        Err(e) => {
            tracing::error!(%resource, %id, "Failed to delete record: {}", e);
            Err(context.backend_error(e).await)
        }
    }
}
