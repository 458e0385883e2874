use axum::{extract::Path, http::StatusCode, Extension, Json};
use console_core::error::AppError;

use super::{create_record, delete_record, list_records, update_record};
use crate::models::Project;
use crate::services::ConsoleContext;

const RESOURCE: &str = "projects";

pub async fn list_projects(
    Extension(context): Extension<ConsoleContext>,
) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(list_records(&context, RESOURCE).await?))
}

pub async fn create_project(
    Extension(context): Extension<ConsoleContext>,
    Json(mut project): Json<Project>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    project.id = None;
    let created = create_record(&context, RESOURCE, &project).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_project(
    Extension(context): Extension<ConsoleContext>,
    Path(id): Path<String>,
    Json(mut project): Json<Project>,
) -> Result<Json<Project>, AppError> {
    // The path id is authoritative.
    project.id = None;
    Ok(Json(update_record(&context, RESOURCE, &id, &project).await?))
}

pub async fn delete_project(
    Extension(context): Extension<ConsoleContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    delete_record(&context, RESOURCE, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
