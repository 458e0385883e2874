use axum::{extract::Path, http::StatusCode, Extension, Json};
use console_core::error::AppError;

use super::{create_record, delete_record, list_records, update_record};
use crate::models::Employee;
use crate::services::ConsoleContext;

const RESOURCE: &str = "employees";

pub async fn list_employees(
    Extension(context): Extension<ConsoleContext>,
) -> Result<Json<Vec<Employee>>, AppError> {
    Ok(Json(list_records(&context, RESOURCE).await?))
}

pub async fn create_employee(
    Extension(context): Extension<ConsoleContext>,
    Json(mut employee): Json<Employee>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    employee.id = None;
    let created = create_record(&context, RESOURCE, &employee).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_employee(
    Extension(context): Extension<ConsoleContext>,
    Path(id): Path<String>,
    Json(mut employee): Json<Employee>,
) -> Result<Json<Employee>, AppError> {
    // The path id is authoritative.
    employee.id = None;
    Ok(Json(update_record(&context, RESOURCE, &id, &employee).await?))
}

pub async fn delete_employee(
    Extension(context): Extension<ConsoleContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    delete_record(&context, RESOURCE, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
