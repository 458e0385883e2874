//! List screens for each managed module. Add/edit/delete affordances are
//! rendered only for actions the role holds.

use askama::Template;
use axum::{response::IntoResponse, Extension};
use console_core::error::AppError;
use serde_json::Value;

use super::view::{load_warning, module_label, nav_items, viewer, NavItem, Viewer};
use crate::models::{Action, PermissionGrant};
use crate::services::ConsoleContext;

#[derive(Template)]
#[template(path = "records.html")]
pub struct RecordsTemplate {
    pub viewer: Option<Viewer>,
    pub nav: Vec<NavItem>,
    pub current_page: String,
    pub warning: Option<String>,
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<RecordRow>,
    pub can_add: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: String,
    pub cells: Vec<String>,
    /// Record as editable JSON, without the password hash.
    pub json: String,
}

const USER_COLUMNS: &[(&str, &str)] = &[("name", "Name"), ("email", "Email"), ("role", "Role")];

const EMPLOYEE_COLUMNS: &[(&str, &str)] = &[
    ("name", "Name"),
    ("position", "Position"),
    ("department", "Department"),
    ("email", "Email"),
    ("phone", "Phone"),
];

const PROJECT_COLUMNS: &[(&str, &str)] = &[
    ("name", "Name"),
    ("description", "Description"),
    ("startDate", "Start Date"),
    ("endDate", "End Date"),
    ("status", "Status"),
];

const ROLE_COLUMNS: &[(&str, &str)] = &[("name", "Name"), ("description", "Description")];

fn cell(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn record_id(record: &Value) -> String {
    cell(record, "id")
}

fn editable_json(record: &Value) -> String {
    let mut record = record.clone();
    if let Value::Object(fields) = &mut record {
        fields.remove("id");
        fields.remove("password");
    }
    record.to_string()
}

fn render(
    context: &ConsoleContext,
    module: &str,
    columns: &[(&str, &str)],
    records: Vec<Value>,
    extra: Option<(&str, Vec<String>)>,
) -> RecordsTemplate {
    let permissions = &context.permissions;
    let mut headers: Vec<String> = columns.iter().map(|(_, label)| label.to_string()).collect();

    let mut rows: Vec<RecordRow> = records
        .iter()
        .map(|record| RecordRow {
            id: record_id(record),
            cells: columns.iter().map(|(key, _)| cell(record, key)).collect(),
            json: editable_json(record),
        })
        .collect();

    if let Some((label, values)) = extra {
        headers.push(label.to_string());
        for (row, value) in rows.iter_mut().zip(values) {
            row.cells.push(value);
        }
    }

    // The roles screen edits existing roles only.
    let offered = Action::offered_for(module);

    RecordsTemplate {
        viewer: viewer(context),
        nav: nav_items(permissions),
        current_page: module.to_string(),
        warning: load_warning(permissions),
        title: module_label(module),
        columns: headers,
        rows,
        can_add: offered.contains(&Action::Add) && permissions.check(module, Action::Add),
        can_edit: permissions.check(module, Action::Edit),
        can_delete: offered.contains(&Action::Delete) && permissions.check(module, Action::Delete),
    }
}

async fn load(context: &ConsoleContext, resource: &str) -> Result<Vec<Value>, AppError> {
    match context.api.list::<Value>(resource, &[]).await {
        Ok(records) => Ok(records),
        Err(e) => {
            tracing::error!(%resource, "Failed to load records: {}", e);
            Err(context.backend_error(e).await)
        }
    }
}

pub async fn users_page(
    Extension(context): Extension<ConsoleContext>,
) -> Result<impl IntoResponse, AppError> {
    let records = load(&context, "users").await?;
    Ok(render(&context, "users", USER_COLUMNS, records, None))
}

pub async fn employees_page(
    Extension(context): Extension<ConsoleContext>,
) -> Result<impl IntoResponse, AppError> {
    let records = load(&context, "employees").await?;
    Ok(render(&context, "employees", EMPLOYEE_COLUMNS, records, None))
}

pub async fn projects_page(
    Extension(context): Extension<ConsoleContext>,
) -> Result<impl IntoResponse, AppError> {
    let records = load(&context, "projects").await?;
    Ok(render(&context, "projects", PROJECT_COLUMNS, records, None))
}

pub async fn roles_page(
    Extension(context): Extension<ConsoleContext>,
) -> Result<impl IntoResponse, AppError> {
    let records = load(&context, "roles").await?;
    let grants: Vec<PermissionGrant> = match context.api.list("permissions", &[]).await {
        Ok(grants) => grants,
        Err(e) => return Err(context.backend_error(e).await),
    };

    let summaries = records
        .iter()
        .map(|role| {
            let id = record_id(role);
            grants
                .iter()
                .filter(|grant| grant.role_id.matches(&id))
                .map(|grant| {
                    let actions: Vec<&str> = grant.actions.iter().map(Action::as_str).collect();
                    format!("{}: {}", grant.module, actions.join(", "))
                })
                .collect::<Vec<_>>()
                .join("; ")
        })
        .collect();

    Ok(render(
        &context,
        "roles",
        ROLE_COLUMNS,
        records,
        Some(("Permissions", summaries)),
    ))
}
