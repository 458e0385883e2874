use axum::{extract::Path, Extension, Json};
use console_core::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::list_records;
use crate::models::{Action, PermissionGrant, Role, MODULES};
use crate::services::ConsoleContext;

#[derive(Debug, Serialize)]
pub struct RoleWithGrants {
    #[serde(flatten)]
    pub role: Role,
    pub grants: BTreeMap<String, BTreeSet<Action>>,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Module -> granted actions. Modules left out keep their grant.
    #[serde(default)]
    pub grants: BTreeMap<String, BTreeSet<Action>>,
}

fn grants_for(role: &Role, grants: &[PermissionGrant]) -> BTreeMap<String, BTreeSet<Action>> {
    grants
        .iter()
        .filter(|grant| grant.role_id == role.id)
        .map(|grant| (grant.module.clone(), grant.actions.clone()))
        .collect()
}

/// Actions to store for `module`: the submitted ones the console offers, plus
/// any non-offered actions the grant already held.
fn merged_actions(
    module: &str,
    submitted: &BTreeSet<Action>,
    existing: Option<&BTreeSet<Action>>,
) -> BTreeSet<Action> {
    let offered = Action::offered_for(module);
    let mut actions: BTreeSet<Action> = submitted
        .iter()
        .filter(|action| offered.contains(action))
        .copied()
        .collect();

    if let Some(existing) = existing {
        actions.extend(existing.iter().filter(|action| !offered.contains(action)));
    }
    actions
}

pub async fn list_roles(
    Extension(context): Extension<ConsoleContext>,
) -> Result<Json<Vec<RoleWithGrants>>, AppError> {
    let roles: Vec<Role> = list_records(&context, "roles").await?;
    let grants: Vec<PermissionGrant> = list_records(&context, "permissions").await?;

    Ok(Json(
        roles
            .into_iter()
            .map(|role| RoleWithGrants {
                grants: grants_for(&role, &grants),
                role,
            })
            .collect(),
    ))
}

/// Update a role and its per-module grants, then reload the signed-in
/// user's permissions in case their own role changed.
pub async fn update_role(
    Extension(context): Extension<ConsoleContext>,
    Path(id): Path<String>,
    Json(update): Json<RoleUpdate>,
) -> Result<Json<RoleWithGrants>, AppError> {
    let api = &context.api;

    let existing: Role = match api.get("roles", &id).await {
        Ok(role) => role,
        Err(e) => return Err(context.backend_error(e).await),
    };

    let role = Role {
        id: existing.id.clone(),
        name: update.name,
        description: update.description,
    };
    let role: Role = match api.update("roles", &id, &role).await {
        Ok(role) => role,
        Err(e) => {
            tracing::error!(role_id = %id, "Failed to update role: {}", e);
            return Err(context.backend_error(e).await);
        }
    };

    let role_id = role.id.to_string();
    let current: Vec<PermissionGrant> = match api
        .list("permissions", &[("roleId", role_id.as_str())])
        .await
    {
        Ok(grants) => grants,
        Err(e) => return Err(context.backend_error(e).await),
    };

    for module in MODULES {
        let Some(submitted) = update.grants.get(module) else {
            continue;
        };
        let stored = current
            .iter()
            .rev()
            .find(|grant| grant.role_id == role.id && grant.module == module);
        let actions = merged_actions(module, submitted, stored.map(|grant| &grant.actions));

        let result = match stored.and_then(|grant| grant.id.as_ref()) {
            Some(grant_id) => {
                let grant = PermissionGrant {
                    id: None,
                    role_id: role.id.clone(),
                    module: module.to_string(),
                    actions,
                };
                api.update::<_, PermissionGrant>("permissions", &grant_id.to_string(), &grant)
                    .await
                    .map(|_| ())
            }
            None if actions.is_empty() => Ok(()),
            None => {
                let grant = PermissionGrant {
                    id: None,
                    role_id: role.id.clone(),
                    module: module.to_string(),
                    actions,
                };
                api.create::<_, PermissionGrant>("permissions", &grant)
                    .await
                    .map(|_| ())
            }
        };

        if let Err(e) = result {
            tracing::error!(role_id = %role.id, %module, "Failed to save grant: {}", e);
            return Err(context.backend_error(e).await);
        }
    }

    tracing::info!(role_id = %role.id, role = %role.name, "Role updated");

    if let Err(e) = context.permissions.refresh().await {
        tracing::warn!("Failed to reload permissions after role update: {}", e);
    }

    let grants: Vec<PermissionGrant> = match api
        .list("permissions", &[("roleId", role_id.as_str())])
        .await
    {
        Ok(grants) => grants,
        Err(e) => return Err(context.backend_error(e).await),
    };

    Ok(Json(RoleWithGrants {
        grants: grants_for(&role, &grants),
        role,
    }))
}
