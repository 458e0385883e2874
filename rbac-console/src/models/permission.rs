//! Permission grants: which actions a role may perform on a module.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::RecordId;

/// Modules the console manages. Grants for other module names are kept but
/// never offered in navigation or role editing.
pub const MODULES: [&str; 4] = ["users", "employees", "projects", "roles"];

/// The closed set of actions a grant can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Add,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Add, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Add => "add",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }

    /// Actions the console exposes for a module. The roles screen only offers
    /// view and edit, although a grant may hold all four.
    pub fn offered_for(module: &str) -> &'static [Action] {
        if module == "roles" {
            &[Action::View, Action::Edit]
        } else {
            &Action::ALL
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Action::View),
            "add" => Ok(Action::Add),
            "edit" => Ok(Action::Edit),
            "delete" => Ok(Action::Delete),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// One grant per (role, module) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub role_id: RecordId,
    pub module: String,
    #[serde(deserialize_with = "canonical_actions")]
    pub actions: BTreeSet<Action>,
}

/// Drop action names outside the canonical four instead of failing the whole
/// grant list.
fn canonical_actions<'de, D>(deserializer: D) -> Result<BTreeSet<Action>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(names
        .into_iter()
        .filter_map(|name| match name.parse::<Action>() {
            Ok(action) => Some(action),
            Err(e) => {
                tracing::warn!("Ignoring grant entry: {}", e);
                None
            }
        })
        .collect())
}
