//! View models shared by the page templates.

use crate::models::{Action, MODULES};
use crate::services::{ConsoleContext, PermissionRegistry};

/// Sidebar entry; only modules the role may view are listed.
#[derive(Debug, Clone)]
pub struct NavItem {
    pub href: String,
    pub label: String,
}

/// Dashboard summary of what the role may do in one module.
#[derive(Debug, Clone)]
pub struct ModuleSummary {
    pub module: String,
    pub label: String,
    pub can_view: bool,
    pub actions: Vec<String>,
}

/// Signed-in user as shown in the header.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub name: String,
    pub email: String,
    pub role: String,
    pub initials: String,
}

pub fn module_label(module: &str) -> String {
    let mut chars = module.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn nav_items(permissions: &PermissionRegistry) -> Vec<NavItem> {
    MODULES
        .iter()
        .filter(|module| permissions.check(module, Action::View))
        .map(|module| NavItem {
            href: format!("/{}", module),
            label: module_label(module),
        })
        .collect()
}

pub fn module_summaries(permissions: &PermissionRegistry) -> Vec<ModuleSummary> {
    MODULES
        .iter()
        .map(|module| ModuleSummary {
            module: module.to_string(),
            label: module_label(module),
            can_view: permissions.check(module, Action::View),
            actions: Action::offered_for(module)
                .iter()
                .filter(|action| permissions.check(module, **action))
                .map(|action| format!("{} {}", module_label(action.as_str()), module_label(module)))
                .collect(),
        })
        .collect()
}

/// Non-fatal page banner: set when the role's permissions failed to load.
pub fn load_warning(permissions: &PermissionRegistry) -> Option<String> {
    permissions.load_error()
}

pub fn viewer(context: &ConsoleContext) -> Option<Viewer> {
    context.session.current_user().map(|user| Viewer {
        initials: user.initials(),
        name: user.name,
        email: user.email,
        role: user.role,
    })
}
