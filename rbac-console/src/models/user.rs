use serde::{Deserialize, Serialize};

use super::RecordId;

/// User record as stored by the backend.
///
/// `role` holds the role *name*, not its id; permissions are resolved by
/// joining on `Role::name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string.
    #[serde(rename = "password")]
    pub password_hash: String,
    pub role: String,
}

/// User as shown to the browser: no password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

impl User {
    pub fn initials(&self) -> String {
        let initials: String = self
            .name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase();

        if initials.is_empty() {
            "U".to_string()
        } else {
            initials
        }
    }
}
