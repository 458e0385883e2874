use serde::{Deserialize, Serialize};

use super::RecordId;

/// Role record. `name` is unique and is what users reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}
