pub mod employee;
pub mod permission;
pub mod project;
pub mod record_id;
pub mod role;
pub mod user;

pub use employee::Employee;
pub use permission::{Action, PermissionGrant, MODULES};
pub use project::Project;
pub use record_id::RecordId;
pub use role::Role;
pub use user::{User, UserView};
