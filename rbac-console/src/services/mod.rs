pub mod backend;
pub mod context;
pub mod metrics;
pub mod permissions;
pub mod session;
pub mod storage;
pub mod token;

pub use backend::{ApiClient, BackendError, Directory};
pub use context::ConsoleContext;
pub use permissions::{PermissionRegistry, PermissionSnapshot};
pub use session::{AuthError, AuthSession, Identity, SessionState, SessionStatus};
pub use storage::{ClientStorage, MemoryStorage, TokenStore};
pub use token::{IdentityClaims, TokenClaims, TokenError, TokenService};
