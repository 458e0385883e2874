pub mod context;
pub mod guard;

pub use context::console_context_middleware;
pub use guard::{require_authenticated, require_permission, GateDecision, PermissionGate, RouteGuard};
