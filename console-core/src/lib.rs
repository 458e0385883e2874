//! console-core: shared infrastructure for the RBAC console.
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use tracing;
