use std::sync::Arc;

use console_core::error::AppError;

use crate::services::backend::{ApiClient, BackendError};
use crate::services::permissions::PermissionRegistry;
use crate::services::session::AuthSession;
use crate::services::storage::{ClientStorage, TokenStore};
use crate::services::token::TokenService;

/// Per-browser console state handed to guards and handlers: the auth
/// session, the permission registry and the backend client, all sharing
/// the same stored credentials.
#[derive(Clone)]
pub struct ConsoleContext {
    pub session: AuthSession,
    pub permissions: PermissionRegistry,
    pub api: ApiClient,
    store: TokenStore,
}

impl ConsoleContext {
    pub fn new(
        http: reqwest::Client,
        backend_url: &str,
        tokens: TokenService,
        storage: Arc<dyn ClientStorage>,
        request_id: Option<String>,
    ) -> Self {
        let store = TokenStore::new(storage);
        let api = ApiClient::new(http, backend_url, store.clone()).with_request_id(request_id);
        let directory = Arc::new(api.clone());

        Self {
            session: AuthSession::new(directory.clone(), tokens, store.clone()),
            permissions: PermissionRegistry::new(directory),
            api,
            store,
        }
    }

    /// Restore the session from storage and load its permissions.
    ///
    /// A permission load failure leaves the registry denying everything and
    /// is reported through [`PermissionRegistry::load_error`]; the session
    /// itself stays signed in. A failed bootstrap leaves its message in
    /// storage for the login view the guard redirects to.
    pub async fn restore(&self) {
        let state = self.session.bootstrap().await;
        if let Some(error) = state.error.as_deref() {
            if let Err(e) = self.store.set_flash(error).await {
                tracing::warn!("Failed to keep bootstrap error for the login view: {}", e);
            }
        }
        if let Err(e) = self.permissions.sync(self.session.identity()).await {
            if e.is_session_rejected() {
                self.session.reject().await;
                self.permissions.reset();
            }
        }
        tracing::debug!(status = ?state.status, "Console context restored");
    }

    /// One-shot message left by a failed bootstrap on an earlier request.
    pub async fn take_flash(&self) -> Option<String> {
        self.store.take_flash().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to read flashed message: {}", e);
            None
        })
    }

    /// Map a backend failure from a handler. A rejected session signs the
    /// context out before the redirect to the login view.
    pub async fn backend_error(&self, err: BackendError) -> AppError {
        match err {
            BackendError::SessionRejected { .. } => {
                self.session.reject().await;
                self.permissions.reset();
                AppError::SessionExpired
            }
            BackendError::NotFound(path) => AppError::NotFound(path),
            BackendError::InvalidId(id) => AppError::BadRequest(format!("Invalid record id: {}", id)),
            other => AppError::BadGateway(other.to_string()),
        }
    }
}
